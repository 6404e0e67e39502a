use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

mod cli;
mod image;
mod palette;

use crate::{
    cli::CLIArguments,
    image::{load_image_from_path, save_greyscale_to_path, save_palette_to_path},
};

/// Both outputs land beside the source, named after its base name.
fn output_paths(source_path: &Path) -> Result<(PathBuf, PathBuf)> {
    let stem = source_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("source path {} has no usable file name", source_path.display()))?;
    let parent = source_path.parent().unwrap_or_else(|| Path::new(""));

    let greyscale_path = parent.join(format!("{stem}.greyscaled.png"));
    let palette_path = parent.join(format!("{stem}.palette.png"));
    Ok((greyscale_path, palette_path))
}

fn main() -> Result<()> {
    let args = CLIArguments::parse();

    let source = load_image_from_path(&args.source_path)?;
    let (index_map, table) = palette::extract(&source, args.palette_size as usize)?;

    // Both artifacts exist in memory before either file is opened, a
    // failed run leaves no partial output behind.
    let (greyscale_path, palette_path) = output_paths(&args.source_path)?;
    save_greyscale_to_path(&index_map, &greyscale_path)?;
    save_palette_to_path(&table, &palette_path)?;

    println!(
        "Wrote {} and {}",
        greyscale_path.display(),
        palette_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_derive_from_source_name() {
        let (greyscale, palette) = output_paths(Path::new("sprites/megaman.png")).unwrap();
        assert_eq!(greyscale, Path::new("sprites/megaman.greyscaled.png"));
        assert_eq!(palette, Path::new("sprites/megaman.palette.png"));
    }

    #[test]
    fn output_paths_work_without_a_directory() {
        let (greyscale, palette) = output_paths(Path::new("tile.png")).unwrap();
        assert_eq!(greyscale, Path::new("tile.greyscaled.png"));
        assert_eq!(palette, Path::new("tile.palette.png"));
    }
}
