use clap::{value_parser, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CLIArguments {
   /// Path to the source image
   pub source_path: PathBuf,

   /// Number of colors to keep, each palette index must fit in a single byte
   #[arg(value_parser = value_parser!(u32).range(1..=256))]
   pub palette_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_palette_size() {
        assert!(CLIArguments::try_parse_from(["palettize", "img.png"]).is_err());
    }

    #[test]
    fn rejects_non_integer_palette_size() {
        assert!(CLIArguments::try_parse_from(["palettize", "img.png", "salmon"]).is_err());
    }

    #[test]
    fn rejects_out_of_range_palette_sizes() {
        assert!(CLIArguments::try_parse_from(["palettize", "img.png", "0"]).is_err());
        assert!(CLIArguments::try_parse_from(["palettize", "img.png", "257"]).is_err());
    }

    #[test]
    fn accepts_both_bounds() {
        let args = CLIArguments::try_parse_from(["palettize", "img.png", "1"]).unwrap();
        assert_eq!(args.palette_size, 1);
        let args = CLIArguments::try_parse_from(["palettize", "img.png", "256"]).unwrap();
        assert_eq!(args.palette_size, 256);
    }
}
