use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{bail, Context, Result};
use pix::{el::Pixel, Raster};
use png_pong::{Decoder, Encoder};

use crate::palette::IndexedImage;

/// An image normalized to 8-bit RGBA, the internal format everything
/// downstream of the decoder works on.
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
}

fn high_byte(channel: u16) -> u8 {
    (channel >> 8) as u8
}

// Load an image from a path, converting every PNG pixel format to RGBA8.
pub fn load_image_from_path(path: &Path) -> Result<Image> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let decoder = Decoder::new(file)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .into_steps();
    let png_pong::Step { raster, .. } = decoder.last().context("no frames in PNG")??;

    let image = match raster {
        png_pong::PngRaster::Gray8(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    let gray: u8 = pixel.one().into();
                    [gray, gray, gray, 0xff]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Gray16(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    let gray = high_byte(pixel.one().into());
                    [gray, gray, gray, 0xff]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Graya8(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    let gray: u8 = pixel.one().into();
                    let alpha: u8 = pixel.two().into();
                    [gray, gray, gray, alpha]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Graya16(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    let gray = high_byte(pixel.one().into());
                    let alpha = high_byte(pixel.two().into());
                    [gray, gray, gray, alpha]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Rgb8(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    [pixel.one().into(), pixel.two().into(), pixel.three().into(), 0xff]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Rgb16(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    [
                        high_byte(pixel.one().into()),
                        high_byte(pixel.two().into()),
                        high_byte(pixel.three().into()),
                        0xff,
                    ]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Rgba8(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    [
                        pixel.one().into(),
                        pixel.two().into(),
                        pixel.three().into(),
                        pixel.four().into(),
                    ]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Rgba16(raster) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let pixels = raster
                .pixels()
                .iter()
                .map(|pixel| {
                    [
                        high_byte(pixel.one().into()),
                        high_byte(pixel.two().into()),
                        high_byte(pixel.three().into()),
                        high_byte(pixel.four().into()),
                    ]
                })
                .collect();
            Image { width, height, pixels }
        }
        png_pong::PngRaster::Palette(raster, table, transparencies) => {
            let width = raster.width() as usize;
            let height = raster.height() as usize;
            let mut pixels = Vec::with_capacity(width * height);
            for pixel in raster.pixels() {
                let index: u8 = pixel.one().into();
                let Some(entry) = table.entry(index as usize) else {
                    bail!(
                        "{}: palette index {} out of range for a {}-entry palette",
                        path.display(),
                        index,
                        table.len()
                    );
                };
                // A tRNS chunk may cover only a prefix of the palette,
                // uncovered entries are opaque per the PNG spec.
                let alpha = transparencies.get(index as usize).copied().unwrap_or(0xff);
                pixels.push([entry.one().into(), entry.two().into(), entry.three().into(), alpha]);
            }
            Image { width, height, pixels }
        }
    };

    Ok(image)
}

pub fn save_greyscale_to_path(image: &IndexedImage, path: &Path) -> Result<()> {
    let IndexedImage { width, height, .. } = image;
    let raster: Raster<pix::gray::SGray8> =
        Raster::with_u8_buffer(*width as u32, *height as u32, image.indices.clone());

    let writer = BufWriter::new(
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
    );
    let mut encoder = Encoder::new(writer).into_step_enc();
    encoder.still(&raster)?;
    Ok(())
}

pub fn save_palette_to_path(table: &[[u8; 4]], path: &Path) -> Result<()> {
    let buffer: Vec<u8> = table.iter().flatten().copied().collect();
    let raster: Raster<pix::rgb::SRgba8> =
        Raster::with_u8_buffer(table.len() as u32, 1, buffer);

    let writer = BufWriter::new(
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
    );
    let mut encoder = Encoder::new(writer).into_step_enc();
    encoder.still(&raster)?;
    Ok(())
}
