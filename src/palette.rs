use std::collections::{BTreeMap, HashMap};

use itertools::{Itertools, MinMaxResult};
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use thiserror::Error;

use crate::image::Image;

/// Maximum palette size, indices are stored in a single byte.
pub const MAX_PALETTE_SIZE: usize = 256;

/// The index map: a single-channel image whose pixel values are palette
/// indices rather than intensities.
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub indices: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("palette size must be between 1 and {MAX_PALETTE_SIZE}, got {0}")]
    InvalidPaletteSize(usize),
    #[error("source image has no pixels")]
    EmptyImage,
    #[error("quantizer assigned index {index} for a palette of {len} entries")]
    InconsistentPalette { index: usize, len: usize },
}

/// One region of the RGBA color space during the median cut.
struct Bucket {
    /// Unique colors with their pixel counts.
    colors: Vec<([u8; 4], usize)>,
}

impl Bucket {
    fn population(&self) -> usize {
        self.colors.iter().map(|(_, count)| count).sum()
    }

    /// The channel with the largest value span, and that span. Ties go to
    /// the lower channel so the cut order never depends on anything but
    /// the pixel data.
    fn widest_channel(&self) -> (usize, u8) {
        let mut widest = (0, 0);
        for channel in 0..4 {
            let span = match self.colors.iter().map(|(color, _)| color[channel]).minmax() {
                MinMaxResult::MinMax(lo, hi) => hi - lo,
                _ => 0,
            };
            if span > widest.1 {
                widest = (channel, span);
            }
        }
        widest
    }

    /// Split at the population median along the given channel. Only called
    /// on buckets whose span on that channel is non-zero, so both halves
    /// are guaranteed non-empty.
    fn split(mut self, channel: usize) -> (Bucket, Bucket) {
        self.colors.sort_by_key(|(color, _)| color[channel]);

        let half = self.population() / 2;
        let mut accumulated = 0;
        let mut cut = self.colors.len() - 1;
        for (position, (_, count)) in self.colors.iter().enumerate() {
            accumulated += count;
            if accumulated >= half {
                cut = position + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.colors.len() - 1);

        let upper = self.colors.split_off(cut);
        (Bucket { colors: self.colors }, Bucket { colors: upper })
    }

    /// Population-weighted, rounded average color.
    fn average(&self) -> [u8; 4] {
        let total = self.population() as u64;
        let mut sums = [0u64; 4];
        for (color, count) in &self.colors {
            for channel in 0..4 {
                sums[channel] += u64::from(color[channel]) * *count as u64;
            }
        }
        sums.map(|sum| ((sum + total / 2) / total) as u8)
    }
}

/// Unique colors with pixel counts, in a fixed order so the cut is
/// reproducible across runs.
fn color_histogram(image: &Image) -> Vec<([u8; 4], usize)> {
    let mut histogram: BTreeMap<[u8; 4], usize> = BTreeMap::new();
    for pixel in &image.pixels {
        *histogram.entry(*pixel).or_insert(0) += 1;
    }
    histogram.into_iter().collect()
}

fn median_cut(colors: Vec<([u8; 4], usize)>, palette_size: usize) -> Vec<Bucket> {
    let mut buckets = vec![Bucket { colors }];

    while buckets.len() < palette_size {
        // Pick the bucket with the widest channel span, ties to the
        // earliest bucket. A bucket with zero span holds a single color
        // and cannot be split further.
        let candidate = buckets
            .iter()
            .enumerate()
            .map(|(position, bucket)| {
                let (channel, span) = bucket.widest_channel();
                (span, position, channel)
            })
            .filter(|(span, _, _)| *span > 0)
            .max_by_key(|(span, position, _)| (*span, std::cmp::Reverse(*position)));

        let Some((_, position, channel)) = candidate else {
            break;
        };

        let (lower, upper) = buckets.remove(position).split(channel);
        buckets.push(lower);
        buckets.push(upper);
    }

    buckets
}

/// Quantize `image` down to at most `palette_size` colors and return the
/// index map together with the palette table. The table always has exactly
/// `palette_size` entries; entries the quantizer did not use are fully
/// transparent black.
pub fn extract(
    image: &Image,
    palette_size: usize,
) -> Result<(IndexedImage, Vec<[u8; 4]>), ExtractError> {
    if palette_size == 0 || palette_size > MAX_PALETTE_SIZE {
        return Err(ExtractError::InvalidPaletteSize(palette_size));
    }
    if image.pixels.is_empty() {
        return Err(ExtractError::EmptyImage);
    }

    let buckets = median_cut(color_histogram(image), palette_size);

    let mut table = vec![[0u8; 4]; palette_size];
    let mut index_of: HashMap<[u8; 4], u8> = HashMap::new();
    for (index, bucket) in buckets.iter().enumerate() {
        if index >= palette_size {
            return Err(ExtractError::InconsistentPalette { index, len: palette_size });
        }
        table[index] = bucket.average();
        for (color, _) in &bucket.colors {
            index_of.insert(*color, index as u8);
        }
    }

    // Every pixel appears in the histogram and therefore in some bucket.
    let indices = image
        .pixels
        .par_iter()
        .map(|pixel| index_of[pixel])
        .collect();

    let index_map = IndexedImage {
        width: image.width,
        height: image.height,
        indices,
    };
    Ok((index_map, table))
}
