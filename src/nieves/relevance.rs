//! Relevancy classification of cubes.
//!
//! A cube is relevant when its pixel population is judged large or salient
//! enough to contribute a colour to the palette: either it holds more than
//! the primary share of the image's pixels, or enough of its pixels are
//! strongly chromatic or strongly lit to pass the secondary rules.

use super::{grid::CubeGrid, Halt, NievesOptions};
use crate::{
    colorspace::Lab,
    error::PaletteError,
    progress::{Cancelled, Tracker},
};

/// The resolved numeric thresholds for one classification pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Thresholds {
    /// A cube with more pixels than this is relevant outright.
    primary_count: f64,
    /// Minimum number of qualifying pixels for the secondary rules.
    secondary_count: f64,
    /// The image-wide chroma percentile value pixels must exceed.
    chroma_reference: f64,
    /// The lightness pixels must exceed for the secondary L* rule.
    min_l_star: f64,
}

impl Thresholds {
    /// Resolves the option values against one image's pixel count and
    /// chroma distribution.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn new(options: &NievesOptions, total_pixels: u32, chromas: &[f64]) -> Self {
        let mut sorted = chromas.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);
        let chroma_reference = percentile(&sorted, options.c_star_percentile_value());

        let total = f64::from(total_pixels);
        Self {
            primary_count: total * options.primary_threshold_value(),
            secondary_count: total * options.secondary_threshold_value(),
            chroma_reference,
            min_l_star: options.min_l_star_value(),
        }
    }
}

/// Returns the `p`-th percentile of `sorted` (ascending, non-empty) using
/// linear interpolation between the two closest ranks.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    #[allow(clippy::cast_precision_loss)]
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let low = rank.floor() as usize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let high = rank.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        #[allow(clippy::cast_precision_loss)]
        let fraction = rank - low as f64;
        sorted[low] + (sorted[high] - sorted[low]) * fraction
    }
}

/// Computes every cube's mean colour and relevancy status, then verifies
/// that the cubes account for every pixel of the image.
///
/// Progress is reported per L* layer up to `target`.
pub(crate) fn classify(
    grid: &mut CubeGrid,
    thresholds: &Thresholds,
    total_pixels: u32,
    tracker: &mut Tracker<'_, '_>,
    target: f64,
) -> Result<(), Halt> {
    let layers = grid.layer_count();
    let step = tracker.step(target, layers);
    let mut accounted: u64 = 0;

    for layer in 0..layers {
        for cube in grid.layer_mut(layer) {
            let count = cube.len();
            accounted += count as u64;
            cube.mean = mean_colour(&cube.pixels);
            cube.relevant = if count == 0 {
                false
            } else {
                #[allow(clippy::cast_precision_loss)]
                let count = count as f64;
                if count > thresholds.primary_count {
                    true
                } else {
                    secondary_relevant(cube.pixels.as_slice(), &cube.chromas, thresholds)
                }
            };
        }
        if layer % 8 == 7 {
            tracker.advance(8.0 * step)?;
        }
    }
    tracker.set(target)?;

    let expected = u64::from(total_pixels);
    if accounted == expected {
        Ok(())
    } else {
        Err(PaletteError::PixelAccounting { expected, actual: accounted }.into())
    }
}

/// Applies the secondary relevancy rules to one cube's pixels.
///
/// A cube passes when the number of its pixels whose chroma exceeds the
/// image-wide reference, or whose L* exceeds the minimum, is strictly above
/// the secondary pixel-count threshold.
#[allow(clippy::cast_precision_loss)]
fn secondary_relevant(pixels: &[Lab], chromas: &[f64], thresholds: &Thresholds) -> bool {
    let chroma_count = chromas
        .iter()
        .filter(|&&c| c > thresholds.chroma_reference)
        .count() as f64;
    if chroma_count > thresholds.secondary_count {
        return true;
    }

    let lightness_count = pixels
        .iter()
        .filter(|pixel| pixel.l > thresholds.min_l_star)
        .count() as f64;
    lightness_count > thresholds.secondary_count
}

/// Returns the arithmetic mean colour of `pixels`, or a neutral colour for
/// an empty slice.
fn mean_colour(pixels: &[Lab]) -> Lab {
    if pixels.is_empty() {
        return Lab::new(0.0, 0.0, 0.0);
    }
    let mut sum = [0.0f64; 3];
    for pixel in pixels {
        sum[0] += pixel.l;
        sum[1] += pixel.a;
        sum[2] += pixel.b;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = pixels.len() as f64;
    Lab::new(sum[0] / n, sum[1] / n, sum[2] / n)
}

/// Collects the arena indices of the relevant cubes in grid iteration order,
/// reporting progress per L* layer up to `target`.
pub(crate) fn relevant_cubes(
    grid: &CubeGrid,
    tracker: &mut Tracker<'_, '_>,
    target: f64,
) -> Result<Vec<usize>, Cancelled> {
    let layers = grid.layer_count();
    let layer_len = grid.layer_len();
    let step = tracker.step(target, layers);

    let mut relevant = Vec::new();
    for layer in 0..layers {
        let base = layer * layer_len;
        for (offset, cube) in grid.layer(layer).iter().enumerate() {
            if cube.relevant {
                relevant.push(base + offset);
            }
        }
        if layer % 8 == 7 {
            tracker.advance(8.0 * step)?;
        }
    }
    tracker.set(target)?;
    Ok(relevant)
}
