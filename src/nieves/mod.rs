//! The Nieves colour-palette algorithm (relevancy-based CIELAB quantization).
//!
//! The image is converted to CIELAB (D65 illuminant), the colour space is
//! partitioned into fixed-size cubes by one of two [`PartitionStrategy`]
//! placements, and each cube's pixel population is tested against a primary
//! pixel-share threshold and secondary chroma/lightness rules. The mean
//! colours of the cubes that pass make up the palette; every pixel is then
//! rewritten to its own or nearest relevant cube's mean colour, which also
//! yields the relative frequency of each palette colour.
//!
//! The run is sequential and cooperative: it reports progress at fixed
//! milestones and polls a cancellation token at every report.

// Relevant paper (free access):
// Nieves, Gomez-Robledo, Chen and Romero,
// Computing the relevant colors that describe the color palette of paintings,
// Applied Optics, vol. 59, no. 11, 3408-3415, 2020.
// https://doi.org/10.1364/AO.378659

mod grid;
mod relevance;
mod remap;

pub use grid::PartitionStrategy;

use crate::{
    colorspace,
    error::{OptionsError, PaletteError},
    progress::{Cancelled, ProgressMonitor, Tracker},
    types::{ImageView, PaletteOutcome, PaletteResult},
};
use grid::CubeGrid;
use ordered_float::OrderedFloat;
use palette::Srgb;
use relevance::Thresholds;
use std::cmp::Reverse;

/// Progress milestone after the CIELAB conversion.
const CONVERTED: f64 = 5.0;
/// Progress milestone after cube grid allocation.
const PARTITIONED: f64 = 10.0;
/// Progress milestone after pixel accumulation.
const ACCUMULATED: f64 = 25.0;
/// Progress milestone after relevancy classification.
const CLASSIFIED: f64 = 40.0;
/// Progress milestone after relevant-cube collection.
const COLLECTED: f64 = 50.0;
/// Progress milestone after pixel reassignment.
const REASSIGNED: f64 = 90.0;
/// Progress milestone after the conversion back to sRGB.
const RECODED: f64 = 95.0;
/// Progress milestone after palette colour conversion.
const PALETTE_BUILT: f64 = 97.0;
/// Progress milestone after frequency computation.
const DONE: f64 = 100.0;

/// Options controlling palette extraction.
///
/// All values have documented defaults; construct with [`NievesOptions::new`]
/// and override per call.
///
/// # Examples
/// ```
/// # use nievette::NievesOptions;
/// let options = NievesOptions::new()
///     .cube_size(10)
///     .primary_threshold(0.05);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NievesOptions {
    /// The CIELAB side length of the partitioning cubes.
    cube_size: i32,
    /// The pixel share a cube must strictly exceed to be relevant outright.
    primary_threshold: f64,
    /// The image-wide chroma percentile used by the secondary rules.
    c_star_percentile: f64,
    /// The pixel share for the secondary rules; defaults to an eighth of
    /// the primary threshold.
    secondary_threshold: Option<f64>,
    /// The lightness a pixel must strictly exceed for the secondary L* rule.
    min_l_star: f64,
}

impl Default for NievesOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl NievesOptions {
    /// Creates options with the default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cube_size: 20,
            primary_threshold: 0.03,
            c_star_percentile: 50.0,
            secondary_threshold: None,
            min_l_star: 80.0,
        }
    }

    /// Sets the CIELAB side length of the partitioning cubes.
    ///
    /// The default cube size is `20`. It must be positive.
    #[must_use]
    pub const fn cube_size(mut self, cube_size: i32) -> Self {
        self.cube_size = cube_size;
        self
    }

    /// Sets the pixel share a cube must strictly exceed to be relevant
    /// outright.
    ///
    /// The default primary threshold is `0.03` (3% of the image's pixels).
    #[must_use]
    pub const fn primary_threshold(mut self, threshold: f64) -> Self {
        self.primary_threshold = threshold;
        self
    }

    /// Sets the image-wide chroma percentile that pixels must exceed to count
    /// towards the secondary chroma rule.
    ///
    /// The default is the `50.0`-th percentile.
    #[must_use]
    pub const fn c_star_percentile(mut self, percentile: f64) -> Self {
        self.c_star_percentile = percentile;
        self
    }

    /// Sets the pixel share for the secondary relevancy rules.
    ///
    /// The default is an eighth of the primary threshold.
    #[must_use]
    pub const fn secondary_threshold(mut self, threshold: f64) -> Self {
        self.secondary_threshold = Some(threshold);
        self
    }

    /// Sets the lightness a pixel must strictly exceed to count towards the
    /// secondary L* rule.
    ///
    /// The default minimum is `80.0`.
    #[must_use]
    pub const fn min_l_star(mut self, min_l_star: f64) -> Self {
        self.min_l_star = min_l_star;
        self
    }

    /// The configured cube size.
    pub(crate) const fn cube_size_value(&self) -> i32 {
        self.cube_size
    }

    /// The configured primary threshold.
    pub(crate) const fn primary_threshold_value(&self) -> f64 {
        self.primary_threshold
    }

    /// The configured chroma percentile.
    pub(crate) const fn c_star_percentile_value(&self) -> f64 {
        self.c_star_percentile
    }

    /// The secondary threshold, defaulting to an eighth of the primary.
    pub(crate) fn secondary_threshold_value(&self) -> f64 {
        self.secondary_threshold
            .unwrap_or(self.primary_threshold / 8.0)
    }

    /// The configured minimum L*.
    pub(crate) const fn min_l_star_value(&self) -> f64 {
        self.min_l_star
    }

    /// Rejects option values that cannot be used for a run.
    fn validate(&self) -> Result<(), OptionsError> {
        if self.cube_size <= 0 {
            return Err(OptionsError::NonPositiveCubeSize(self.cube_size));
        }
        let share = 0.0..=1.0;
        if !self.primary_threshold.is_finite() || !share.contains(&self.primary_threshold) {
            return Err(OptionsError::ThresholdOutOfRange {
                name: "primary",
                value: self.primary_threshold,
            });
        }
        if let Some(secondary) = self.secondary_threshold {
            if !secondary.is_finite() || !share.contains(&secondary) {
                return Err(OptionsError::ThresholdOutOfRange {
                    name: "secondary",
                    value: secondary,
                });
            }
        }
        if !self.c_star_percentile.is_finite() || !(0.0..=100.0).contains(&self.c_star_percentile) {
            return Err(OptionsError::PercentileOutOfRange(self.c_star_percentile));
        }
        if !self.min_l_star.is_finite() {
            return Err(OptionsError::NonFiniteMinLStar(self.min_l_star));
        }
        Ok(())
    }
}

/// Why a run stopped before producing a result.
enum Halt {
    /// The cancellation token was observed.
    Cancelled,
    /// A fatal error occurred.
    Fault(PaletteError),
}

impl From<Cancelled> for Halt {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<PaletteError> for Halt {
    fn from(error: PaletteError) -> Self {
        Self::Fault(error)
    }
}

/// Generates the colour palette of `image` and recolours it with only the
/// palette colours.
///
/// Returns the recoloured image together with the palette and the relative
/// frequency of each palette colour, ordered by descending frequency. If the
/// monitor's cancellation token is observed mid-run, the run stops and
/// [`PaletteOutcome::Cancelled`] is returned instead; no partial output is
/// produced.
///
/// # Errors
/// Returns an error when the options are invalid, the image is empty, no
/// cube passes the relevancy rules, or an internal pixel-accounting
/// invariant is violated.
///
/// # Examples
/// ```
/// # use nievette::{generate_palette, ImageView, NievesOptions, PartitionStrategy, ProgressMonitor};
/// # use palette::Srgb;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pixels = vec![Srgb::new(255u8, 255, 255); 16];
/// let view = ImageView::new(&pixels, 4, 4)?;
///
/// let outcome = generate_palette(
///     view,
///     PartitionStrategy::Centred,
///     &NievesOptions::new(),
///     &mut ProgressMonitor::silent(),
/// )?;
///
/// let result = outcome.completed().ok_or("cancelled")?;
/// assert_eq!(result.palette, vec![Srgb::new(255u8, 255, 255)]);
/// # Ok(())
/// # }
/// ```
pub fn generate_palette(
    image: ImageView<'_>,
    strategy: PartitionStrategy,
    options: &NievesOptions,
    monitor: &mut ProgressMonitor<'_>,
) -> Result<PaletteOutcome, PaletteError> {
    options.validate()?;
    if image.is_empty() {
        return Err(PaletteError::EmptyImage);
    }

    match run(image, strategy, options, monitor) {
        Ok(result) => Ok(PaletteOutcome::Completed(result)),
        Err(Halt::Cancelled) => Ok(PaletteOutcome::Cancelled),
        Err(Halt::Fault(error)) => Err(error),
    }
}

/// Runs the stage sequence over one image.
fn run(
    image: ImageView<'_>,
    strategy: PartitionStrategy,
    options: &NievesOptions,
    monitor: &mut ProgressMonitor<'_>,
) -> Result<PaletteResult, Halt> {
    let mut tracker = Tracker::new(monitor);
    tracker.set(0.0)?;

    log::debug!(
        "generating colour palette for a {}x{} image ({strategy:?} cubes)",
        image.width(),
        image.height(),
    );

    let mut lab = colorspace::image_to_lab(image);
    let chromas = colorspace::chroma_image(&lab);
    let total_pixels = image.num_pixels();
    tracker.set(CONVERTED)?;

    let cube_size = f64::from(options.cube_size_value());
    let (mut grid, assignments) =
        CubeGrid::build(&lab, strategy, cube_size, &mut tracker, PARTITIONED)?;

    let width = image.width() as usize;
    grid.accumulate(&lab, &chromas, &assignments, width, &mut tracker, ACCUMULATED)?;

    let thresholds = Thresholds::new(options, total_pixels, &chromas);
    relevance::classify(&mut grid, &thresholds, total_pixels, &mut tracker, CLASSIFIED)?;

    let relevant = relevance::relevant_cubes(&grid, &mut tracker, COLLECTED)?;
    if relevant.is_empty() {
        return Err(PaletteError::NoRelevantCubes.into());
    }
    log::debug!("{} relevant colours found", relevant.len());

    remap::reassign(&mut lab, &mut grid, &assignments, &relevant, width, &mut tracker, REASSIGNED)?;

    let recoloured = colorspace::lab_to_srgb_image(&lab);
    tracker.set(RECODED)?;

    let palette: Vec<Srgb<u8>> = relevant
        .iter()
        .map(|&index| colorspace::lab_to_srgb(grid.cube(index).mean))
        .collect();
    tracker.set(PALETTE_BUILT)?;

    let frequencies = remap::relative_frequencies(&grid, &relevant, total_pixels);
    tracker.set(DONE)?;

    Ok(into_result(image, recoloured, palette, frequencies))
}

/// Assembles the output, ordering palette entries by descending relative
/// frequency (stable, so ties keep the cube iteration order).
fn into_result(
    image: ImageView<'_>,
    recoloured: Vec<Srgb<u8>>,
    palette: Vec<Srgb<u8>>,
    frequencies: Vec<f64>,
) -> PaletteResult {
    let mut order: Vec<usize> = (0..palette.len()).collect();
    order.sort_by_key(|&i| Reverse(OrderedFloat(frequencies[i])));

    PaletteResult {
        recoloured,
        width: image.width(),
        height: image.height(),
        palette: order.iter().map(|&i| palette[i]).collect(),
        frequencies: order.iter().map(|&i| frequencies[i]).collect(),
    }
}
