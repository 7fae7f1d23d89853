//! Error types for palette extraction.

use thiserror::Error;

/// An error type for option values that cannot be used for an extraction run.
///
/// Invalid options are rejected before any pixel or cube work begins.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum OptionsError {
    /// The cube side length must be a positive number of CIELAB units.
    #[error("cube size must be positive (got {0})")]
    NonPositiveCubeSize(i32),
    /// A relevancy threshold must be a finite fraction of the pixel count.
    #[error("{name} threshold must be a finite value in 0..=1 (got {value})")]
    ThresholdOutOfRange {
        /// Which threshold was rejected.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The chroma percentile must be a valid percentile.
    #[error("C* percentile must be a finite value in 0..=100 (got {0})")]
    PercentileOutOfRange(f64),
    /// The minimum L* bound must be a usable lightness value.
    #[error("minimum L* must be finite (got {0})")]
    NonFiniteMinLStar(f64),
}

/// An error type for failed extraction runs.
///
/// Cancellation is not an error; a cancelled run returns
/// [`PaletteOutcome::Cancelled`](crate::PaletteOutcome::Cancelled) instead.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PaletteError {
    /// The input image contains no pixels.
    #[error("image contains no pixels")]
    EmptyImage,
    /// One of the extraction options is unusable.
    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),
    /// No cube passed the relevancy rules, so no palette can be produced.
    ///
    /// This indicates degenerate input rather than a bug.
    #[error("no relevant colours found in the image")]
    NoRelevantCubes,
    /// The per-cube pixel counts do not add up to the image pixel count.
    ///
    /// This indicates an internal partitioning or accumulation bug.
    #[error("pixel accounting mismatch after classification: expected {expected}, found {actual}")]
    PixelAccounting {
        /// The total number of pixels in the image.
        expected: u64,
        /// The number of pixels found across all cubes.
        actual: u64,
    },
}
