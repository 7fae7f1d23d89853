//! The builder struct for configuring and running palette extractions.

use crate::{
    generate_palette, ImageView, NievesOptions, PaletteError, PaletteOutcome, PartitionStrategy,
    ProgressMonitor,
};
#[cfg(feature = "image")]
use {crate::ImageViewError, image::RgbImage};

/// A builder for extracting the colour palette of an image and recolouring
/// the image with it.
///
/// # Examples
/// Run with the default options:
/// ```no_run
/// # use nievette::{ExtractionPipeline, PaletteOutcome};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
///
/// let outcome = ExtractionPipeline::try_from(&img)?.extract()?;
/// # Ok(())
/// # }
/// ```
///
/// Override options and report progress:
/// ```no_run
/// # use nievette::{CancellationToken, ExtractionPipeline, PartitionStrategy, ProgressMonitor};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
///
/// let mut sink = |percent| eprintln!("{percent}%");
/// let mut monitor = ProgressMonitor::new(&mut sink, CancellationToken::new());
///
/// let outcome = ExtractionPipeline::try_from(&img)?
///     .strategy(PartitionStrategy::Offset)
///     .cube_size(16)
///     .primary_threshold(0.05)
///     .extract_with(&mut monitor)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExtractionPipeline<'a> {
    /// The image to extract the palette from.
    image: ImageView<'a>,
    /// The cube placement strategy.
    strategy: PartitionStrategy,
    /// The algorithm options.
    options: NievesOptions,
}

impl<'a> ExtractionPipeline<'a> {
    /// Creates a pipeline over `image` with the default strategy and options.
    #[must_use]
    pub fn new(image: ImageView<'a>) -> Self {
        Self {
            image,
            strategy: PartitionStrategy::default(),
            options: NievesOptions::new(),
        }
    }

    /// Sets the cube placement strategy. The default is
    /// [`PartitionStrategy::Centred`].
    #[must_use]
    pub const fn strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replaces all algorithm options at once.
    #[must_use]
    pub const fn options(mut self, options: NievesOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the CIELAB side length of the partitioning cubes.
    /// See [`NievesOptions::cube_size`].
    #[must_use]
    pub const fn cube_size(mut self, cube_size: i32) -> Self {
        self.options = self.options.cube_size(cube_size);
        self
    }

    /// Sets the primary relevancy threshold.
    /// See [`NievesOptions::primary_threshold`].
    #[must_use]
    pub const fn primary_threshold(mut self, threshold: f64) -> Self {
        self.options = self.options.primary_threshold(threshold);
        self
    }

    /// Sets the chroma percentile for the secondary rules.
    /// See [`NievesOptions::c_star_percentile`].
    #[must_use]
    pub const fn c_star_percentile(mut self, percentile: f64) -> Self {
        self.options = self.options.c_star_percentile(percentile);
        self
    }

    /// Sets the secondary relevancy threshold.
    /// See [`NievesOptions::secondary_threshold`].
    #[must_use]
    pub const fn secondary_threshold(mut self, threshold: f64) -> Self {
        self.options = self.options.secondary_threshold(threshold);
        self
    }

    /// Sets the minimum L* for the secondary lightness rule.
    /// See [`NievesOptions::min_l_star`].
    #[must_use]
    pub const fn min_l_star(mut self, min_l_star: f64) -> Self {
        self.options = self.options.min_l_star(min_l_star);
        self
    }

    /// Runs the extraction without progress reporting or cancellation.
    ///
    /// # Errors
    /// See [`generate_palette`].
    pub fn extract(self) -> Result<PaletteOutcome, PaletteError> {
        self.extract_with(&mut ProgressMonitor::silent())
    }

    /// Runs the extraction, reporting progress to `monitor` and stopping
    /// early if its cancellation token is observed.
    ///
    /// # Errors
    /// See [`generate_palette`].
    pub fn extract_with(
        self,
        monitor: &mut ProgressMonitor<'_>,
    ) -> Result<PaletteOutcome, PaletteError> {
        generate_palette(self.image, self.strategy, &self.options, monitor)
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ExtractionPipeline<'a> {
    type Error = ImageViewError;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        ImageView::try_from(image).map(Self::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use palette::Srgb;

    #[test]
    fn pipeline_runs_over_a_view() {
        let pixels = vec![Srgb::new(255u8, 255, 255); 64];
        let view = ImageView::new(&pixels, 8, 8).unwrap();

        let result = ExtractionPipeline::new(view)
            .extract()
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(result.palette, vec![Srgb::new(255u8, 255, 255)]);
        assert!((result.frequencies[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn setters_forward_to_the_options() {
        let pixels = vec![Srgb::new(0u8, 0, 0); 4];
        let view = ImageView::new(&pixels, 2, 2).unwrap();

        let pipeline = ExtractionPipeline::new(view)
            .strategy(PartitionStrategy::Offset)
            .cube_size(10)
            .primary_threshold(0.1)
            .c_star_percentile(75.0)
            .secondary_threshold(0.02)
            .min_l_star(70.0);

        let expected = NievesOptions::new()
            .cube_size(10)
            .primary_threshold(0.1)
            .c_star_percentile(75.0)
            .secondary_threshold(0.02)
            .min_l_star(70.0);
        assert_eq!(pipeline.options, expected);
        assert_eq!(pipeline.strategy, PartitionStrategy::Offset);
    }

    #[cfg(feature = "image")]
    #[test]
    fn pipeline_from_rgbimage() {
        let image = RgbImage::from_pixel(4, 4, image::Rgb([0, 67, 139]));
        let result = ExtractionPipeline::try_from(&image)
            .unwrap()
            .extract()
            .unwrap()
            .completed()
            .unwrap();

        assert_eq!(result.palette.len(), 1);
        assert_eq!(result.palette[0], Srgb::new(0, 67, 139));
        let recoloured = result.recoloured_rgbimage();
        assert_eq!(recoloured.dimensions(), (4, 4));
    }
}
