//! Contains various types needed across the crate.

use crate::MAX_PIXELS;
use palette::Srgb;
use thiserror::Error;
#[cfg(feature = "image")]
use {
    image::{DynamicImage, RgbImage},
    palette::cast::{AsComponents, ComponentsAs},
};

/// An error type for image buffers whose geometry does not describe a usable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImageViewError {
    /// The pixel buffer length does not equal `width * height`.
    #[error("pixel buffer of length {len} does not match {width}x{height} dimensions")]
    DimensionMismatch {
        /// The length of the pixel buffer.
        len: usize,
        /// The claimed image width in pixels.
        width: u32,
        /// The claimed image height in pixels.
        height: u32,
    },
    /// The image has more pixels than [`MAX_PIXELS`].
    #[error("image is above the maximum supported size in pixels")]
    AboveMaxPixels,
}

/// A borrowed, row-major sRGB pixel buffer with validated dimensions.
///
/// The invariants are that the buffer length equals `width * height`
/// and that the pixel count is not greater than [`MAX_PIXELS`].
///
/// # Examples
/// From a raw pixel slice:
/// ```
/// # use nievette::{ImageView, ImageViewError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), ImageViewError> {
/// let pixels = vec![Srgb::new(0u8, 0, 0); 6];
/// let view = ImageView::new(&pixels, 3, 2)?;
/// # Ok(())
/// # }
/// ```
///
/// From an image (needs the `image` feature to be enabled):
/// ```no_run
/// # use nievette::ImageView;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let view = ImageView::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageView<'a> {
    /// The row-major pixel buffer.
    pixels: &'a [Srgb<u8>],
    /// The image width in pixels.
    width: u32,
    /// The image height in pixels.
    height: u32,
}

impl<'a> ImageView<'a> {
    /// Creates an [`ImageView`] over `pixels`, validating the geometry.
    pub fn new(pixels: &'a [Srgb<u8>], width: u32, height: u32) -> Result<Self, ImageViewError> {
        let len = pixels.len();
        if len != (width as usize) * (height as usize) {
            Err(ImageViewError::DimensionMismatch { len, width, height })
        } else if len > MAX_PIXELS as usize {
            Err(ImageViewError::AboveMaxPixels)
        } else {
            Ok(Self { pixels, width, height })
        }
    }

    /// Creates an [`ImageView`] without validating the geometry.
    #[allow(unused)]
    pub(crate) const fn new_unchecked(pixels: &'a [Srgb<u8>], width: u32, height: u32) -> Self {
        Self { pixels, width, height }
    }

    /// The row-major pixel buffer.
    #[must_use]
    pub const fn pixels(&self) -> &'a [Srgb<u8>] {
        self.pixels
    }

    /// The image width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// The image height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The number of pixels as a `u32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn num_pixels(&self) -> u32 {
        self.pixels.len() as u32
    }

    /// Whether the image contains no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ImageView<'a> {
    type Error = ImageViewError;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        let pixels = image.pixels().len();
        let buf = &image.as_raw()[..(pixels * 3)];
        Self::new(buf.components_as(), image.width(), image.height())
    }
}

/// An owned, row-major sRGB pixel buffer with validated dimensions.
///
/// This is the owned counterpart of [`ImageView`]. Converting from a
/// [`DynamicImage`] broadcasts greyscale input to three channels and strips
/// an alpha channel if present.
#[cfg(feature = "image")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuf {
    /// The row-major pixel buffer.
    pixels: Vec<Srgb<u8>>,
    /// The image width in pixels.
    width: u32,
    /// The image height in pixels.
    height: u32,
}

#[cfg(feature = "image")]
impl ImageBuf {
    /// Borrows the buffer as an [`ImageView`].
    #[must_use]
    pub fn view(&self) -> ImageView<'_> {
        ImageView::new_unchecked(&self.pixels, self.width, self.height)
    }
}

#[cfg(feature = "image")]
impl TryFrom<&DynamicImage> for ImageBuf {
    type Error = ImageViewError;

    fn try_from(image: &DynamicImage) -> Result<Self, Self::Error> {
        let rgb = image.to_rgb8();
        let num_pixels = rgb.pixels().len();
        if num_pixels > MAX_PIXELS as usize {
            return Err(ImageViewError::AboveMaxPixels);
        }
        let pixels: &[Srgb<u8>] = rgb.as_raw()[..(num_pixels * 3)].components_as();
        Ok(Self {
            pixels: pixels.to_vec(),
            width: rgb.width(),
            height: rgb.height(),
        })
    }
}

/// The terminal outcome of a palette extraction run.
///
/// Cancellation is an expected outcome rather than an error, so a run that
/// observes its cancellation token returns [`PaletteOutcome::Cancelled`]
/// instead of an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteOutcome {
    /// The run completed and produced a result.
    Completed(PaletteResult),
    /// The cancellation token was observed before the run completed.
    ///
    /// No partial image or palette is produced.
    Cancelled,
}

impl PaletteOutcome {
    /// Returns the result of a completed run, or `None` if it was cancelled.
    #[must_use]
    pub fn completed(self) -> Option<PaletteResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled => None,
        }
    }

    /// Whether the run was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// The output of a completed palette extraction run.
///
/// Palette entries are ordered by descending relative frequency; entries with
/// equal frequencies keep the deterministic cube iteration order. The
/// frequencies sum to `1.0` (within floating-point tolerance) for any image
/// with at least one pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteResult {
    /// The recoloured image as a row-major pixel buffer, using only
    /// colours from `palette`.
    pub recoloured: Vec<Srgb<u8>>,
    /// The width of the recoloured image in pixels (same as the input).
    pub width: u32,
    /// The height of the recoloured image in pixels (same as the input).
    pub height: u32,
    /// The colour palette of the image.
    pub palette: Vec<Srgb<u8>>,
    /// The relative frequency of each palette colour in the recoloured image.
    pub frequencies: Vec<f64>,
}

#[cfg(feature = "image")]
impl PaletteResult {
    /// Returns the recoloured image as an [`RgbImage`].
    #[must_use]
    pub fn recoloured_rgbimage(&self) -> RgbImage {
        let bytes = self.recoloured.as_components().to_vec();
        // the buffer length is width * height by construction
        #[allow(clippy::expect_used)]
        RgbImage::from_raw(self.width, self.height, bytes).expect("buffer matches dimensions")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn view_geometry_is_validated() {
        let pixels = vec![Srgb::new(1u8, 2, 3); 6];

        let view = ImageView::new(&pixels, 3, 2).unwrap();
        assert_eq!(view.num_pixels(), 6);
        assert_eq!((view.width(), view.height()), (3, 2));

        assert_eq!(
            ImageView::new(&pixels, 4, 2),
            Err(ImageViewError::DimensionMismatch { len: 6, width: 4, height: 2 })
        );
    }

    #[test]
    fn empty_view_is_allowed() {
        let view = ImageView::new(&[], 0, 0).unwrap();
        assert!(view.is_empty());
    }

    #[cfg(feature = "image")]
    #[test]
    fn view_from_rgbimage() {
        let image = RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]));
        let view = ImageView::try_from(&image).unwrap();
        assert_eq!(view.num_pixels(), 12);
        assert_eq!(view.pixels()[0], Srgb::new(10, 20, 30));
    }

    #[cfg(feature = "image")]
    #[test]
    fn greyscale_is_broadcast_and_alpha_is_stripped() {
        let grey = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([77])));
        let buf = ImageBuf::try_from(&grey).unwrap();
        assert_eq!(buf.view().pixels()[0], Srgb::new(77, 77, 77));

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([1, 2, 3, 128]),
        ));
        let buf = ImageBuf::try_from(&rgba).unwrap();
        assert_eq!(buf.view().pixels()[0], Srgb::new(1, 2, 3));
    }

    #[cfg(feature = "image")]
    #[test]
    fn recoloured_rgbimage_round_trips() {
        let result = PaletteResult {
            recoloured: vec![Srgb::new(5u8, 6, 7); 4],
            width: 2,
            height: 2,
            palette: vec![Srgb::new(5u8, 6, 7)],
            frequencies: vec![1.0],
        };
        let image = result.recoloured_rgbimage();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1).0, [5, 6, 7]);
    }
}
