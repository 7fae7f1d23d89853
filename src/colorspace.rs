//! sRGB to CIELAB conversion under the D65 illuminant (2° observer).
//!
//! All conversions run in `f64` with fixed Rec. 709 matrices and white point
//! so that outputs are identical across platforms. Greys (r = g = b) map to
//! chroma values that increase strictly with luminance, which the relevancy
//! rules' strict comparisons rely on.

use crate::types::ImageView;
use palette::{white_point::D65, Srgb};

/// CIELAB colour with `f64` components under the D65 white point.
pub(crate) type Lab = palette::Lab<D65, f64>;

/// Linear sRGB to XYZ matrix (Rec. 709 primaries, D65), row-major.
const XYZ_FROM_RGB: [[f64; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

/// XYZ to linear sRGB matrix, the inverse of [`XYZ_FROM_RGB`].
const RGB_FROM_XYZ: [[f64; 3]; 3] = [
    [3.240479, -1.537150, -0.498535],
    [-0.969256, 1.875992, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

/// The D65 reference white (2° observer), scaled to `Y = 1`.
const WHITE: [f64; 3] = [0.95047, 1.0, 1.08883];

/// Threshold between the cube-root and linear segments of the CIE `f` function.
const CIE_EPSILON: f64 = 0.008856;

/// Decodes one 8-bit sRGB channel to linear light in `0..=1`.
fn srgb_to_linear(c: u8) -> f64 {
    let c = f64::from(c) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Encodes one linear light channel back to nonlinear sRGB in `0..=1`.
fn linear_to_srgb(c: f64) -> f64 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// The CIE `f` function applied to a white-point-relative XYZ component.
fn cie_f(t: f64) -> f64 {
    if t > CIE_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// The inverse of [`cie_f`].
fn cie_f_inv(t: f64) -> f64 {
    if t > 0.2068966 {
        t * t * t
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

/// Converts an 8-bit sRGB pixel to CIELAB.
pub(crate) fn srgb_to_lab(srgb: Srgb<u8>) -> Lab {
    let rgb = [
        srgb_to_linear(srgb.red),
        srgb_to_linear(srgb.green),
        srgb_to_linear(srgb.blue),
    ];

    let [x, y, z] = XYZ_FROM_RGB
        .map(|row| row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]);

    let fx = cie_f(x / WHITE[0]);
    let fy = cie_f(y / WHITE[1]);
    let fz = cie_f(z / WHITE[2]);

    Lab::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Converts a CIELAB colour back to 8-bit sRGB.
///
/// Out-of-gamut values are clipped to the sRGB cube before quantization.
pub(crate) fn lab_to_srgb(lab: Lab) -> Srgb<u8> {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;

    let xyz = [
        cie_f_inv(fx) * WHITE[0],
        cie_f_inv(fy) * WHITE[1],
        cie_f_inv(fz) * WHITE[2],
    ];

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let to8 = |row: [f64; 3]| {
        let linear = row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2];
        let encoded = linear_to_srgb(linear.max(0.0)).clamp(0.0, 1.0);
        (encoded * 255.0).round() as u8
    };

    Srgb::new(to8(RGB_FROM_XYZ[0]), to8(RGB_FROM_XYZ[1]), to8(RGB_FROM_XYZ[2]))
}

/// Returns the chroma `C* = sqrt(a*² + b*²)` of a CIELAB colour.
pub(crate) fn chroma(lab: Lab) -> f64 {
    (lab.a * lab.a + lab.b * lab.b).sqrt()
}

/// Converts a whole image to CIELAB in raster order.
pub(crate) fn image_to_lab(image: ImageView<'_>) -> Vec<Lab> {
    image.pixels().iter().map(|&p| srgb_to_lab(p)).collect()
}

/// Converts a CIELAB pixel buffer back to 8-bit sRGB in raster order.
pub(crate) fn lab_to_srgb_image(lab: &[Lab]) -> Vec<Srgb<u8>> {
    lab.iter().map(|&p| lab_to_srgb(p)).collect()
}

/// Returns the chroma of every pixel in raster order.
pub(crate) fn chroma_image(lab: &[Lab]) -> Vec<f64> {
    lab.iter().map(|&p| chroma(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_maps_to_the_lab_origin() {
        let lab = srgb_to_lab(Srgb::new(0, 0, 0));
        assert!(lab.l.abs() < 1e-9);
        assert!(lab.a.abs() < 1e-9);
        assert!(lab.b.abs() < 1e-9);
    }

    #[test]
    fn white_has_full_lightness_and_negligible_chroma() {
        let lab = srgb_to_lab(Srgb::new(255, 255, 255));
        assert!((lab.l - 100.0).abs() < 1e-3);
        assert!(chroma(lab) < 0.01);
    }

    #[test]
    fn known_grey_lightness() {
        let lab = srgb_to_lab(Srgb::new(38, 38, 38));
        assert!((lab.l - 15.16).abs() < 0.1, "L* was {}", lab.l);

        let lab = srgb_to_lab(Srgb::new(196, 196, 196));
        assert!((lab.l - 79.15).abs() < 0.1, "L* was {}", lab.l);
        assert!(lab.l < 80.0);
    }

    #[test]
    fn grey_axis_chroma_increases_with_lightness() {
        let dark = chroma(srgb_to_lab(Srgb::new(38, 38, 38)));
        let mid = chroma(srgb_to_lab(Srgb::new(196, 196, 196)));
        let bright = chroma(srgb_to_lab(Srgb::new(255, 255, 255)));
        assert!(dark < mid && mid < bright);
    }

    #[test]
    fn saturated_colours_have_large_chroma() {
        let red = srgb_to_lab(Srgb::new(255, 0, 0));
        assert!((red.l - 53.2).abs() < 0.5);
        assert!(chroma(red) > 100.0);

        let pink = srgb_to_lab(Srgb::new(246, 144, 111));
        assert!(chroma(pink) > 40.0);
    }

    #[test]
    fn conversion_round_trips_exactly() {
        let colours = [
            Srgb::new(0, 0, 0),
            Srgb::new(255, 255, 255),
            Srgb::new(38, 38, 38),
            Srgb::new(196, 196, 196),
            Srgb::new(246, 144, 111),
            Srgb::new(209, 198, 161),
            Srgb::new(0, 67, 139),
            Srgb::new(255, 0, 0),
            Srgb::new(0, 255, 0),
            Srgb::new(0, 0, 255),
        ];
        for colour in colours {
            assert_eq!(lab_to_srgb(srgb_to_lab(colour)), colour);
        }
    }

    #[test]
    fn out_of_gamut_lab_is_clipped() {
        let srgb = lab_to_srgb(Lab::new(150.0, 0.0, 0.0));
        assert_eq!(srgb, Srgb::new(255, 255, 255));

        let srgb = lab_to_srgb(Lab::new(-10.0, 0.0, 0.0));
        assert_eq!(srgb, Srgb::new(0, 0, 0));
    }
}
