// convert.rs — Conversions between decoded frames, plane images and u8 output.
//
// Frames arrive as interleaved 8-bit RGB (`image::RgbImage`). The pipeline
// works on planar f32 (`RgbPlanes`) with RAW values (u8 42 → f32 42.0), so
// the color-opponency thresholds and Gabor responses stay in the same units
// as the source pixels.
//
// Going back to u8 is only needed for diagnostic PNGs; `f32_stretch_to_u8`
// maps a map's [0, max] range to [0, 255].

use ::image::{Rgb, RgbImage};

use crate::error::SaliencyError;
use crate::image::{ensure_same_shape, Image, Pixel};

/// Three same-sized f32 color planes.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbPlanes {
    pub r: Image<f32>,
    pub g: Image<f32>,
    pub b: Image<f32>,
}

impl RgbPlanes {
    /// Assemble planes, rejecting mismatched dimensions.
    pub fn new(r: Image<f32>, g: Image<f32>, b: Image<f32>) -> Result<Self, SaliencyError> {
        ensure_same_shape("rgb planes", r.dimensions(), g.dimensions())?;
        ensure_same_shape("rgb planes", r.dimensions(), b.dimensions())?;
        Ok(RgbPlanes { r, g, b })
    }

    /// A frame where every pixel has the same color.
    pub fn uniform(width: usize, height: usize, rgb: [f32; 3]) -> Self {
        RgbPlanes {
            r: Image::filled(width, height, rgb[0]),
            g: Image::filled(width, height, rgb[1]),
            b: Image::filled(width, height, rgb[2]),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.r.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.r.height()
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        self.r.dimensions()
    }

    /// Split an interleaved 8-bit frame into raw-valued f32 planes.
    pub fn from_rgb8(frame: &RgbImage) -> Self {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        let mut r = Image::new(w, h);
        let mut g = Image::new(w, h);
        let mut b = Image::new(w, h);
        for (x, y, px) in frame.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            r.set(x, y, px[0] as f32);
            g.set(x, y, px[1] as f32);
            b.set(x, y, px[2] as f32);
        }
        RgbPlanes { r, g, b }
    }

    /// Interleave the planes back into an 8-bit frame (clamped, rounded).
    pub fn to_rgb8(&self) -> RgbImage {
        let (w, h) = self.dimensions();
        RgbImage::from_fn(w as u32, h as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([
                u8::from_f32(self.r.get(x, y)),
                u8::from_f32(self.g.get(x, y)),
                u8::from_f32(self.b.get(x, y)),
            ])
        })
    }
}

/// Linearly map `[0, max]` of a non-negative map to `[0, 255]`.
/// An all-zero (or empty) map stays zero.
pub fn f32_stretch_to_u8(src: &Image<f32>) -> Image<u8> {
    let max = src.max_value().unwrap_or(0.0);
    if !(max > 0.0) || !max.is_finite() {
        return Image::new(src.width(), src.height());
    }
    let k = 255.0 / max;
    src.map(|v| u8::from_f32(v * k))
}

/// Grayscale from RGB planes.
/// Uses ITU-R BT.601 luma coefficients: Y = 0.299*R + 0.587*G + 0.114*B
pub fn rgb_to_grayscale(rgb: &RgbPlanes) -> Image<f32> {
    let (w, h) = rgb.dimensions();
    let mut gray = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let luma = 0.299 * rgb.r.get(x, y) + 0.587 * rgb.g.get(x, y) + 0.114 * rgb.b.get(x, y);
            gray.set(x, y, luma);
        }
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rgb8_clamps_and_rounds() {
        let r = Image::from_vec(2, 2, vec![-10.0f32, 0.0, 300.0, 127.6]);
        let planes = RgbPlanes::new(r.clone(), r.clone(), r).unwrap();
        let out = planes.to_rgb8();
        let reds: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(reds, vec![0, 0, 255, 128]);
    }

    #[test]
    fn test_stretch_to_u8() {
        let img = Image::from_vec(3, 1, vec![0.0f32, 4.0, 8.0]);
        let out = f32_stretch_to_u8(&img);
        assert_eq!(out.as_slice(), &[0, 128, 255]);
        let zero = f32_stretch_to_u8(&Image::new(2, 2));
        assert!(zero.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_rgb_to_grayscale() {
        let red = RgbPlanes::uniform(1, 1, [1.0, 0.0, 0.0]);
        assert!((rgb_to_grayscale(&red).get(0, 0) - 0.299).abs() < 1e-6);

        let white = RgbPlanes::uniform(1, 1, [1.0, 1.0, 1.0]);
        assert!((rgb_to_grayscale(&white).get(0, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rgb8_planes() {
        let mut frame = RgbImage::new(2, 1);
        frame.put_pixel(1, 0, Rgb([10, 20, 30]));
        let planes = RgbPlanes::from_rgb8(&frame);
        assert_eq!(planes.dimensions(), (2, 1));
        assert_eq!(planes.r.get(1, 0), 10.0);
        assert_eq!(planes.g.get(1, 0), 20.0);
        assert_eq!(planes.b.get(1, 0), 30.0);
        assert_eq!(planes.to_rgb8(), frame);
    }

    #[test]
    fn test_planes_shape_checked() {
        let ok = RgbPlanes::new(Image::new(2, 2), Image::new(2, 2), Image::new(2, 2));
        assert!(ok.is_ok());
        let bad = RgbPlanes::new(Image::new(2, 2), Image::new(3, 2), Image::new(2, 2));
        assert!(matches!(bad, Err(SaliencyError::ShapeMismatch { .. })));
    }
}
