// resize.rs — Bilinear resampling of f32 images to an explicit target size.
//
// Used in three places:
//   1. bring a channel output to the pyramid start size,
//   2. lift a coarse pyramid level up to its center level before the
//      center-surround difference,
//   3. bring every feature map to the common conspicuity resolution.
//
// Pixel centers are aligned (half-pixel convention):
//
//   src_x = (dst_x + 0.5) * (src_w / dst_w) - 0.5
//
// so a 2× upsample does not shift the image by half a pixel. Samples that
// fall outside the source are clamped to the edge (see interpolate_bilinear).
// No low-pass filtering is applied when shrinking.

use crate::error::SaliencyError;
use crate::image::{interpolate_bilinear, Image};

/// Resize `src` to `width × height` with bilinear interpolation.
///
/// Returns a copy when the size already matches. Zero-sized targets and
/// empty sources are rejected with `InvalidSize`.
pub fn resize_bilinear(src: &Image<f32>, width: usize, height: usize) -> Result<Image<f32>, SaliencyError> {
    if width == 0 || height == 0 {
        return Err(SaliencyError::InvalidSize { width, height });
    }
    if src.is_empty() {
        return Err(SaliencyError::InvalidSize {
            width: src.width(),
            height: src.height(),
        });
    }
    if src.dimensions() == (width, height) {
        return Ok(src.clone());
    }

    let sx = src.width() as f32 / width as f32;
    let sy = src.height() as f32 / height as f32;

    // Source x coordinates are shared by every row.
    let xs: Vec<f32> = (0..width).map(|x| (x as f32 + 0.5) * sx - 0.5).collect();

    let mut dst = Image::new(width, height);
    for y in 0..height {
        let fy = (y as f32 + 0.5) * sy - 0.5;
        for (x, &fx) in xs.iter().enumerate() {
            dst.set(x, y, interpolate_bilinear(src, fx, fy));
        }
    }
    Ok(dst)
}

/// Resize to the dimensions of `like`.
pub fn resize_to_match(src: &Image<f32>, like: &Image<f32>) -> Result<Image<f32>, SaliencyError> {
    resize_bilinear(src, like.width(), like.height())
}
