// pyramid.rs — Binomial image pyramid and the geometry that sizes it.
//
// Each level is one `pyr_down` of the previous one:
//   1. [1 4 6 4 1]/16 blur in both directions, mirrored borders
//   2. keep every other sample, so (w, h) → ((w+1)/2, (h+1)/2)
//
// `PyramidGeometry` is the single source of truth for every size the
// saliency pipeline uses: the start size the channel output is resized to,
// the size of each level, and the common resolution conspicuity maps are
// aggregated at. Feature extraction and aggregation both take the same
// geometry, so the two can never disagree about the implicit scale.

use tracing::debug;

use crate::convolution::{reduce_cols, reduce_rows, Border, BINOMIAL_5};
use crate::error::SaliencyError;
use crate::image::{Image, Pixel};

/// Smallest level count for which the center-surround range
/// `1..=levels-6` is non-empty.
pub const MIN_LEVELS: usize = 7;

/// Level count and start size of a feature pyramid.
///
/// Only `PyramidGeometry::new` builds one, so every geometry in use has
/// passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidGeometry {
    levels: usize,
    start_width: usize,
    start_height: usize,
}

impl PyramidGeometry {
    /// Validate and build a geometry.
    ///
    /// Rejects fewer than `MIN_LEVELS` levels and a start side shorter than
    /// `2^(levels-1)`, below which the coarse levels collapse to 1 pixel.
    pub fn new(levels: usize, start_width: usize, start_height: usize) -> Result<Self, SaliencyError> {
        if levels < MIN_LEVELS {
            return Err(SaliencyError::config(format!(
                "pyramid needs at least {MIN_LEVELS} levels for center-surround offsets 3 and 4, got {levels}"
            )));
        }
        let shift = levels - 1;
        if shift >= usize::BITS as usize || (start_width >> shift) == 0 || (start_height >> shift) == 0 {
            return Err(SaliencyError::config(format!(
                "start size {start_width}x{start_height} is too small for {levels} levels"
            )));
        }
        Ok(PyramidGeometry {
            levels,
            start_width,
            start_height,
        })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Size every channel output is resized to before the pyramid.
    pub fn start_size(&self) -> (usize, usize) {
        (self.start_width, self.start_height)
    }

    /// Whether both start sides divide by `2^(levels-1)`. Otherwise some
    /// level has an odd side and the next one rounds up.
    pub fn is_dyadic(&self) -> bool {
        let divisor = 1usize << (self.levels - 1);
        self.start_width % divisor == 0 && self.start_height % divisor == 0
    }

    /// Size of pyramid level `level`, halving with round-up as `Pyramid::build`.
    pub fn level_size(&self, level: usize) -> (usize, usize) {
        let mut w = self.start_width;
        let mut h = self.start_height;
        for _ in 0..level {
            w = w.div_ceil(2);
            h = h.div_ceil(2);
        }
        (w, h)
    }

    /// Common resolution for conspicuity maps:
    /// `round(start * 2^(1 - levels/2))`, never below 1×1.
    pub fn common_size(&self) -> (usize, usize) {
        let factor = 2f64.powf(1.0 - self.levels as f64 / 2.0);
        let w = (self.start_width as f64 * factor).round().max(1.0) as usize;
        let h = (self.start_height as f64 * factor).round().max(1.0) as usize;
        (w, h)
    }

    /// `(center, surround)` pyramid index pairs used for feature maps:
    /// every `i` in `1..=levels-6` paired with `i+3` and `i+4`.
    pub fn center_surround_pairs(&self) -> Result<Vec<(usize, usize)>, SaliencyError> {
        let last_center = match self.levels.checked_sub(6) {
            Some(c) if c >= 1 => c,
            _ => {
                return Err(SaliencyError::config(format!(
                    "{} pyramid levels leave no center-surround pairs",
                    self.levels
                )))
            }
        };
        Ok((1..=last_center)
            .flat_map(|i| [3usize, 4].into_iter().map(move |j| (i, i + j)))
            .collect())
    }
}

/// A binomial image pyramid.
///
/// `levels[0]` is the original resolution (converted to f32).
/// `levels[n]` is `levels[n-1]` blurred and halved, rounding odd sides up.
pub struct Pyramid {
    /// Pyramid levels, from finest (index 0) to coarsest.
    pub levels: Vec<Image<f32>>,
}

impl Pyramid {
    /// Build a pyramid of `num_levels` levels from an input image.
    ///
    /// # Panics
    /// Panics if `num_levels == 0`.
    pub fn build<T: Pixel>(src: &Image<T>, num_levels: usize) -> Self {
        assert!(num_levels >= 1, "pyramid must have at least 1 level");

        let mut levels: Vec<Image<f32>> = Vec::with_capacity(num_levels);
        levels.push(src.map(Pixel::to_f32));

        for l in 1..num_levels {
            let down = pyr_down(&levels[l - 1]);
            debug!(level = l, width = down.width(), height = down.height(), "pyramid level");
            levels.push(down);
        }

        Pyramid { levels }
    }

    /// Number of pyramid levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Get a reference to a specific level.
    pub fn level(&self, level: usize) -> &Image<f32> {
        &self.levels[level]
    }
}

/// One pyramid step: binomial blur, then every other pixel in both
/// directions. An empty image stays empty.
pub fn pyr_down(src: &Image<f32>) -> Image<f32> {
    if src.is_empty() {
        return Image::new(src.width().div_ceil(2), src.height().div_ceil(2));
    }
    let half_width = reduce_rows(src, &BINOMIAL_5, Border::Reflect101);
    reduce_cols(&half_width, &BINOMIAL_5, Border::Reflect101)
}
