// normalize.rs — The Itti et al. (1998) map normalization operator N(·).
//
//   1. Rescale the map so its maximum becomes M (zero offset, absolute value).
//   2. Find local maxima: pixels equal to the maximum of a wide rectangular
//      window around them (default: a tenth of the width × the full height).
//   3. mbar = mean value of the local maxima.
//   4. Return rescaled · (M − mbar)².
//
// A map with one strong peak has mbar ≪ M and is amplified; a map with many
// comparable peaks has mbar ≈ M and is suppressed.
//
// Degenerate inputs never produce NaN:
//   - max ≤ flat_tolerance (flat map, including rounding residue left by
//     the pyramid on uniform input) or non-finite max → all-zero map
//   - no local maxima found → mbar = 0, i.e. plain rescaling weighted by M²

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SaliencyError;
use crate::image::Image;

/// Tunables of the normalization operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Global maximum M every map is rescaled to.
    pub max_value: f32,
    /// Local-maximum window width = image width / this.
    pub window_width_divisor: usize,
    /// Local-maximum window height = image height / this.
    pub window_height_divisor: usize,
    /// Maps whose maximum does not exceed this are treated as flat.
    pub flat_tolerance: f32,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        NormalizationConfig {
            max_value: 8.0,
            window_width_divisor: 10,
            window_height_divisor: 1,
            flat_tolerance: 1e-3,
        }
    }
}

/// Local-maximum statistics of a rescaled map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalMaxima {
    /// Number of pixels equal to their windowed maximum.
    pub count: usize,
    /// Mean value over those pixels (0 when `count == 0`).
    pub mean: f32,
}

/// The N(·) operator.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    config: NormalizationConfig,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer {
            config: NormalizationConfig::default(),
        }
    }
}

impl Normalizer {
    pub fn new(config: NormalizationConfig) -> Result<Self, SaliencyError> {
        if !(config.max_value > 0.0) || !config.max_value.is_finite() {
            return Err(SaliencyError::config(format!(
                "normalization maximum must be positive, got {}",
                config.max_value
            )));
        }
        if config.window_width_divisor == 0 || config.window_height_divisor == 0 {
            return Err(SaliencyError::config("local-maximum window divisors must be >= 1"));
        }
        if !(config.flat_tolerance >= 0.0) || !config.flat_tolerance.is_finite() {
            return Err(SaliencyError::config(format!(
                "flat tolerance must be a non-negative number, got {}",
                config.flat_tolerance
            )));
        }
        Ok(Normalizer { config })
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Step 1: scale so the maximum maps to M. `None` when the map's
    /// maximum is not finite or does not exceed `flat_tolerance`.
    pub fn rescale(&self, image: &Image<f32>) -> Option<Image<f32>> {
        let max = image.max_value()?;
        if !(max > self.config.flat_tolerance) || !max.is_finite() {
            return None;
        }
        let alpha = self.config.max_value / max;
        Some(image.map(|v| (v * alpha).abs()))
    }

    /// Window `(width, height)` used for the local-maximum test.
    pub fn window(&self, width: usize, height: usize) -> (usize, usize) {
        (
            (width / self.config.window_width_divisor).max(1),
            (height / self.config.window_height_divisor).max(1),
        )
    }

    /// Steps 2–3 on an already rescaled map.
    pub fn local_maxima(&self, rescaled: &Image<f32>) -> LocalMaxima {
        let (ww, wh) = self.window(rescaled.width(), rescaled.height());
        let maxima = max_filter(rescaled, ww, wh);

        let mut count = 0usize;
        let mut sum = 0.0f64;
        for (&v, &m) in rescaled.as_slice().iter().zip(maxima.as_slice()) {
            if v == m {
                count += 1;
                sum += v as f64;
            }
        }
        let mean = if count > 0 { (sum / count as f64) as f32 } else { 0.0 };
        LocalMaxima { count, mean }
    }

    /// `(M − mbar)²` for `image`; 0 for a degenerate map.
    pub fn weight(&self, image: &Image<f32>) -> f32 {
        match self.rescale(image) {
            Some(rescaled) => self.weight_of_rescaled(&rescaled),
            None => 0.0,
        }
    }

    /// Apply N(·).
    pub fn apply(&self, image: &Image<f32>) -> Image<f32> {
        let Some(rescaled) = self.rescale(image) else {
            debug!(width = image.width(), height = image.height(), "flat map, normalizing to zero");
            return Image::new(image.width(), image.height());
        };
        let weight = self.weight_of_rescaled(&rescaled);
        rescaled.scale(weight)
    }

    fn weight_of_rescaled(&self, rescaled: &Image<f32>) -> f32 {
        let m = self.config.max_value;
        let maxima = self.local_maxima(rescaled);
        if maxima.count == 0 {
            warn!("no local maxima found, falling back to unweighted normalization");
        }
        debug!(count = maxima.count, mbar = maxima.mean, global_max = m, "local maxima");
        (m - maxima.mean).powi(2)
    }
}

/// Windowed maximum with a `win_w × win_h` rectangle.
///
/// The window covers offsets `[-(s/2), s - s/2 - 1]` around each pixel
/// along each axis and is clipped at the image border. Separable: a row
/// pass followed by a column pass.
pub fn max_filter(src: &Image<f32>, win_w: usize, win_h: usize) -> Image<f32> {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let rows = max_pass(src.as_slice(), w, h, win_w.max(1), true);
    let both = max_pass(&rows, w, h, win_h.max(1), false);
    Image::from_vec(w, h, both)
}

fn max_pass(data: &[f32], w: usize, h: usize, size: usize, horizontal: bool) -> Vec<f32> {
    let before = size / 2;
    let after = size - before - 1;
    let mut out = vec![0.0f32; w * h];
    let (len, lines) = if horizontal { (w, h) } else { (h, w) };
    let at = |line: usize, i: usize| if horizontal { line * w + i } else { i * w + line };

    for line in 0..lines {
        for i in 0..len {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(len - 1);
            let mut m = f32::NEG_INFINITY;
            for k in lo..=hi {
                m = m.max(data[at(line, k)]);
            }
            out[at(line, i)] = m;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_filter_window_offsets() {
        // size 3 → offsets [-1, +1]; size 4 → [-2, +1].
        let img = Image::from_vec(6, 1, vec![0.0f32, 0.0, 5.0, 0.0, 0.0, 0.0]);
        let m3 = max_filter(&img, 3, 1);
        assert_eq!(m3.as_slice(), &[0.0, 5.0, 5.0, 5.0, 0.0, 0.0]);
        let m4 = max_filter(&img, 4, 1);
        assert_eq!(m4.as_slice(), &[0.0, 5.0, 5.0, 5.0, 5.0, 0.0]);
    }

    #[test]
    fn test_max_filter_full_height() {
        let mut img = Image::<f32>::new(3, 4);
        img.set(1, 3, 2.0);
        let m = max_filter(&img, 1, 4);
        for y in 0..4 {
            assert_eq!(m.get(1, y), 2.0);
            assert_eq!(m.get(0, y), 0.0);
        }
    }

    #[test]
    fn test_rescale_maps_max_to_m() {
        let n = Normalizer::default();
        let img = Image::from_vec(3, 1, vec![1.0f32, 2.0, 4.0]);
        let r = n.rescale(&img).unwrap();
        assert_eq!(r.as_slice(), &[2.0, 4.0, 8.0]);
        // Already spanning [0, M]: unchanged.
        let again = n.rescale(&r).unwrap();
        assert_eq!(again.max_value(), Some(8.0));
        assert_eq!(again, r);
    }

    #[test]
    fn test_flat_zero_map_is_zero() {
        let n = Normalizer::default();
        let img = Image::<f32>::new(20, 10);
        let out = n.apply(&img);
        assert_eq!(out.dimensions(), (20, 10));
        assert!(out.pixels().all(|(_, _, v)| v == 0.0));
        assert_eq!(n.weight(&img), 0.0);
    }

    #[test]
    fn test_rounding_residue_is_flat() {
        let n = Normalizer::default();
        let mut img = Image::<f32>::new(16, 16);
        img.set(3, 7, 2e-5);
        assert!(n.rescale(&img).is_none());
        assert!(n.apply(&img).pixels().all(|(_, _, v)| v == 0.0));

        let strict = Normalizer::new(NormalizationConfig {
            flat_tolerance: 0.0,
            ..NormalizationConfig::default()
        })
        .unwrap();
        assert_eq!(strict.rescale(&img).unwrap().get(3, 7), 8.0);
    }

    #[test]
    fn test_single_peak_weight() {
        // 1×1 window: every pixel is a local max. Single peak at 8 among 3
        // zeros → mbar = 2, weight = 36.
        let n = Normalizer::new(NormalizationConfig {
            window_width_divisor: 100,
            window_height_divisor: 100,
            ..NormalizationConfig::default()
        })
        .unwrap();
        let img = Image::from_vec(2, 2, vec![3.0f32, 0.0, 0.0, 0.0]);
        assert!((n.weight(&img) - 36.0).abs() < 1e-5);
        let out = n.apply(&img);
        assert!((out.get(0, 0) - 8.0 * 36.0).abs() < 1e-3);
    }

    #[test]
    fn test_constant_map_fully_suppressed() {
        // Every pixel is a local max at M → weight 0.
        let n = Normalizer::default();
        let img = Image::filled(30, 10, 3.0f32);
        assert_eq!(n.weight(&img), 0.0);
        assert!(n.apply(&img).pixels().all(|(_, _, v)| v == 0.0));
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad = NormalizationConfig {
            max_value: 0.0,
            ..NormalizationConfig::default()
        };
        assert!(Normalizer::new(bad).is_err());
        let bad = NormalizationConfig {
            window_width_divisor: 0,
            ..NormalizationConfig::default()
        };
        assert!(Normalizer::new(bad).is_err());
    }
}
