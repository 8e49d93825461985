// saliency.rs — Conspicuity channels, fusion and fixation extraction.
//
// Per frame:
//
//   intensity   I = Σ N(features(frame, intensity))
//   orientation O = Σ_θ N( Σ N(features(gray, gabor_θ)) )
//   color       C = N(Σ N(features(opp, |R-G|))) + N(Σ N(features(opp, |B-Y|)))
//
//   saliency    S = w_i N(I) + w_c N(C) + w_o N(O)
//
// The fixation is the location of S's global maximum.

use serde::Serialize;
use tracing::{debug, warn};

use crate::channels::{intensity, BlueYellow, Channel, GaborFilter, Intensity, OpponentPlanes, RedGreen};
use crate::config::{FusionWeights, Resolved, SaliencyConfig};
use crate::conspicuity::sum_normalized_features;
use crate::convert::RgbPlanes;
use crate::error::SaliencyError;
use crate::features::extract_features;
use crate::image::Image;
use crate::normalize::{max_filter, Normalizer};
use crate::pyramid::PyramidGeometry;

/// Window side of the diagnostic local-maximum overlay.
const MARK_WINDOW: usize = 5;

/// Most salient location of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fixation {
    pub row: usize,
    pub col: usize,
}

impl Fixation {
    /// `(col / width, row / height)` — position as a fraction of the map size.
    pub fn normalized(&self, width: usize, height: usize) -> (f64, f64) {
        (
            self.col as f64 / width.max(1) as f64,
            self.row as f64 / height.max(1) as f64,
        )
    }
}

/// The three per-channel conspicuity maps, before their final N(·).
#[derive(Debug, Clone)]
pub struct Conspicuities {
    pub intensity: Image<f32>,
    pub color: Image<f32>,
    pub orientation: Image<f32>,
}

/// Fused saliency map plus the conspicuity maps it was built from.
#[derive(Debug, Clone)]
pub struct SaliencyMap {
    pub map: Image<f32>,
    pub conspicuities: Conspicuities,
}

impl SaliencyMap {
    /// Global maximum of the saliency map (first in row-major order on ties).
    pub fn fixation(&self) -> Fixation {
        fixation(&self.map).unwrap_or(Fixation { row: 0, col: 0 })
    }

    pub fn width(&self) -> usize {
        self.map.width()
    }

    pub fn height(&self) -> usize {
        self.map.height()
    }
}

/// Row/column of the global maximum; `None` for an empty map.
pub fn fixation(map: &Image<f32>) -> Option<Fixation> {
    map.argmax().map(|(x, y)| Fixation { row: y, col: x })
}

/// The full Itti-Koch model with its configuration resolved.
///
/// Construction validates the configuration and precomputes the Gabor
/// kernels, so `compute` only fails on data problems.
#[derive(Debug, Clone)]
pub struct SaliencyModel {
    config: SaliencyConfig,
    geometry: PyramidGeometry,
    normalizer: Normalizer,
    gabor: Vec<GaborFilter>,
}

impl SaliencyModel {
    pub fn new(config: SaliencyConfig) -> Result<Self, SaliencyError> {
        let Resolved {
            geometry,
            normalizer,
            gabor,
        } = config.resolve()?;
        if !geometry.is_dyadic() {
            let (start_width, start_height) = geometry.start_size();
            warn!(
                start_width,
                start_height,
                levels = geometry.levels(),
                "pyramid start size not divisible by 2^(levels-1); odd levels are rounded up"
            );
        }
        Ok(SaliencyModel {
            config,
            geometry,
            normalizer,
            gabor,
        })
    }

    pub fn config(&self) -> &SaliencyConfig {
        &self.config
    }

    pub fn geometry(&self) -> &PyramidGeometry {
        &self.geometry
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Aggregated conspicuity of one channel applied to `input`.
    pub fn channel_conspicuity<I, C>(&self, input: &I, channel: &C) -> Result<Image<f32>, SaliencyError>
    where
        I: ?Sized,
        C: Channel<I> + ?Sized,
    {
        let features = extract_features(input, channel, &self.geometry)?;
        sum_normalized_features(&features, &self.geometry, &self.normalizer)
    }

    pub fn intensity_conspicuity(&self, frame: &RgbPlanes) -> Result<Image<f32>, SaliencyError> {
        self.channel_conspicuity(frame, &Intensity)
    }

    /// Σ over orientations of N(orientation conspicuity), folded from the
    /// first orientation so the shape follows the actual maps.
    pub fn orientation_conspicuity(&self, frame: &RgbPlanes) -> Result<Image<f32>, SaliencyError> {
        let gray = intensity(frame);
        self.gabor
            .iter()
            .map(|filter| {
                debug!(theta = filter.params().theta, "orientation channel");
                self.channel_conspicuity(&gray, filter)
                    .map(|c| self.normalizer.apply(&c))
            })
            .reduce(|acc, next| acc?.add(&next?))
            .unwrap_or(Err(SaliencyError::EmptyFeatures))
    }

    /// N(red-green) + N(blue-yellow).
    pub fn color_conspicuity(&self, frame: &RgbPlanes) -> Result<Image<f32>, SaliencyError> {
        let opponent = OpponentPlanes::from_rgb(frame, self.config.threshold_ratio)?;
        let rg = self.channel_conspicuity(&opponent, &RedGreen)?;
        let by = self.channel_conspicuity(&opponent, &BlueYellow)?;
        self.normalizer.apply(&rg).add(&self.normalizer.apply(&by))
    }

    /// Full saliency map of one frame.
    pub fn compute(&self, frame: &RgbPlanes) -> Result<SaliencyMap, SaliencyError> {
        let conspicuities = Conspicuities {
            intensity: self.intensity_conspicuity(frame)?,
            color: self.color_conspicuity(frame)?,
            orientation: self.orientation_conspicuity(frame)?,
        };
        let map = fuse(&conspicuities, &self.normalizer, &self.config.weights)?;
        Ok(SaliencyMap { map, conspicuities })
    }
}

/// `w_i N(I) + w_c N(C) + w_o N(O)`.
pub fn fuse(
    conspicuities: &Conspicuities,
    normalizer: &Normalizer,
    weights: &FusionWeights,
) -> Result<Image<f32>, SaliencyError> {
    let i = normalizer.apply(&conspicuities.intensity).scale(weights.intensity);
    let c = normalizer.apply(&conspicuities.color);
    let o = normalizer.apply(&conspicuities.orientation);
    i.add_scaled(&c, weights.color)?.add_scaled(&o, weights.orientation)
}

/// Overlay local maxima of a gray-scale map for visual inspection.
///
/// Returns RGB planes where red and blue are the map itself and green is
/// `max(map, 255)` at pixels equal to their 5×5 windowed maximum.
pub fn mark_maxima(saliency: &Image<f32>) -> RgbPlanes {
    let maxima = max_filter(saliency, MARK_WINDOW, MARK_WINDOW);
    let green = saliency
        .zip_map(&maxima, "mark_maxima", |v, m| if v == m { v.max(255.0) } else { v })
        .unwrap_or_else(|_| saliency.clone());
    RgbPlanes {
        r: saliency.clone(),
        g: green,
        b: saliency.clone(),
    }
}
