// config.rs — Model configuration: defaults, JSON loading, validation.
//
// Every field has a default, so a JSON file only needs the keys it wants to
// override:
//
//   { "levels": 8, "start_width": 512, "start_height": 256,
//     "normalization": { "max_value": 10.0 } }
//
// `validate()` is the single place configuration errors are raised; the
// model calls it on construction so bad settings fail before any frame is
// processed.

use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::channels::{GaborFilter, GaborParams};
use crate::error::SaliencyError;
use crate::normalize::{NormalizationConfig, Normalizer};
use crate::pyramid::PyramidGeometry;

/// Relative weights of the three normalized conspicuity maps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub intensity: f32,
    pub color: f32,
    pub orientation: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        FusionWeights {
            intensity: 1.0 / 3.0,
            color: 1.0 / 3.0,
            orientation: 1.0 / 3.0,
        }
    }
}

/// Parts of a validated configuration, built by `SaliencyConfig::resolve`.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub geometry: PyramidGeometry,
    pub normalizer: Normalizer,
    pub gabor: Vec<GaborFilter>,
}

/// Full saliency model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaliencyConfig {
    /// Number of pyramid levels (≥ 7).
    pub levels: usize,
    /// Width every channel output is resized to before the pyramid.
    pub start_width: usize,
    /// Height every channel output is resized to before the pyramid.
    pub start_height: usize,
    /// Color planes below `max(intensity) / threshold_ratio` are zeroed.
    pub threshold_ratio: f32,
    /// Number of Gabor orientations, evenly spaced over [0, π).
    pub orientations: usize,
    /// Gabor kernel parameters; `theta` is the offset of the first orientation.
    pub gabor: GaborParams,
    pub normalization: NormalizationConfig,
    pub weights: FusionWeights,
}

impl Default for SaliencyConfig {
    fn default() -> Self {
        SaliencyConfig {
            levels: 9,
            start_width: 640,
            start_height: 480,
            threshold_ratio: 10.0,
            orientations: 4,
            gabor: GaborParams::default(),
            normalization: NormalizationConfig::default(),
            weights: FusionWeights::default(),
        }
    }
}

impl SaliencyConfig {
    /// Read a JSON configuration file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, SaliencyError> {
        let content = fs::read_to_string(path)?;
        let config: SaliencyConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "loaded saliency configuration");
        Ok(config)
    }

    /// Reject every setting the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), SaliencyError> {
        self.resolve().map(|_| ())
    }

    /// Validate and build every derived part the model needs, once.
    pub(crate) fn resolve(&self) -> Result<Resolved, SaliencyError> {
        let geometry = self.geometry()?;
        let normalizer = self.normalizer()?;
        if !(self.threshold_ratio > 0.0) || !self.threshold_ratio.is_finite() {
            return Err(SaliencyError::config(format!(
                "threshold_ratio must be positive, got {}",
                self.threshold_ratio
            )));
        }
        if self.orientations == 0 {
            return Err(SaliencyError::config("at least one Gabor orientation is required"));
        }
        let gabor = self.gabor_filters()?;
        let w = self.weights;
        for (name, v) in [("intensity", w.intensity), ("color", w.color), ("orientation", w.orientation)] {
            if !v.is_finite() || v < 0.0 {
                return Err(SaliencyError::config(format!("{name} weight must be a non-negative number, got {v}")));
            }
        }
        if w.intensity + w.color + w.orientation <= 0.0 {
            return Err(SaliencyError::config("fusion weights must not all be zero"));
        }
        Ok(Resolved {
            geometry,
            normalizer,
            gabor,
        })
    }

    /// Pyramid geometry shared by feature extraction and aggregation.
    pub fn geometry(&self) -> Result<PyramidGeometry, SaliencyError> {
        PyramidGeometry::new(self.levels, self.start_width, self.start_height)
    }

    pub fn normalizer(&self) -> Result<Normalizer, SaliencyError> {
        Normalizer::new(self.normalization)
    }

    /// One filter per orientation: `theta = gabor.theta + k π / orientations`.
    pub fn gabor_filters(&self) -> Result<Vec<GaborFilter>, SaliencyError> {
        (0..self.orientations)
            .map(|k| {
                let theta = self.gabor.theta + k as f32 * (PI / self.orientations as f32);
                GaborFilter::new(self.gabor.with_theta(theta))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SaliencyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "levels": 8, "start_width": 512, "start_height": 256,
                        "normalization": { "max_value": 10.0 } }"#;
        let config: SaliencyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.levels, 8);
        assert_eq!(config.orientations, 4);
        assert_eq!(config.normalization.max_value, 10.0);
        assert_eq!(config.normalization.window_width_divisor, 10);
        assert_eq!(config.gabor, GaborParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let cases = [
            SaliencyConfig { levels: 5, ..SaliencyConfig::default() },
            SaliencyConfig { start_width: 100, ..SaliencyConfig::default() },
            SaliencyConfig { threshold_ratio: -1.0, ..SaliencyConfig::default() },
            SaliencyConfig { orientations: 0, ..SaliencyConfig::default() },
            SaliencyConfig {
                gabor: GaborParams { width: 0, ..GaborParams::default() },
                ..SaliencyConfig::default()
            },
            SaliencyConfig {
                weights: FusionWeights { intensity: 0.0, color: 0.0, orientation: 0.0 },
                ..SaliencyConfig::default()
            },
        ];
        for c in cases {
            let err = c.validate().unwrap_err();
            assert!(err.is_config(), "{err}");
        }
    }

    #[test]
    fn test_resolve_builds_every_part() {
        let config = SaliencyConfig::default();
        let parts = config.resolve().unwrap();
        assert_eq!(parts.geometry, config.geometry().unwrap());
        assert_eq!(parts.gabor.len(), config.orientations);
        assert_eq!(parts.normalizer.config(), &config.normalization);
    }

    #[test]
    fn test_shallow_levels_from_json_rejected() {
        let config: SaliencyConfig = serde_json::from_str(r#"{ "levels": 4 }"#).unwrap();
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_gabor_orientations_evenly_spaced() {
        let config = SaliencyConfig::default();
        let filters = config.gabor_filters().unwrap();
        let thetas: Vec<f32> = filters.iter().map(|f| f.params().theta).collect();
        let expected = [0.0, PI / 4.0, PI / 2.0, 3.0 * PI / 4.0];
        for (t, e) in thetas.iter().zip(expected) {
            assert!((t - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saliency.json");
        fs::write(&path, r#"{ "orientations": 2 }"#).unwrap();
        let config = SaliencyConfig::load(&path).unwrap();
        assert_eq!(config.orientations, 2);

        fs::write(&path, "{ not json").unwrap();
        let err = SaliencyConfig::load(&path).unwrap_err();
        assert!(matches!(err, SaliencyError::Config(_)));
    }
}
