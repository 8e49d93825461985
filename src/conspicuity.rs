// conspicuity.rs — Fold a channel's feature maps into one conspicuity map.
//
// Every feature map is resized to the geometry's common resolution,
// normalized with N(·), and summed. The common resolution comes from the
// same `PyramidGeometry` the features were extracted with, so the output
// size depends only on the configuration, never on the feature maps.

use tracing::debug;

use crate::error::SaliencyError;
use crate::features::FeatureMap;
use crate::image::Image;
use crate::normalize::Normalizer;
use crate::pyramid::PyramidGeometry;
use crate::resize::resize_bilinear;

/// Sum of `N(resize(feature))` over all feature maps.
pub fn sum_normalized_features(
    features: &[FeatureMap],
    geometry: &PyramidGeometry,
    normalizer: &Normalizer,
) -> Result<Image<f32>, SaliencyError> {
    let (w, h) = geometry.common_size();
    debug!(width = w, height = h, maps = features.len(), "conspicuity map size");

    let mut maps = features.iter();
    let first = maps.next().ok_or(SaliencyError::EmptyFeatures)?;
    let mut consp = normalizer.apply(&resize_bilinear(&first.map, w, h)?);
    for f in maps {
        let resized = normalizer.apply(&resize_bilinear(&f.map, w, h)?);
        consp = consp.add(&resized)?;
    }
    Ok(consp)
}
