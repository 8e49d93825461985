// features.rs — Center-surround feature maps over a binomial pyramid.
//
//   1. channel(input)               e.g. intensity, |R-G|, Gabor response
//   2. resize to the start size     (only if the channel output differs)
//   3. pyramid of `levels` levels
//   4. for center c in 1..=levels-6, surround s = c+3 and c+4:
//        |level[c] - resize(level[s] → size of level[c])|
//
// Offsets of 3 and 4 octaves approximate the antagonistic center and
// surround of a receptive field. Each map is tagged (c+1, s-c+1), the
// 1-based labels used throughout the Itti-Koch literature.

use tracing::debug;

use crate::channels::Channel;
use crate::error::SaliencyError;
use crate::image::Image;
use crate::pyramid::{Pyramid, PyramidGeometry};
use crate::resize::{resize_bilinear, resize_to_match};

/// One center-surround difference map.
#[derive(Debug, Clone)]
pub struct FeatureMap {
    /// 1-based center level label (`c + 1`).
    pub center: usize,
    /// 1-based center-surround offset label (`s - c + 1`).
    pub delta: usize,
    /// The difference image, at the center level's resolution.
    pub map: Image<f32>,
}

impl FeatureMap {
    /// `(center, delta)` tag.
    pub fn scales(&self) -> (usize, usize) {
        (self.center, self.delta)
    }
}

/// Run `channel` on `input` and return its center-surround feature maps.
pub fn extract_features<I, C>(
    input: &I,
    channel: &C,
    geometry: &PyramidGeometry,
) -> Result<Vec<FeatureMap>, SaliencyError>
where
    I: ?Sized,
    C: Channel<I> + ?Sized,
{
    let pairs = geometry.center_surround_pairs()?;
    let transformed = channel.apply(input)?;
    let (start_w, start_h) = geometry.start_size();
    let start = if transformed.dimensions() != (start_w, start_h) {
        resize_bilinear(&transformed, start_w, start_h)?
    } else {
        transformed
    };

    let pyramid = Pyramid::build(&start, geometry.levels());
    center_surround(&pyramid, &pairs)
}

/// Center-surround maps of an already built pyramid.
pub fn features_from_pyramid(
    pyramid: &Pyramid,
    geometry: &PyramidGeometry,
) -> Result<Vec<FeatureMap>, SaliencyError> {
    if pyramid.num_levels() != geometry.levels() {
        return Err(SaliencyError::config(format!(
            "pyramid has {} levels, geometry expects {}",
            pyramid.num_levels(),
            geometry.levels()
        )));
    }
    center_surround(pyramid, &geometry.center_surround_pairs()?)
}

fn center_surround(pyramid: &Pyramid, pairs: &[(usize, usize)]) -> Result<Vec<FeatureMap>, SaliencyError> {
    let mut features = Vec::with_capacity(pairs.len());
    for &(c, s) in pairs {
        debug!(center = c, surround = s, "computing center-surround features");
        let big = pyramid.level(c);
        let small = pyramid.level(s);
        let scaled = resize_to_match(small, big)?;
        debug!(
            source = ?small.dimensions(),
            target = ?big.dimensions(),
            "surround resized to center"
        );
        features.push(FeatureMap {
            center: c + 1,
            delta: s - c + 1,
            map: big.absdiff(&scaled)?,
        });
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Intensity;
    use crate::convert::RgbPlanes;

    fn geometry() -> PyramidGeometry {
        PyramidGeometry::new(7, 128, 128).unwrap()
    }

    #[test]
    fn test_feature_tags_and_sizes() {
        let g = PyramidGeometry::new(9, 512, 256).unwrap();
        let img = Image::from_fn(512, 256, |x, y| ((x / 16 + y / 16) % 2) as f32 * 100.0);
        let identity = |i: &Image<f32>| -> Result<Image<f32>, SaliencyError> { Ok(i.clone()) };
        let fs = extract_features(&img, &identity, &g).unwrap();

        let tags: Vec<_> = fs.iter().map(FeatureMap::scales).collect();
        assert_eq!(tags, vec![(2, 4), (2, 5), (3, 4), (3, 5), (4, 4), (4, 5)]);
        for f in &fs {
            assert_eq!(f.map.dimensions(), g.level_size(f.center - 1));
            assert!(f.map.pixels().all(|(_, _, v)| v >= 0.0));
        }
    }

    #[test]
    fn test_channel_output_resized_to_start() {
        // 100×60 frame, geometry start 128×128.
        let rgb = RgbPlanes::uniform(100, 60, [50.0, 80.0, 20.0]);
        let fs = extract_features(&rgb, &Intensity, &geometry()).unwrap();
        assert_eq!(fs.len(), 2);
        assert_eq!(fs[0].map.dimensions(), (64, 64));
    }

    #[test]
    fn test_uniform_input_has_zero_features() {
        let rgb = RgbPlanes::uniform(128, 128, [90.0, 90.0, 90.0]);
        let fs = extract_features(&rgb, &Intensity, &geometry()).unwrap();
        for f in fs {
            assert!(f.map.pixels().all(|(_, _, v)| v.abs() < 1e-3));
        }
    }

    #[test]
    fn test_channel_error_propagates() {
        let failing = |_: &Image<f32>| -> Result<Image<f32>, SaliencyError> {
            Err(SaliencyError::InvalidSize { width: 0, height: 0 })
        };
        let img = Image::<f32>::new(4, 4);
        assert!(extract_features(&img, &failing, &geometry()).is_err());
    }

    #[test]
    fn test_pyramid_level_count_checked() {
        let img = Image::<f32>::new(128, 128);
        let pyr = Pyramid::build(&img, 5);
        assert!(features_from_pyramid(&pyr, &geometry()).unwrap_err().is_config());
    }
}
