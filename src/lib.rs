// conspicuity: Itti-Koch bottom-up visual saliency for video frames
// CPU implementation of the conspicuity-map model and a gaze evaluation loop
//
// Reference: Itti, Koch, Niebur — "A Model of Saliency-Based Visual
// Attention for Rapid Scene Analysis" (IEEE TPAMI 1998)

pub mod error;
pub mod image;
pub mod convert;
pub mod convolution;
pub mod resize;
pub mod pyramid;

pub mod channels;     // intensity, color opponency, Gabor orientation
pub mod features;     // center-surround maps over the pyramid
pub mod normalize;    // the N(·) operator
pub mod conspicuity;  // per-channel aggregation at the common scale
pub mod config;
pub mod saliency;     // fusion and fixation

pub mod gaze;         // ground-truth repair
pub mod evaluation;   // per-frame fixation error
pub mod dataset;      // frame directories and gaze files

pub use config::SaliencyConfig;
pub use error::SaliencyError;
pub use evaluation::{EvaluationConfig, EvaluationReport, Evaluator};
pub use saliency::{Fixation, SaliencyMap, SaliencyModel};
