// error.rs — Error taxonomy for the saliency pipeline.
//
// Three families:
//   configuration  — rejected eagerly when a model or geometry is built;
//                    fatal for an evaluation run.
//   shape/size     — pixel-wise ops on mismatched images, zero-sized
//                    resize targets.
//   data           — frame decoding, gaze parsing, I/O. Local to one frame
//                    or one source; the evaluation loop skips and continues.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the saliency pipeline and its data sources.
#[derive(Debug, Error)]
pub enum SaliencyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{op}: shape mismatch {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: usize, height: usize },

    #[error("no feature maps to aggregate")]
    EmptyFeatures,

    #[error("frame {index} out of range (source has {len} frames)")]
    FrameOutOfRange { index: usize, len: usize },

    #[error("no frames found in {0}")]
    NoFrames(PathBuf),

    #[error("gaze file line {line}: {message}")]
    GazeParse { line: usize, message: String },

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse failed: {0}")]
    Config(#[from] serde_json::Error),
}

impl SaliencyError {
    /// Shorthand for `InvalidConfig`.
    pub fn config(msg: impl Into<String>) -> Self {
        SaliencyError::InvalidConfig(msg.into())
    }

    /// Configuration errors abort a run; everything else is per-frame.
    pub fn is_config(&self) -> bool {
        matches!(self, SaliencyError::InvalidConfig(_) | SaliencyError::Config(_))
    }
}
