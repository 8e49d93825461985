// evaluation.rs — Per-frame fixation error against recorded gaze.
//
// The loop that ties the pipeline to a dataset:
//
//   1. Repair the gaze sequence (fill NaN samples from their neighbours)
//   2. Evaluate min(frames, gaze samples) frames, optionally capped
//   3. Per frame: load → saliency map → fixation
//   4. Normalize fixation by the map size and gaze by the frame size
//   5. Error = Euclidean distance between the two normalized points
//   6. Report per-frame results and the mean error
//
// A frame that fails with a data error (decode failure, shape mismatch) is
// logged and skipped. Configuration errors abort the whole run.
//
// Frames are independent, so parallel mode hands them to rayon. Results are
// collected back in frame order either way.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::convert::RgbPlanes;
use crate::error::SaliencyError;
use crate::gaze::{count_missing, repair_gaze, GazePoint};
use crate::saliency::{Fixation, SaliencyMap, SaliencyModel};

/// An indexed sequence of video frames.
pub trait FrameSource: Sync {
    /// Number of frames available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load frame `index` (0-based).
    fn frame(&self, index: usize) -> Result<RgbPlanes, SaliencyError>;
}

/// Recorded gaze per (video, viewer) pair, one sample per frame.
pub trait GazeSource {
    fn gaze(&self, video: usize, viewer: usize) -> Result<Vec<GazePoint>, SaliencyError>;
}

/// In-memory frames, mostly for tests and synthetic runs.
impl FrameSource for Vec<RgbPlanes> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn frame(&self, index: usize) -> Result<RgbPlanes, SaliencyError> {
        self.get(index).cloned().ok_or(SaliencyError::FrameOutOfRange {
            index,
            len: self.as_slice().len(),
        })
    }
}

/// Evaluation loop settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Dispatch frames through the rayon thread pool.
    pub parallel: bool,
    /// Stop after this many frames.
    pub max_frames: Option<usize>,
}

/// Outcome of one evaluated frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub index: usize,
    pub fixation: Fixation,
    /// Fixation as `(col / map_width, row / map_height)`.
    pub fixation_normalized: (f64, f64),
    /// Repaired gaze sample in frame pixels.
    pub gaze: GazePoint,
    /// Gaze as `(x / frame_width, y / frame_height)`.
    pub gaze_normalized: (f64, f64),
    /// Euclidean distance between the two normalized points.
    pub error: f64,
}

/// Results of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Evaluated frames, in frame order.
    pub frames: Vec<FrameResult>,
    /// Indices of frames skipped because of data errors.
    pub skipped: Vec<usize>,
    /// Mean error over evaluated frames; `None` if nothing was evaluated.
    pub mean_error: Option<f64>,
}

impl EvaluationReport {
    fn from_results(frames: Vec<FrameResult>, skipped: Vec<usize>) -> Self {
        let mean_error = if frames.is_empty() {
            None
        } else {
            Some(frames.iter().map(|f| f.error).sum::<f64>() / frames.len() as f64)
        };
        EvaluationReport { frames, skipped, mean_error }
    }
}

/// Euclidean distance between two points.
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Runs a `SaliencyModel` over a frame sequence and scores its fixations.
#[derive(Debug, Clone)]
pub struct Evaluator {
    model: SaliencyModel,
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(model: SaliencyModel, config: EvaluationConfig) -> Self {
        Evaluator { model, config }
    }

    pub fn model(&self) -> &SaliencyModel {
        &self.model
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate `frames` against the raw (unrepaired) gaze sequence.
    pub fn run<F>(&self, frames: &F, gaze: &[GazePoint]) -> Result<EvaluationReport, SaliencyError>
    where
        F: FrameSource + ?Sized,
    {
        self.run_with(frames, gaze, |_, _| {})
    }

    /// Fetch the gaze of `(video, viewer)` from `gaze` and evaluate.
    pub fn run_source<F, G>(
        &self,
        frames: &F,
        gaze: &G,
        video: usize,
        viewer: usize,
    ) -> Result<EvaluationReport, SaliencyError>
    where
        F: FrameSource + ?Sized,
        G: GazeSource + ?Sized,
    {
        let points = gaze.gaze(video, viewer)?;
        info!(video, viewer, samples = points.len(), "loaded gaze");
        self.run(frames, &points)
    }

    /// Like `run`, calling `on_frame` with every computed saliency map.
    ///
    /// In parallel mode `on_frame` may be called from several threads and
    /// out of frame order.
    pub fn run_with<F, C>(
        &self,
        frames: &F,
        gaze: &[GazePoint],
        on_frame: C,
    ) -> Result<EvaluationReport, SaliencyError>
    where
        F: FrameSource + ?Sized,
        C: Fn(usize, &SaliencyMap) + Sync,
    {
        let missing = count_missing(gaze);
        if missing > 0 {
            info!(missing, total = gaze.len(), "repairing missing gaze samples");
        }
        let gaze = repair_gaze(gaze);

        if frames.len() != gaze.len() {
            warn!(
                frames = frames.len(),
                gaze = gaze.len(),
                "frame and gaze counts differ, evaluating the shorter"
            );
        }
        let mut count = frames.len().min(gaze.len());
        if let Some(max) = self.config.max_frames {
            count = count.min(max);
        }
        info!(frames = count, parallel = self.config.parallel, "starting evaluation");

        let evaluate = |index: usize| -> Result<Option<FrameResult>, SaliencyError> {
            match self.evaluate_frame(frames, index, gaze[index], &on_frame) {
                Ok(result) => {
                    info!(frame = index, error = result.error, "frame evaluated");
                    Ok(Some(result))
                }
                Err(e) if e.is_config() => Err(e),
                Err(e) => {
                    warn!(frame = index, error = %e, "skipping frame");
                    Ok(None)
                }
            }
        };

        let outcomes: Vec<Result<Option<FrameResult>, SaliencyError>> = if self.config.parallel {
            (0..count).into_par_iter().map(evaluate).collect()
        } else {
            let mut outcomes = Vec::with_capacity(count);
            for index in 0..count {
                let outcome = evaluate(index);
                let fatal = outcome.is_err();
                outcomes.push(outcome);
                if fatal {
                    break;
                }
            }
            outcomes
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome? {
                Some(r) => results.push(r),
                None => skipped.push(index),
            }
        }

        let report = EvaluationReport::from_results(results, skipped);
        match report.mean_error {
            Some(mean) => info!(
                evaluated = report.frames.len(),
                skipped = report.skipped.len(),
                mean_error = mean,
                "evaluation finished"
            ),
            None => warn!(skipped = report.skipped.len(), "no frames evaluated"),
        }
        Ok(report)
    }

    /// Score a single frame against an already repaired gaze sample.
    pub fn evaluate_frame<F, C>(
        &self,
        frames: &F,
        index: usize,
        gaze: GazePoint,
        on_frame: &C,
    ) -> Result<FrameResult, SaliencyError>
    where
        F: FrameSource + ?Sized,
        C: Fn(usize, &SaliencyMap) + ?Sized,
    {
        let frame = frames.frame(index)?;
        let (frame_w, frame_h) = frame.dimensions();
        let saliency = self.model.compute(&frame)?;
        on_frame(index, &saliency);

        let fixation = saliency.fixation();
        let fixation_normalized = fixation.normalized(saliency.width(), saliency.height());
        let gaze_normalized = gaze.normalized(frame_w, frame_h);
        Ok(FrameResult {
            index,
            fixation,
            fixation_normalized,
            gaze,
            gaze_normalized,
            error: distance(fixation_normalized, gaze_normalized),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaliencyConfig;

    fn model() -> SaliencyModel {
        SaliencyModel::new(SaliencyConfig {
            levels: 7,
            start_width: 128,
            start_height: 128,
            orientations: 1,
            ..SaliencyConfig::default()
        })
        .unwrap()
    }

    /// Frame source where some indices fail to load.
    struct Flaky {
        frames: Vec<RgbPlanes>,
        broken: Vec<usize>,
    }

    impl FrameSource for Flaky {
        fn len(&self) -> usize {
            self.frames.len()
        }

        fn frame(&self, index: usize) -> Result<RgbPlanes, SaliencyError> {
            if self.broken.contains(&index) {
                return Err(SaliencyError::InvalidSize { width: 0, height: 0 });
            }
            self.frames.frame(index)
        }
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance((0.0, 0.0), (3.0, 4.0)), 5.0);
        assert_eq!(distance((0.5, 0.5), (0.5, 0.5)), 0.0);
    }

    #[test]
    fn test_vec_frame_source_bounds() {
        let frames = vec![RgbPlanes::uniform(4, 4, [0.0; 3])];
        assert_eq!(FrameSource::len(&frames), 1);
        assert!(matches!(
            frames.frame(3),
            Err(SaliencyError::FrameOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_report_mean() {
        let r = EvaluationReport::from_results(Vec::new(), vec![0, 1]);
        assert_eq!(r.mean_error, None);
    }

    #[test]
    fn test_uniform_frames_fixate_origin() {
        let frames = vec![RgbPlanes::uniform(64, 48, [80.0, 80.0, 80.0]); 2];
        let gaze = [GazePoint::new(32.0, 24.0), GazePoint::missing()];
        let report = Evaluator::new(model(), EvaluationConfig::default())
            .run(&frames, &gaze)
            .unwrap();

        assert_eq!(report.frames.len(), 2);
        for f in &report.frames {
            // Flat map: the first pixel wins the argmax.
            assert_eq!(f.fixation, Fixation { row: 0, col: 0 });
            assert_eq!(f.gaze_normalized, (0.5, 0.5));
            assert!((f.error - 0.5f64.hypot(0.5)).abs() < 1e-12);
        }
        // Missing sample repaired from its neighbour.
        assert_eq!(report.frames[1].gaze, GazePoint::new(32.0, 24.0));
        let mean = report.mean_error.unwrap();
        assert!((mean - 0.5f64.hypot(0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_data_errors_skip_frames() {
        let source = Flaky {
            frames: vec![RgbPlanes::uniform(32, 32, [10.0, 20.0, 30.0]); 3],
            broken: vec![1],
        };
        let gaze = vec![GazePoint::new(0.0, 0.0); 3];
        let report = Evaluator::new(model(), EvaluationConfig::default())
            .run(&source, &gaze)
            .unwrap();
        assert_eq!(report.skipped, vec![1]);
        let indices: Vec<usize> = report.frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_shorter_sequence_and_cap() {
        let frames = vec![RgbPlanes::uniform(32, 32, [10.0; 3]); 5];
        let gaze = vec![GazePoint::new(1.0, 1.0); 3];
        let evaluator = Evaluator::new(model(), EvaluationConfig::default());
        assert_eq!(evaluator.run(&frames, &gaze).unwrap().frames.len(), 3);

        let capped = Evaluator::new(
            model(),
            EvaluationConfig { parallel: false, max_frames: Some(2) },
        );
        assert_eq!(capped.run(&frames, &gaze).unwrap().frames.len(), 2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frames: Vec<RgbPlanes> = (0..4)
            .map(|i| RgbPlanes::uniform(40, 30, [i as f32 * 20.0, 50.0, 90.0]))
            .collect();
        let gaze: Vec<GazePoint> = (0..4).map(|i| GazePoint::new(i as f64 * 10.0, 5.0)).collect();
        let seq = Evaluator::new(model(), EvaluationConfig::default())
            .run(&frames, &gaze)
            .unwrap();
        let par = Evaluator::new(model(), EvaluationConfig { parallel: true, max_frames: None })
            .run(&frames, &gaze)
            .unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_on_frame_sees_every_map() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let frames = vec![RgbPlanes::uniform(32, 32, [10.0; 3]); 3];
        let gaze = vec![GazePoint::new(1.0, 1.0); 3];
        let seen = AtomicUsize::new(0);
        let evaluator = Evaluator::new(model(), EvaluationConfig::default());
        let common = evaluator.model().geometry().common_size();
        evaluator
            .run_with(&frames, &gaze, |_, map| {
                assert_eq!(map.map.dimensions(), common);
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 3);
    }
}
