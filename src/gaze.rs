// gaze.rs — Ground-truth gaze samples and gap repair.
//
// Eye trackers drop samples (blinks, tracking loss); those arrive as NaN.
// Before comparing against fixations each missing sample is filled from the
// nearest valid samples around it:
//
//   no valid sample on either side  → (0, 0)
//   valid sample on one side only   → copy it
//   valid samples on both sides     → per-coordinate average of the two
//
//   [NaN, (2,2), NaN, NaN, (8,8), NaN]
//     → [(2,2), (2,2), (5,5), (5,5), (8,8), (8,8)]

use serde::{Deserialize, Serialize};

/// One gaze sample in frame pixel coordinates (x = column, y = row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
}

impl GazePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        GazePoint { x, y }
    }

    /// A missing sample.
    pub const fn missing() -> Self {
        GazePoint { x: f64::NAN, y: f64::NAN }
    }

    /// True if either coordinate is NaN.
    pub fn is_missing(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    /// `(x / width, y / height)`.
    pub fn normalized(&self, width: usize, height: usize) -> (f64, f64) {
        (self.x / width.max(1) as f64, self.y / height.max(1) as f64)
    }
}

/// Fill every missing sample from its nearest valid neighbours.
///
/// Returns a new vector of the same length; `points` is left untouched.
pub fn repair_gaze(points: &[GazePoint]) -> Vec<GazePoint> {
    let n = points.len();

    // Nearest valid index at or before / at or after each position.
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut last = None;
    for (i, p) in points.iter().enumerate() {
        if !p.is_missing() {
            last = Some(i);
        }
        prev[i] = last;
    }
    let mut next: Vec<Option<usize>> = vec![None; n];
    let mut last = None;
    for (i, p) in points.iter().enumerate().rev() {
        if !p.is_missing() {
            last = Some(i);
        }
        next[i] = last;
    }

    points
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            if !p.is_missing() {
                return p;
            }
            match (prev[i], next[i]) {
                (None, None) => GazePoint::new(0.0, 0.0),
                (Some(a), None) => points[a],
                (None, Some(b)) => points[b],
                (Some(a), Some(b)) => GazePoint::new(
                    (points[a].x + points[b].x) / 2.0,
                    (points[a].y + points[b].y) / 2.0,
                ),
            }
        })
        .collect()
}

/// Number of missing samples.
pub fn count_missing(points: &[GazePoint]) -> usize {
    points.iter().filter(|p| p.is_missing()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_reference_sequence() {
        let nan = GazePoint::missing();
        let input = [nan, GazePoint::new(2.0, 2.0), nan, nan, GazePoint::new(8.0, 8.0), nan];
        let out = repair_gaze(&input);
        let expected = [(2.0, 2.0), (2.0, 2.0), (5.0, 5.0), (5.0, 5.0), (8.0, 8.0), (8.0, 8.0)];
        assert_eq!(out.len(), expected.len());
        for (p, (x, y)) in out.iter().zip(expected) {
            assert_eq!((p.x, p.y), (x, y));
        }
        // Input untouched.
        assert!(input[0].is_missing());
    }

    #[test]
    fn test_each_coordinate_averaged_separately() {
        let input = [GazePoint::new(0.0, 100.0), GazePoint::missing(), GazePoint::new(10.0, 300.0)];
        let out = repair_gaze(&input);
        assert_eq!(out[1], GazePoint::new(5.0, 200.0));
    }

    #[test]
    fn test_all_missing_becomes_origin() {
        let out = repair_gaze(&[GazePoint::missing(); 3]);
        assert!(out.iter().all(|p| *p == GazePoint::new(0.0, 0.0)));
    }

    #[test]
    fn test_half_missing_counts_as_missing() {
        let input = [GazePoint::new(1.0, 1.0), GazePoint::new(f64::NAN, 7.0)];
        assert_eq!(count_missing(&input), 1);
        assert_eq!(repair_gaze(&input)[1], GazePoint::new(1.0, 1.0));
    }

    #[test]
    fn test_empty_and_valid_sequences() {
        assert!(repair_gaze(&[]).is_empty());
        let valid = [GazePoint::new(1.0, 2.0), GazePoint::new(3.0, 4.0)];
        assert_eq!(repair_gaze(&valid), valid.to_vec());
    }
}
