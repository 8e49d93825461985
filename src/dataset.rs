// dataset.rs — On-disk frame sequences and gaze recordings.
//
// Frames: a directory of still images (png / jpg / jpeg / bmp), ordered by
// file name, decoded lazily one at a time with the `image` crate.
//
// Gaze: plain text, one `x,y` sample per frame:
//
//   x,y                 ← optional header
//   # comment           ← skipped
//   312.5,201.0
//   nan,nan             ← missing sample (an empty field counts too)
//
// A gaze *directory* holds one file per (video, viewer) pair at
// `video_{video}/viewer_{viewer}.csv`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::convert::RgbPlanes;
use crate::error::SaliencyError;
use crate::evaluation::{FrameSource, GazeSource};
use crate::gaze::GazePoint;

/// File extensions recognized as frames (compared case-insensitively).
pub const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

// ============================================================
// Frames
// ============================================================

/// A directory of image files, one per frame.
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl FrameDirectory {
    /// List the frames in `dir`. Fails if the directory has no image files.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SaliencyError> {
        let dir = dir.as_ref().to_path_buf();
        let files = list_frame_files(&dir)?;
        if files.is_empty() {
            return Err(SaliencyError::NoFrames(dir));
        }
        info!(dir = %dir.display(), frames = files.len(), "opened frame directory");
        Ok(FrameDirectory { dir, files })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frame files in playback order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for FrameDirectory {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn frame(&self, index: usize) -> Result<RgbPlanes, SaliencyError> {
        let path = self.files.get(index).ok_or(SaliencyError::FrameOutOfRange {
            index,
            len: self.files.len(),
        })?;
        debug!(frame = index, path = %path.display(), "loading frame");
        let decoded = ::image::open(path)?.to_rgb8();
        Ok(RgbPlanes::from_rgb8(&decoded))
    }
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_frame_files(dir: &Path) -> Result<Vec<PathBuf>, SaliencyError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_frame_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

// ============================================================
// Gaze
// ============================================================

/// Gaze recordings: either one file or a directory of per-viewer files.
#[derive(Debug, Clone)]
pub struct GazeCsv {
    path: PathBuf,
}

impl GazeCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        GazeCsv { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File holding the gaze of `(video, viewer)`.
    ///
    /// A file path is used as is; a directory resolves to
    /// `video_{video}/viewer_{viewer}.csv` below it.
    pub fn resolve(&self, video: usize, viewer: usize) -> PathBuf {
        if self.path.is_dir() {
            self.path
                .join(format!("video_{video}"))
                .join(format!("viewer_{viewer}.csv"))
        } else {
            self.path.clone()
        }
    }
}

impl GazeSource for GazeCsv {
    fn gaze(&self, video: usize, viewer: usize) -> Result<Vec<GazePoint>, SaliencyError> {
        let path = self.resolve(video, viewer);
        debug!(path = %path.display(), "reading gaze");
        read_gaze_file(&path)
    }
}

/// Read and parse one gaze file.
pub fn read_gaze_file(path: &Path) -> Result<Vec<GazePoint>, SaliencyError> {
    let content = fs::read_to_string(path)?;
    parse_gaze(&content)
}

/// Parse gaze text. Line numbers in errors are 1-based.
pub fn parse_gaze(content: &str) -> Result<Vec<GazePoint>, SaliencyError> {
    let mut points = Vec::new();
    let mut seen_data = false;

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split(',').map(str::trim);
        let (Some(xs), Some(ys)) = (fields.next(), fields.next()) else {
            return Err(SaliencyError::GazeParse {
                line: i + 1,
                message: format!("expected `x,y`, got {line:?}"),
            });
        };
        match (parse_coord(xs), parse_coord(ys)) {
            (Some(x), Some(y)) => {
                points.push(GazePoint::new(x, y));
                seen_data = true;
            }
            // A non-numeric first record is the header.
            _ if !seen_data && points.is_empty() && is_header(xs, ys) => {
                seen_data = true;
            }
            _ => {
                return Err(SaliencyError::GazeParse {
                    line: i + 1,
                    message: format!("invalid coordinates {xs:?}, {ys:?}"),
                });
            }
        }
    }
    Ok(points)
}

/// `nan` (any case) and empty fields are missing samples.
fn parse_coord(field: &str) -> Option<f64> {
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    field.parse().ok()
}

fn is_header(x: &str, y: &str) -> bool {
    let word = |s: &str| s.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    word(x) && word(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgb, RgbImage};

    #[test]
    fn test_parse_gaze_with_header_and_missing() {
        let text = "x,y\n# recorded at 30 Hz\n10.5,20\nnan,nan\n,\n  3 , 4 \n";
        let pts = parse_gaze(text).unwrap();
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[0], GazePoint::new(10.5, 20.0));
        assert!(pts[1].is_missing());
        assert!(pts[2].is_missing());
        assert_eq!(pts[3], GazePoint::new(3.0, 4.0));
    }

    #[test]
    fn test_parse_gaze_extra_columns_ignored() {
        let pts = parse_gaze("1,2,0.93\n3,4,0.88\n").unwrap();
        assert_eq!(pts, vec![GazePoint::new(1.0, 2.0), GazePoint::new(3.0, 4.0)]);
    }

    #[test]
    fn test_parse_gaze_reports_line() {
        let err = parse_gaze("1,2\n3,4\nfoo,bar\n").unwrap_err();
        assert!(matches!(err, SaliencyError::GazeParse { line: 3, .. }), "{err}");
        let err = parse_gaze("1,2\n42\n").unwrap_err();
        assert!(matches!(err, SaliencyError::GazeParse { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_gaze_directory_layout() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video_2");
        fs::create_dir_all(&video).unwrap();
        fs::write(video.join("viewer_5.csv"), "x,y\n1,1\nnan,nan\n3,3\n").unwrap();

        let source = GazeCsv::new(dir.path());
        let pts = source.gaze(2, 5).unwrap();
        assert_eq!(pts.len(), 3);
        assert!(pts[1].is_missing());
        assert!(matches!(source.gaze(2, 6), Err(SaliencyError::Io(_))));
    }

    #[test]
    fn test_gaze_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaze.csv");
        fs::write(&path, "7,8\n").unwrap();
        // Video/viewer are ignored for a plain file.
        assert_eq!(GazeCsv::new(&path).gaze(0, 9).unwrap(), vec![GazePoint::new(7.0, 8.0)]);
    }

    #[test]
    fn test_frame_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("frame_002.png", 200u8), ("frame_000.png", 0), ("frame_001.png", 100)] {
            RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
                .save(dir.path().join(name))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let frames = FrameDirectory::open(dir.path()).unwrap();
        assert_eq!(FrameSource::len(&frames), 3);
        let names: Vec<_> = frames
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["frame_000.png", "frame_001.png", "frame_002.png"]);

        let f1 = frames.frame(1).unwrap();
        assert_eq!(f1.dimensions(), (8, 6));
        assert_eq!(f1.g.get(3, 3), 100.0);
        assert!(matches!(frames.frame(3), Err(SaliencyError::FrameOutOfRange { .. })));
    }

    #[test]
    fn test_empty_frame_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(FrameDirectory::open(dir.path()), Err(SaliencyError::NoFrames(_))));
    }

    #[test]
    fn test_corrupt_frame_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
        let frames = FrameDirectory::open(dir.path()).unwrap();
        let err = frames.frame(0).unwrap_err();
        assert!(!err.is_config());
    }
}
