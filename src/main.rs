// main.rs — Evaluate saliency fixations of a frame directory against gaze.
//
// Usage:
//   conspicuity --frames /data/videos/video_3 --gaze /data/gaze --video 3 --viewer 1
//
// Options override the JSON configuration (`--config`), which overrides the
// built-in defaults. Logging follows RUST_LOG (default `info`).
//
// Output:
//   stdout / log          — per-frame error and the final mean
//   --report <file>       — full EvaluationReport as JSON
//   --dump-dir <dir>      — saliency_NNNNN.png per frame, local maxima in green

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use conspicuity::convert::f32_stretch_to_u8;
use conspicuity::dataset::{FrameDirectory, GazeCsv};
use conspicuity::evaluation::GazeSource;
use conspicuity::image::Image;
use conspicuity::saliency::mark_maxima;
use conspicuity::{EvaluationConfig, Evaluator, SaliencyConfig, SaliencyMap, SaliencyModel};

#[derive(Parser, Debug)]
#[command(name = "conspicuity", about = "Itti-Koch saliency fixation error against recorded gaze")]
struct Args {
    /// Directory of frame images (png/jpg/bmp), played in file-name order.
    #[arg(long)]
    frames: PathBuf,
    /// Gaze file, or a directory laid out as video_<N>/viewer_<M>.csv.
    #[arg(long)]
    gaze: PathBuf,
    /// Video number used to locate the gaze file.
    #[arg(long, default_value_t = 0)]
    video: usize,
    /// Viewer number used to locate the gaze file.
    #[arg(long, default_value_t = 0)]
    viewer: usize,
    /// JSON model configuration; missing keys take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of Gabor orientations.
    #[arg(long)]
    orientations: Option<usize>,
    /// Number of pyramid levels (>= 7).
    #[arg(long)]
    levels: Option<usize>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,
    /// Process frames on all cores.
    #[arg(long)]
    parallel: bool,
    /// Write the evaluation report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write a local-maxima overlay of every saliency map here.
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(args: &Args) -> Result<SaliencyConfig> {
    let mut config = match &args.config {
        Some(path) => SaliencyConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => SaliencyConfig::default(),
    };
    if let Some(n) = args.orientations {
        config.orientations = n;
    }
    if let Some(n) = args.levels {
        config.levels = n;
    }
    Ok(config)
}

fn dump_saliency(dir: &Path, index: usize, saliency: &SaliencyMap) -> Result<()> {
    let stretched: Image<f32> = f32_stretch_to_u8(&saliency.map).map(|v| v as f32);
    let path = dir.join(format!("saliency_{index:05}.png"));
    mark_maxima(&stretched)
        .to_rgb8()
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = load_config(&args)?;
    let model = SaliencyModel::new(config).context("invalid saliency configuration")?;
    let evaluation = EvaluationConfig {
        parallel: args.parallel,
        max_frames: args.max_frames,
    };

    let frames = FrameDirectory::open(&args.frames)
        .with_context(|| format!("opening frames {}", args.frames.display()))?;
    let gaze_source = GazeCsv::new(&args.gaze);
    let gaze_path = gaze_source.resolve(args.video, args.viewer);
    let gaze = gaze_source
        .gaze(args.video, args.viewer)
        .with_context(|| format!("reading gaze {}", gaze_path.display()))?;

    if let Some(dir) = &args.dump_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let evaluator = Evaluator::new(model, evaluation);
    let report = evaluator.run_with(&frames, &gaze, |index, saliency| {
        if let Some(dir) = &args.dump_dir {
            if let Err(e) = dump_saliency(dir, index, saliency) {
                warn!(frame = index, error = %e, "saliency dump failed");
            }
        }
    })?;

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        info!(path = %path.display(), "wrote evaluation report");
    }

    match report.mean_error {
        Some(mean) => println!(
            "video {} viewer {}: mean fixation error {:.4} over {} frames ({} skipped)",
            args.video,
            args.viewer,
            mean,
            report.frames.len(),
            report.skipped.len()
        ),
        None => anyhow::bail!("no frames could be evaluated"),
    }
    Ok(())
}
