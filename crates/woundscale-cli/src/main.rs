use argh::FromArgs;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use woundscale::{
    calib::{manual_calibration, CalibrationDetector},
    image::RasterImage,
    measure::{healing_progress, wound_analytics, AreaObservation, SegmentationResult},
    pipeline::{
        AssessmentPipeline, AssessmentRequest, CalibrationPreview, InMemoryStore,
        ManualReference, PipelineConfig, PipelineError,
    },
    quality::QualityAssessor,
};

mod io;

#[derive(FromArgs)]
/// Measure wounds on photographs with a scale marker in view
struct Args {
    /// pipeline configuration as JSON, defaults are used for missing fields
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Calibrate(CalibrateArgs),
    Quality(QualityArgs),
    Measure(MeasureArgs),
    Healing(HealingArgs),
    Preview(PreviewArgs),
}

#[derive(FromArgs)]
/// Detect the scale marker of a photograph
#[argh(subcommand, name = "calibrate")]
struct CalibrateArgs {
    /// the photograph
    #[argh(positional)]
    image: PathBuf,

    /// manual reference as x1,y1,x2,y2,cm instead of marker detection
    #[argh(option, from_str_fn(io::parse_reference))]
    reference: Option<ManualReference>,
}

#[derive(FromArgs)]
/// Check whether a photograph is good enough to measure
#[argh(subcommand, name = "quality")]
struct QualityArgs {
    /// the photograph
    #[argh(positional)]
    image: PathBuf,
}

#[derive(FromArgs)]
/// Measure a wound from a photograph and its segmentation mask
#[argh(subcommand, name = "measure")]
struct MeasureArgs {
    /// the photograph
    #[argh(positional)]
    image: PathBuf,

    /// the segmentation mask, white being wound
    #[argh(positional)]
    mask: PathBuf,

    /// identifier of the wound
    #[argh(option, default = "String::from(\"wound\")")]
    wound_id: String,

    /// capture time as YYYY-MM-DD or RFC 3339, defaults to now
    #[argh(option, from_str_fn(io::parse_time))]
    captured_at: Option<DateTime<Utc>>,

    /// manual reference as x1,y1,x2,y2,cm instead of marker detection
    #[argh(option, from_str_fn(io::parse_reference))]
    reference: Option<ManualReference>,

    /// manually measured depth in centimeters
    #[argh(option)]
    depth: Option<f64>,

    /// confidence of the segmentation model
    #[argh(option, default = "1.0")]
    confidence: f64,

    /// measure even if the quality checks fail
    #[argh(switch)]
    override_quality: bool,
}

#[derive(FromArgs)]
/// Healing progress from a JSON list of dated area measurements
#[argh(subcommand, name = "healing")]
struct HealingArgs {
    /// JSON file with entries {"captured_at": ..., "area_cm2": ...}
    #[argh(positional)]
    observations: PathBuf,

    /// onset of the wound as YYYY-MM-DD or RFC 3339
    #[argh(option, from_str_fn(io::parse_time))]
    onset: DateTime<Utc>,

    /// reference time for the days since onset, defaults to now
    #[argh(option, from_str_fn(io::parse_time))]
    now: Option<DateTime<Utc>>,
}

#[derive(FromArgs)]
/// Live calibration feedback, cycling over a sequence of frames
#[argh(subcommand, name = "preview")]
struct PreviewArgs {
    /// the frames, read in order and repeated
    #[argh(positional)]
    frames: Vec<PathBuf>,

    /// the duration in seconds to run the preview
    #[argh(option, short = 'd')]
    duration: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    match args.command {
        Command::Calibrate(cmd) => calibrate(cmd, config),
        Command::Quality(cmd) => quality(cmd, config),
        Command::Measure(cmd) => measure(cmd, config),
        Command::Healing(cmd) => healing(cmd),
        Command::Preview(cmd) => preview(cmd, config),
    }
}

fn calibrate(cmd: CalibrateArgs, config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let calibration = match cmd.reference {
        Some(r) => manual_calibration(r.from, r.to, r.distance_cm)?,
        None => {
            let image = io::read_raster(&cmd.image)?;
            CalibrationDetector::new(config.detector).detect(&image)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&calibration)?);
    Ok(())
}

fn quality(cmd: QualityArgs, config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let image = io::read_raster(&cmd.image)?;
    let calibration = CalibrationDetector::new(config.detector).detect(&image)?;

    let assessor = QualityAssessor::new(config.quality);
    let report = assessor.assess(&image, &calibration)?;

    let output = serde_json::json!({
        "report": report,
        "recommendations": assessor.recommendations(&report),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn measure(cmd: MeasureArgs, config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let image = io::read_raster(&cmd.image)?;
    let segmentation = io::read_mask(
        &cmd.mask,
        cmd.confidence,
        config.measurement.foreground_threshold,
    )?;
    log::debug!(
        "mask {}: {} wound pixels",
        cmd.mask.display(),
        segmentation.foreground_pixels(config.measurement.foreground_threshold)
    );

    // the mask is computed offline, the segmenter hands it back for the frame
    let segmenter = move |_: &RasterImage| -> Result<SegmentationResult, PipelineError> {
        Ok(segmentation.clone())
    };
    let pipeline = AssessmentPipeline::new(config, segmenter, InMemoryStore::new());

    let mut request =
        AssessmentRequest::new(cmd.wound_id, cmd.captured_at.unwrap_or_else(Utc::now), image);
    if let Some(reference) = cmd.reference {
        request = request.with_manual_reference(reference);
    }
    if let Some(depth) = cmd.depth {
        request = request.with_depth(depth);
    }
    if cmd.override_quality {
        request = request.with_quality_override();
    }

    match pipeline.assess(&request) {
        Ok(assessment) => {
            println!("{}", serde_json::to_string_pretty(&assessment)?);
            Ok(())
        }
        Err(PipelineError::QualityRejected(report)) => {
            let output = serde_json::json!({
                "report": &report,
                "recommendations": pipeline.assessor().recommendations(&report),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Err(PipelineError::QualityRejected(report).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn healing(cmd: HealingArgs) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(&cmd.observations)?;
    let mut observations: Vec<AreaObservation> = serde_json::from_str(&json)?;
    observations.sort_by_key(|o| o.captured_at);

    let progress = healing_progress(&observations);
    let analytics = wound_analytics(&progress, cmd.onset, cmd.now.unwrap_or_else(Utc::now));

    let output = serde_json::json!({
        "progress": progress,
        "analytics": analytics,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn preview(cmd: PreviewArgs, config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    if cmd.frames.is_empty() {
        return Err("preview needs at least one frame".into());
    }

    let mut frames = cmd.frames.into_iter().cycle();
    let source = move || -> Option<RasterImage> {
        let path = frames.next()?;
        match io::read_raster(&path) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                None
            }
        }
    };

    let mut preview = CalibrationPreview::start(
        source,
        CalibrationDetector::new(config.detector),
        config.preview,
        |result| match serde_json::to_string(&result) {
            Ok(line) => println!("{line}"),
            Err(e) => log::warn!("could not serialize calibration: {e}"),
        },
    )?;

    // create a cancel token to stop the preview
    let cancel_token = preview.cancel_token();

    ctrlc::set_handler({
        let cancel_token = cancel_token.clone();
        move || {
            println!("Received Ctrl-C signal. Sending cancel signal !!");
            cancel_token.store(true, Ordering::SeqCst);
        }
    })?;

    let started = Instant::now();
    while preview.is_running() {
        if let Some(duration) = cmd.duration {
            if started.elapsed() >= Duration::from_secs(duration) {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    preview.stop();
    log::info!("preview stopped after {:?}", started.elapsed());

    Ok(())
}
