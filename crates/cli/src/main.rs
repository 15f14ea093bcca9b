use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use photoframe_core::capture::domain::camera_source::CameraSource;
use photoframe_core::capture::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use photoframe_core::capture::infrastructure::still_image_source::StillImageSource;
use photoframe_core::compositing::domain::cutout::Cutout;
use photoframe_core::compositing::infrastructure::circular_compositor::CircularCompositor;
use photoframe_core::compositing::infrastructure::frame_asset_loader::load_frame_asset;
use photoframe_core::config::frame_settings::FrameSettings;
use photoframe_core::detection::domain::face_detector::FaceDetector;
use photoframe_core::detection::infrastructure::detection_worker::DetectionWorker;
use photoframe_core::detection::infrastructure::model_resolver::{self, ProgressFn};
use photoframe_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use photoframe_core::export::infrastructure::png_file_exporter::PngFileExporter;
use photoframe_core::pipeline::capture_pipeline::CapturePipeline;
use photoframe_core::pipeline::photo_session::PhotoSession;
use photoframe_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use photoframe_core::shared::constants::{BLAZEFACE_MODEL_NAME, IMAGE_EXTENSIONS};

/// Capture a face-centred photo and place it in a decorative frame.
#[derive(Parser)]
#[command(name = "photoframe")]
struct Cli {
    /// Camera: a still image, a video file or a capture device/stream URL.
    input: PathBuf,

    /// Decorative frame PNG with the circular cutout.
    #[arg(long)]
    frame: PathBuf,

    /// Directory the framed photo is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// File name of the framed photo (overrides the settings file).
    #[arg(long)]
    output_name: Option<String>,

    /// BlazeFace ONNX model to use instead of resolving one.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Settings JSON to use instead of the user settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum face detection confidence, in (0, 1].
    #[arg(long)]
    confidence: Option<f64>,

    /// Skip face detection and always use the centre crop.
    #[arg(long)]
    no_detect: bool,

    /// Read capture/retake/download/status/quit commands from stdin.
    #[arg(long)]
    interactive: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = load_settings(&cli)?;

    let asset = load_frame_asset(&cli.frame, settings.canvas_size)?;
    let compositor = CircularCompositor::new(Cutout::from_settings(&settings));
    let pipeline = CapturePipeline::new(asset, Box::new(compositor), &settings);

    let mut session = PhotoSession::new(
        open_camera(&cli.input),
        build_detector(&cli, &settings),
        pipeline,
        Box::new(StdoutPipelineLogger::new()),
    )
    .with_output_filename(settings.output_filename.clone());

    let result = if cli.interactive {
        run_interactive(&mut session, &cli.output_dir)
    } else {
        run_once(&mut session, &cli.output_dir)
    };
    session.finish();
    result
}

fn run_once(session: &mut PhotoSession, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let token = session.capture()?;
    log::info!("Captured {token}, waiting for face detection");
    session.wait()?;

    if let Some(ready) = session.ready_capture() {
        match &ready.detection {
            Some(face) => log::info!(
                "Face at ({:.2}, {:.2}), crop size {:.0}",
                face.x_center,
                face.y_center,
                ready.crop.size
            ),
            None => log::info!("No face found, centre crop size {:.0}", ready.crop.size),
        }
    }

    let path = session.download(&PngFileExporter::new(), output_dir)?;
    log::info!("Output written to {}", path.display());
    Ok(())
}

fn run_interactive(
    session: &mut PhotoSession,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let exporter = PngFileExporter::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    eprintln!("Commands: capture, wait, retake, download, status, quit");
    loop {
        print!("{}> ", session.phase());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        // late detection results are picked up between commands
        if let Err(e) = session.poll() {
            eprintln!("{e}");
        }

        let outcome = match line.trim() {
            "" => continue,
            "capture" | "c" => session
                .capture()
                .map(|token| format!("Processing {token}")),
            "wait" | "w" => session.wait().map(|phase| format!("Now {phase}")),
            "retake" | "r" => session.retake().map(|_| "Back to live view".to_string()),
            "download" | "d" => session
                .download(&exporter, output_dir)
                .map(|path| format!("Saved {}", path.display())),
            "status" | "s" => Ok(describe_status(session)),
            "quit" | "q" => break,
            other => Ok(format!(
                "Unknown command '{other}' (capture, wait, retake, download, status, quit)"
            )),
        };

        match outcome {
            Ok(message) => println!("{message}"),
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn describe_status(session: &PhotoSession) -> String {
    let mut status = format!("Phase: {}", session.phase());
    if !session.has_camera() {
        status.push_str(" (no camera)");
    }
    if let Some(token) = session.pending_token() {
        status.push_str(&format!(", waiting on {token}"));
    }
    if let Some(ready) = session.ready_capture() {
        let (x, y, size) = ready.crop.to_pixels();
        status.push_str(&format!(
            ", {} cropped at ({x}, {y}) size {size}, {}",
            ready.token,
            if ready.detection.is_some() {
                "face found"
            } else {
                "no face"
            }
        ));
    }
    status
}

fn load_settings(cli: &Cli) -> Result<FrameSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => FrameSettings::load_from(path)?,
        None => FrameSettings::load(),
    };
    if let Some(confidence) = cli.confidence {
        settings.min_confidence = confidence;
    }
    if let Some(name) = &cli.output_name {
        settings.output_filename = name.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn open_camera(input: &Path) -> Result<Box<dyn CameraSource>, Box<dyn std::error::Error>> {
    if is_image(input) {
        Ok(Box::new(StillImageSource::open(input)?))
    } else {
        Ok(Box::new(FfmpegCameraSource::open(input)?))
    }
}

fn build_detector(cli: &Cli, settings: &FrameSettings) -> DetectionWorker {
    if cli.no_detect {
        return DetectionWorker::disabled("face detection turned off with --no-detect");
    }
    match load_detector(cli, settings) {
        Ok(detector) => DetectionWorker::spawn(detector),
        Err(e) => {
            log::warn!("Face detection unavailable: {e}");
            DetectionWorker::disabled(e.to_string())
        }
    }
}

fn load_detector(
    cli: &Cli,
    settings: &FrameSettings,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
            let downloading = Arc::new(AtomicBool::new(false));
            let path = model_resolver::resolve(
                BLAZEFACE_MODEL_NAME,
                settings.model_url.as_deref(),
                None,
                Some(download_progress(Arc::clone(&downloading))),
            )?;
            // finish the progress line, if a download printed one
            if downloading.load(Ordering::Relaxed) {
                eprintln!();
            }
            path
        }
    };
    Ok(Box::new(OnnxBlazefaceDetector::new(
        &model_path,
        settings.min_confidence,
    )?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.frame.exists() {
        return Err(format!("Frame asset not found: {}", cli.frame.display()).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(confidence) = cli.confidence {
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(format!(
                "Confidence must be in (0, 1], got {confidence}"
            )
            .into());
        }
    }
    if cli.output_dir.is_file() {
        return Err(format!(
            "Output directory is a file: {}",
            cli.output_dir.display()
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(printed: Arc<AtomicBool>) -> ProgressFn {
    Box::new(move |downloaded, total| {
        printed.store(true, Ordering::Relaxed);
        if total > 0 {
            let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
            eprint!("\rDownloading face detection model... {pct}%");
        } else {
            eprint!("\rDownloading face detection model... {downloaded} bytes");
        }
    })
}
