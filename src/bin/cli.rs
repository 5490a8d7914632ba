//! Headless drowsiness monitor.
//!
//! Usage:
//!   drowsiness-monitor -p shape_predictor_68_face_landmarks.dat -e alarm.wav
//!   drowsiness-monitor -p model.dat --frames recording/ --json
//!
//! Type `q` and Enter to quit.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::{Parser, ValueEnum};
use drowsiness_monitor::{
    logging, open_webcam, AnnotatedFrame, ImageSequence, Monitor, MonitorConfig, Overlay,
    Polarity, RustfaceDetector, ShapePredictor, ThreadedPlayer, VideoSource,
};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "drowsiness-monitor")]
#[command(author, version, about = "Eye-closure and yawn alarm for a webcam feed", long_about = None)]
struct Args {
    /// Facial landmark predictor (dlib .dat / .dat.bz2, or a .bin cache)
    #[arg(short = 'p', long)]
    shape_predictor: PathBuf,

    /// Face detector model path
    #[arg(long, default_value = "seeta_fd_frontal_v1.0.bin")]
    face_detector: PathBuf,

    /// Sound played when the eyes stay closed (empty disables it)
    #[arg(short, long, default_value = "")]
    eye_alarm: String,

    /// Sound played on a sustained yawn (empty disables it)
    #[arg(short, long, default_value = "")]
    mouth_alarm: String,

    /// Webcam device index
    #[arg(short, long, default_value_t = 0)]
    webcam: usize,

    /// Replay a directory of still frames instead of the webcam
    #[arg(long)]
    frames: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    eye_threshold: Option<f32>,

    #[arg(long)]
    eye_frames: Option<u32>,

    #[arg(long)]
    mouth_threshold: Option<f32>,

    #[arg(long)]
    mouth_frames: Option<u32>,

    /// Which side of the mouth threshold counts as a yawn
    #[arg(long, value_enum)]
    mouth_polarity: Option<PolarityArg>,

    /// Width frames are resized to before analysis
    #[arg(long)]
    frame_width: Option<u32>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Write every annotated frame as PNG into this directory
    #[arg(long)]
    save_frames: Option<PathBuf>,

    /// Print one JSON frame report per line on stdout
    #[arg(long)]
    json: bool,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolarityArg {
    Below,
    Above,
}

impl From<PolarityArg> for Polarity {
    fn from(p: PolarityArg) -> Self {
        match p {
            PolarityArg::Below => Polarity::Below,
            PolarityArg::Above => Polarity::Above,
        }
    }
}

fn main() {
    let args = Args::parse();
    logging::init_tracing(if args.verbose { "debug" } else { "info" });

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    debug!(?config, "effective configuration");

    let detector = RustfaceDetector::load(&args.face_detector, &config.detector)?;
    let predictor = ShapePredictor::load(&args.shape_predictor)?;
    let mut monitor = Monitor::new(&config, detector, predictor, ThreadedPlayer::new())?
        .with_sounds(sound(&args.eye_alarm), sound(&args.mouth_alarm));

    let mut source = open_source(args)?;

    if let Some(dir) = &args.save_frames {
        fs::create_dir_all(dir)?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    watch_for_quit(Arc::clone(&stop));

    info!("monitoring, type q + Enter to quit");
    let mut stdout = io::stdout().lock();
    let processed = monitor.run(source.as_mut(), &stop, args.max_frames, |index, frame| {
        log_text(frame);
        if args.json {
            serde_json::to_writer(&mut stdout, &frame.report).map_err(io::Error::from)?;
            writeln!(stdout)?;
        }
        if let Some(dir) = &args.save_frames {
            frame.image.save(dir.join(format!("frame_{index:06}.png")))?;
        }
        Ok(())
    })?;

    info!(frames = processed, "monitor stopped");
    Ok(())
}

fn load_config(args: &Args) -> drowsiness_monitor::Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };

    if let Some(t) = args.eye_threshold {
        config.eye.threshold = t;
    }
    if let Some(n) = args.eye_frames {
        config.eye.consecutive_frames = n;
    }
    if let Some(t) = args.mouth_threshold {
        config.mouth.threshold = t;
    }
    if let Some(n) = args.mouth_frames {
        config.mouth.consecutive_frames = n;
    }
    if let Some(p) = args.mouth_polarity {
        config.mouth.polarity = p.into();
    }
    if let Some(w) = args.frame_width {
        config.frame_width = Some(w);
    }

    config.validate()?;
    Ok(config)
}

fn sound(path: &str) -> Option<PathBuf> {
    if path.is_empty() {
        return None;
    }
    let path = PathBuf::from(path);
    if !path.is_file() {
        warn!(sound = %path.display(), "alarm sound not found, playback will fail");
    }
    Some(path)
}

fn open_source(args: &Args) -> drowsiness_monitor::Result<Box<dyn VideoSource>> {
    match &args.frames {
        Some(dir) => Ok(Box::new(ImageSequence::open(dir)?)),
        None => open_webcam(args.webcam),
    }
}

/// Raise `stop` when a line reading `q` arrives on stdin.
fn watch_for_quit(stop: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("quit-watcher".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                        stop.store(true, Ordering::Relaxed);
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "quit watcher unavailable");
    }
}

/// Text overlays cannot be drawn without a font; report them instead.
fn log_text(frame: &AnnotatedFrame) {
    for overlay in &frame.report.overlays {
        if let Overlay::Text { text, origin, .. } = overlay {
            debug!(x = origin.x, y = origin.y, "{text}");
        }
    }
}
