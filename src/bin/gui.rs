//! Live window for the drowsiness monitor.
//!
//! Run with: cargo run --features gui --bin drowsiness-monitor-gui -- -p model.dat
//!
//! Press `q` to quit.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use drowsiness_monitor::{
    logging, open_webcam, AnnotatedFrame, ImageSequence, Monitor, MonitorConfig, Overlay,
    RustfaceDetector, ShapePredictor, ThreadedPlayer, VideoSource,
};
use eframe::egui;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "drowsiness-monitor-gui")]
#[command(author, version, about = "Eye-closure and yawn alarm with a live view", long_about = None)]
struct Args {
    /// Facial landmark predictor (dlib .dat / .dat.bz2, or a .bin cache)
    #[arg(short = 'p', long)]
    shape_predictor: PathBuf,

    /// Face detector model path
    #[arg(long, default_value = "seeta_fd_frontal_v1.0.bin")]
    face_detector: PathBuf,

    #[arg(short, long, default_value = "")]
    eye_alarm: String,

    #[arg(short, long, default_value = "")]
    mouth_alarm: String,

    #[arg(short, long, default_value_t = 0)]
    webcam: usize,

    /// Replay a directory of still frames instead of the webcam
    #[arg(long)]
    frames: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

type LiveMonitor = Monitor<RustfaceDetector, ShapePredictor, ThreadedPlayer>;

/// Pixel height of OpenCV's Hershey simplex font at scale 1.
const FONT_PIXELS: f32 = 22.0;

fn main() {
    let args = Args::parse();
    logging::init_tracing(if args.verbose { "debug" } else { "info" });

    let failure = Arc::new(Mutex::new(None));
    let result = start(&args).and_then(|(monitor, source)| {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 600.0]),
            ..Default::default()
        };
        let app = MonitorApp::new(monitor, source, Arc::clone(&failure));
        eframe::run_native(
            "drowsiness-monitor",
            options,
            Box::new(move |_cc| Ok(Box::new(app))),
        )
        .map_err(|e| e.to_string().into())
    });

    let failure = failure.lock().ok().and_then(|mut f| f.take());
    if let Some(message) = result.err().map(|e| e.to_string()).or(failure) {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

fn start(args: &Args) -> Result<(LiveMonitor, Box<dyn VideoSource>), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    let sound = |s: &str| (!s.is_empty()).then(|| PathBuf::from(s));

    let detector = RustfaceDetector::load(&args.face_detector, &config.detector)?;
    let predictor = ShapePredictor::load(&args.shape_predictor)?;
    let monitor = Monitor::new(&config, detector, predictor, ThreadedPlayer::new())?
        .with_sounds(sound(&args.eye_alarm), sound(&args.mouth_alarm));

    let source: Box<dyn VideoSource> = match &args.frames {
        Some(dir) => Box::new(ImageSequence::open(dir)?),
        None => open_webcam(args.webcam)?,
    };
    Ok((monitor, source))
}

struct MonitorApp {
    monitor: LiveMonitor,
    source: Box<dyn VideoSource>,
    texture: Option<egui::TextureHandle>,
    last: Option<AnnotatedFrame>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MonitorApp {
    fn new(
        monitor: LiveMonitor,
        source: Box<dyn VideoSource>,
        failure: Arc<Mutex<Option<String>>>,
    ) -> Self {
        Self {
            monitor,
            source,
            texture: None,
            last: None,
            failure,
        }
    }

    /// Pull and analyse the next frame. Returns false once the loop must end.
    fn advance(&mut self, ctx: &egui::Context) -> bool {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(frames = self.monitor.frames_processed(), "video source exhausted");
                return false;
            }
            Err(e) => return self.fail(e.to_string()),
        };
        let annotated = match self.monitor.step(&frame) {
            Ok(annotated) => annotated,
            Err(e) => return self.fail(e.to_string()),
        };

        let size = [annotated.image.width() as usize, annotated.image.height() as usize];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, annotated.image.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::default()),
            None => {
                self.texture = Some(ctx.load_texture("frame", image, egui::TextureOptions::default()))
            }
        }
        self.last = Some(annotated);
        true
    }

    fn fail(&mut self, message: String) -> bool {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message);
        }
        false
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Q)) || !self.advance(ctx) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let (Some(texture), Some(last)) = (&self.texture, &self.last) else {
                return;
            };

            let available = ui.available_size();
            let texture_size = texture.size_vec2();
            let scale = (available.x / texture_size.x).min(available.y / texture_size.y);
            let response = ui.image((texture.id(), texture_size * scale));

            // Text overlays are painted over the frame at their pixel positions
            let painter = ui.painter_at(response.rect);
            for overlay in &last.report.overlays {
                if let Overlay::Text {
                    text,
                    origin,
                    scale: text_scale,
                    color,
                } = overlay
                {
                    painter.text(
                        response.rect.min + egui::vec2(origin.x, origin.y) * scale,
                        egui::Align2::LEFT_BOTTOM,
                        text,
                        egui::FontId::proportional(FONT_PIXELS * text_scale * scale),
                        egui::Color32::from_rgb(color.r, color.g, color.b),
                    );
                }
            }
        });

        ctx.request_repaint();
    }
}
