//! One full monitoring step per frame, and the frame loop around it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{imageops, DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, info};

use crate::alarm::AlarmPlayer;
use crate::config::MonitorConfig;
use crate::debounce::SignalState;
use crate::detect::{FaceDetector, LandmarkProvider};
use crate::error::{Error, Result};
use crate::features::GrayImage;
use crate::metrics::REQUIRED_LANDMARKS;
use crate::processor::{Face, FrameProcessor, FrameReport, SignalKind};
use crate::render::paint_contours;
use crate::video::{resize_to_width, VideoSource};

/// The analysed frame with contours painted in, plus what was decided.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub image: RgbaImage,
    pub report: FrameReport,
}

pub struct Monitor<D, L, P> {
    detector: D,
    landmarks: L,
    processor: FrameProcessor<P>,
    frame_width: Option<u32>,
    frames: u64,
}

impl<D, L, P> Monitor<D, L, P>
where
    D: FaceDetector,
    L: LandmarkProvider,
    P: AlarmPlayer,
{
    /// Fails unless `landmarks` yields the full 68-point layout.
    pub fn new(config: &MonitorConfig, detector: D, landmarks: L, player: P) -> Result<Self> {
        config.validate()?;
        let found = landmarks.num_landmarks();
        if found < REQUIRED_LANDMARKS {
            return Err(Error::TooFewLandmarks {
                expected: REQUIRED_LANDMARKS,
                found,
            });
        }

        Ok(Self {
            detector,
            landmarks,
            processor: FrameProcessor::new(config.eye, config.mouth, player),
            frame_width: config.frame_width,
            frames: 0,
        })
    }

    pub fn with_sounds(mut self, eye: Option<PathBuf>, mouth: Option<PathBuf>) -> Self {
        self.processor = self.processor.with_sounds(eye, mouth);
        self
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn state(&self, signal: SignalKind) -> SignalState {
        self.processor.state(signal)
    }

    pub fn step(&mut self, frame: &RgbImage) -> Result<AnnotatedFrame> {
        let frame = match self.frame_width {
            Some(width) => resize_to_width(frame, width),
            None => frame.clone(),
        };
        let gray = GrayImage::from(imageops::grayscale(&frame));

        let faces: Vec<Face> = self
            .detector
            .detect(&gray)
            .into_iter()
            .map(|bbox| Face {
                landmarks: self.landmarks.landmarks(&gray, &bbox),
                bbox,
            })
            .collect();

        let report = self.processor.process(&faces)?;
        let mut image = DynamicImage::ImageRgb8(frame).to_rgba8();
        paint_contours(&mut image, &report.overlays);

        self.frames += 1;
        Ok(AnnotatedFrame { image, report })
    }

    /// Pull frames until the source ends, `stop` is raised, or `max_frames`
    /// have been processed. Returns the number of frames processed.
    pub fn run<S, F>(
        &mut self,
        source: &mut S,
        stop: &AtomicBool,
        max_frames: Option<u64>,
        mut on_frame: F,
    ) -> Result<u64>
    where
        S: VideoSource + ?Sized,
        F: FnMut(u64, &AnnotatedFrame) -> Result<()>,
    {
        let mut count = 0;
        loop {
            if stop.load(Ordering::Relaxed) {
                info!(frames = count, "quit requested");
                break;
            }
            if max_frames.is_some_and(|max| count >= max) {
                info!(frames = count, "frame limit reached");
                break;
            }
            let Some(frame) = source.next_frame()? else {
                info!(frames = count, "video source exhausted");
                break;
            };

            let annotated = self.step(&frame)?;
            debug!(frame = count, faces = annotated.report.faces.len(), "frame done");
            on_frame(count, &annotated)?;
            count += 1;
        }
        Ok(count)
    }
}
