//! # drowsiness-monitor
//!
//! Watches a driver's face frame by frame and raises an audible alarm when
//! the eyes stay closed, or the mouth stays wide open in a yawn, for too
//! many consecutive frames.
//!
//! ## Pipeline
//!
//! 1. Resize the frame to a fixed width and convert it to grayscale
//! 2. Detect faces ([`RustfaceDetector`], or any [`FaceDetector`])
//! 3. Place 68 iBUG landmarks on each face ([`ShapePredictor`], an ERT
//!    cascade after Kazemi & Sullivan, 2014, loaded from dlib models)
//! 4. Compute the eye aspect ratio (mean of both eyes) and the mouth aspect
//!    ratio
//! 5. Feed each ratio into its own [`DebounceAlarm`]: a signal must hold for
//!    N consecutive frames before the alarm latches, and clears on the first
//!    frame it does not
//! 6. Emit overlays and, on the frame an alarm latches, start the alarm sound
//!    on a detached thread
//!
//! Frames without a detected face are skipped: neither alarm advances or
//! resets.
//!
//! ## Quick Start
//!
//! ```rust
//! use drowsiness_monitor::{AlarmUpdate, DebounceAlarm, Polarity, SignalConfig};
//!
//! let mut eyes = DebounceAlarm::new(SignalConfig::new(0.25, 3, Polarity::Below));
//!
//! let updates: Vec<AlarmUpdate> = [0.2, 0.2, 0.2, 0.2, 0.3]
//!     .into_iter()
//!     .map(|ear| eyes.update(ear))
//!     .collect();
//!
//! assert!(updates[2].just_triggered);
//! assert!(updates[3].alarm_active && !updates[3].just_triggered);
//! assert!(!updates[4].alarm_active);
//! ```
//!
//! ## Custom Collaborators
//!
//! Detection, landmarks and playback sit behind traits, so the frame logic
//! runs against anything that implements them:
//!
//! ```rust
//! use drowsiness_monitor::{BoundingBox, FaceDetector, GrayImage};
//!
//! struct NoFaces;
//!
//! impl FaceDetector for NoFaces {
//!     fn detect(&mut self, _image: &GrayImage) -> Vec<BoundingBox> {
//!         Vec::new()
//!     }
//! }
//! ```

pub mod alarm;
pub mod config;
pub mod debounce;
pub mod detect;
pub mod dlib;
mod error;
mod features;
pub mod logging;
pub mod metrics;
mod model;
pub mod monitor;
pub mod processor;
pub mod render;
mod tree;
mod types;
pub mod video;

pub use alarm::{AlarmPlayer, NullPlayer, ThreadedPlayer};
pub use config::{DetectorConfig, MonitorConfig};
pub use debounce::{AlarmPhase, AlarmUpdate, DebounceAlarm, Polarity, SignalConfig, SignalState};
pub use detect::{FaceDetector, LandmarkProvider, RustfaceDetector};
pub use error::{Error, Result};
pub use features::{GrayImage, ImageAccess, SimilarityTransform};
pub use metrics::{convex_hull, eye_aspect_ratio, mouth_aspect_ratio, FaceRegions};
pub use model::ShapePredictor;
pub use monitor::{AnnotatedFrame, Monitor};
pub use processor::{
    AlarmEvent, Face, FaceReading, FrameProcessor, FrameReport, SignalKind, SignalReading,
    ALERT_TEXT,
};
pub use render::{Color, Overlay};
pub use tree::{CascadeStage, FeaturePixel, RegressionTree, Split};
pub use types::{BoundingBox, Point, Shape};
pub use video::{open_webcam, resize_to_width, ImageSequence, VideoSource};

#[cfg(all(feature = "webcam", target_os = "linux"))]
pub use video::Webcam;
