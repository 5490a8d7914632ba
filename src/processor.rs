//! Per-frame decision logic.
//!
//! [`FrameProcessor`] owns one [`DebounceAlarm`] per signal. For every face
//! in a frame it computes the eye and mouth ratios, advances both alarms,
//! requests playback on the frame an alarm latches, and describes the
//! overlays for that face. A frame without faces leaves both alarms
//! untouched: missing detections are skipped frames, not open eyes.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alarm::AlarmPlayer;
use crate::debounce::{AlarmPhase, AlarmUpdate, DebounceAlarm, SignalConfig, SignalState};
use crate::error::Result;
use crate::metrics::{convex_hull, FaceRegions};
use crate::render::{Color, Overlay};
use crate::types::{BoundingBox, Point, Shape};

pub const ALERT_TEXT: &str = "DROWSINESS ALERT!";

const TEXT_SCALE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Eyes,
    Mouth,
}

impl SignalKind {
    fn label(self, ratio: f32) -> String {
        match self {
            SignalKind::Eyes => format!("eyeAR: {ratio:.2}"),
            SignalKind::Mouth => format!("mouthAR: {ratio:.2}"),
        }
    }

    fn label_origin(self) -> Point {
        match self {
            SignalKind::Eyes => Point::new(280.0, 30.0),
            SignalKind::Mouth => Point::new(280.0, 50.0),
        }
    }

    fn alert_origin(self) -> Point {
        match self {
            SignalKind::Eyes => Point::new(10.0, 30.0),
            SignalKind::Mouth => Point::new(10.0, 50.0),
        }
    }
}

/// A detected face and its landmarks.
#[derive(Debug, Clone)]
pub struct Face {
    pub bbox: BoundingBox,
    pub landmarks: Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalReading {
    pub ratio: f32,
    #[serde(flatten)]
    pub update: AlarmUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceReading {
    pub bbox: BoundingBox,
    pub left_eye_ratio: f32,
    pub right_eye_ratio: f32,
    pub eyes: SignalReading,
    pub mouth: SignalReading,
}

/// An alarm that latched during this frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmEvent {
    pub signal: SignalKind,
    /// Sound requested for playback, if one is configured.
    pub sound: Option<PathBuf>,
}

/// Everything one frame produced, in drawing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub faces: Vec<FaceReading>,
    pub overlays: Vec<Overlay>,
    pub alarms: Vec<AlarmEvent>,
}

impl FrameReport {
    /// True when the frame had no faces and no state changed.
    pub fn is_skipped(&self) -> bool {
        self.faces.is_empty()
    }
}

struct Channel {
    kind: SignalKind,
    alarm: DebounceAlarm,
    sound: Option<PathBuf>,
}

impl Channel {
    fn new(kind: SignalKind, config: SignalConfig) -> Self {
        Self {
            kind,
            alarm: DebounceAlarm::new(config),
            sound: None,
        }
    }

    fn observe<P: AlarmPlayer>(
        &mut self,
        ratio: f32,
        player: &P,
        report: &mut FrameReport,
    ) -> SignalReading {
        let was_active = self.alarm.state().alarm_active;
        let update = self.alarm.update(ratio);

        if update.just_triggered {
            warn!(signal = ?self.kind, ratio, frames = update.counter, "alarm triggered");
            if let Some(sound) = &self.sound {
                player.play(sound);
            }
            report.alarms.push(AlarmEvent {
                signal: self.kind,
                sound: self.sound.clone(),
            });
        } else if was_active && !update.alarm_active {
            info!(signal = ?self.kind, ratio, "alarm cleared");
        }

        let (text, origin) = if update.alarm_active {
            (ALERT_TEXT.to_string(), self.kind.alert_origin())
        } else {
            (self.kind.label(ratio), self.kind.label_origin())
        };
        report.overlays.push(Overlay::Text {
            text,
            origin,
            scale: TEXT_SCALE,
            color: Color::RED,
        });

        SignalReading { ratio, update }
    }
}

pub struct FrameProcessor<P> {
    eyes: Channel,
    mouth: Channel,
    player: P,
}

impl<P: AlarmPlayer> FrameProcessor<P> {
    pub fn new(eye: SignalConfig, mouth: SignalConfig, player: P) -> Self {
        Self {
            eyes: Channel::new(SignalKind::Eyes, eye),
            mouth: Channel::new(SignalKind::Mouth, mouth),
            player,
        }
    }

    /// Sounds to play when each alarm latches; `None` disables playback.
    pub fn with_sounds(mut self, eye: Option<PathBuf>, mouth: Option<PathBuf>) -> Self {
        self.eyes.sound = eye;
        self.mouth.sound = mouth;
        self
    }

    pub fn state(&self, signal: SignalKind) -> SignalState {
        self.channel(signal).alarm.state()
    }

    pub fn phase(&self, signal: SignalKind) -> AlarmPhase {
        self.channel(signal).alarm.phase()
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    fn channel(&self, signal: SignalKind) -> &Channel {
        match signal {
            SignalKind::Eyes => &self.eyes,
            SignalKind::Mouth => &self.mouth,
        }
    }

    /// Process every face of one frame in detection order.
    ///
    /// All faces are checked for a full landmark set before any state
    /// changes, so an error leaves both alarms as they were.
    pub fn process(&mut self, faces: &[Face]) -> Result<FrameReport> {
        let regions = faces
            .iter()
            .map(|f| FaceRegions::from_shape(&f.landmarks))
            .collect::<Result<Vec<_>>>()?;

        let mut report = FrameReport::default();
        if faces.is_empty() {
            debug!("no face in frame, alarms held");
            return Ok(report);
        }

        for (face, regions) in faces.iter().zip(regions) {
            let (left, right, eye_ratio) = regions.eye_ratio();
            let mouth_ratio = regions.mouth_ratio();
            debug!(eye_ratio, mouth_ratio, "face ratios");

            for hull in [
                convex_hull(regions.left_eye),
                convex_hull(regions.right_eye),
                convex_hull(regions.mouth),
            ] {
                report.overlays.push(Overlay::Contour {
                    points: hull,
                    color: Color::GREEN,
                });
            }

            let eyes = self.eyes.observe(eye_ratio, &self.player, &mut report);
            let mouth = self.mouth.observe(mouth_ratio, &self.player, &mut report);

            report.faces.push(FaceReading {
                bbox: face.bbox,
                left_eye_ratio: left,
                right_eye_ratio: right,
                eyes,
                mouth,
            });
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::Polarity;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<PathBuf>>);

    impl AlarmPlayer for Recorder {
        fn play(&self, sound: &Path) {
            self.0.borrow_mut().push(sound.to_path_buf());
        }
    }

    /// A 68-point face whose eye ratio is `ear` and mouth ratio `mar`.
    fn face(ear: f32, mar: f32) -> Face {
        let mut pts = vec![Point::new(100.0, 100.0); 68];
        for (start, cx) in [(36, 60.0), (42, 140.0)] {
            let h = ear * 20.0;
            let eye = [
                (cx - 10.0, 80.0),
                (cx - 4.0, 80.0 - h / 2.0),
                (cx + 4.0, 80.0 - h / 2.0),
                (cx + 10.0, 80.0),
                (cx + 4.0, 80.0 + h / 2.0),
                (cx - 4.0, 80.0 + h / 2.0),
            ];
            for (i, (x, y)) in eye.into_iter().enumerate() {
                pts[start + i] = Point::new(x, y);
            }
        }
        let h = mar * 40.0;
        pts[48 + 11] = Point::new(80.0, 150.0);
        pts[48 + 15] = Point::new(120.0, 150.0);
        for (upper, lower, x) in [(12, 18, 90.0), (13, 17, 100.0), (14, 16, 110.0)] {
            pts[48 + upper] = Point::new(x, 150.0 - h / 2.0);
            pts[48 + lower] = Point::new(x, 150.0 + h / 2.0);
        }
        Face {
            bbox: BoundingBox::new(40.0, 40.0, 140.0, 140.0),
            landmarks: Shape::new(pts),
        }
    }

    fn processor(eye_frames: u32, mouth_frames: u32) -> FrameProcessor<Recorder> {
        FrameProcessor::new(
            SignalConfig::new(0.25, eye_frames, Polarity::Below),
            SignalConfig::new(0.7, mouth_frames, Polarity::Above),
            Recorder::default(),
        )
    }

    fn texts(report: &FrameReport) -> Vec<&str> {
        report
            .overlays
            .iter()
            .filter_map(|o| match o {
                Overlay::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn synthetic_face_has_requested_ratios() {
        let f = face(0.3, 0.5);
        let regions = FaceRegions::from_shape(&f.landmarks).unwrap();
        let (left, right, mean) = regions.eye_ratio();
        assert!((left - 0.3).abs() < 1e-5);
        assert!((right - 0.3).abs() < 1e-5);
        assert!((mean - 0.3).abs() < 1e-5);
        assert!((regions.mouth_ratio() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn open_face_shows_ratio_labels() {
        let mut p = processor(3, 3);
        let report = p.process(&[face(0.31, 0.2)]).unwrap();

        assert_eq!(texts(&report), ["eyeAR: 0.31", "mouthAR: 0.20"]);
        let contours = report
            .overlays
            .iter()
            .filter(|o| matches!(o, Overlay::Contour { .. }))
            .count();
        assert_eq!(contours, 3);
        assert!(report.alarms.is_empty());
    }

    #[test]
    fn overlays_put_contours_before_text() {
        let mut p = processor(3, 3);
        let report = p.process(&[face(0.31, 0.2)]).unwrap();
        assert!(matches!(report.overlays[0], Overlay::Contour { .. }));
        assert!(matches!(report.overlays[3], Overlay::Text { .. }));
    }

    #[test]
    fn closed_eyes_raise_alert_and_play_once() {
        let mut p = processor(2, 5).with_sounds(Some("eye.wav".into()), None);

        p.process(&[face(0.1, 0.2)]).unwrap();
        let second = p.process(&[face(0.1, 0.2)]).unwrap();
        let third = p.process(&[face(0.1, 0.2)]).unwrap();

        assert_eq!(texts(&second)[0], ALERT_TEXT);
        assert_eq!(
            second.alarms,
            [AlarmEvent {
                signal: SignalKind::Eyes,
                sound: Some("eye.wav".into()),
            }]
        );
        assert!(third.alarms.is_empty());
        assert_eq!(texts(&third)[0], ALERT_TEXT);
        assert_eq!(p.player().0.borrow().as_slice(), [PathBuf::from("eye.wav")]);
        assert_eq!(p.phase(SignalKind::Eyes), AlarmPhase::Alarming);
    }

    #[test]
    fn alert_positions_are_per_signal() {
        let mut p = processor(1, 1);
        let report = p.process(&[face(0.1, 0.9)]).unwrap();
        let origins: Vec<_> = report
            .overlays
            .iter()
            .filter_map(|o| match o {
                Overlay::Text { text, origin, .. } if text == ALERT_TEXT => Some(*origin),
                _ => None,
            })
            .collect();
        assert_eq!(origins, [Point::new(10.0, 30.0), Point::new(10.0, 50.0)]);
    }

    #[test]
    fn trigger_without_sound_is_reported_but_silent() {
        let mut p = processor(5, 1);
        let report = p.process(&[face(0.3, 0.9)]).unwrap();

        assert_eq!(
            report.alarms,
            [AlarmEvent {
                signal: SignalKind::Mouth,
                sound: None,
            }]
        );
        assert!(p.player().0.borrow().is_empty());
    }

    #[test]
    fn missing_face_freezes_both_alarms() {
        let mut p = processor(3, 3);
        p.process(&[face(0.1, 0.9)]).unwrap();
        p.process(&[face(0.1, 0.9)]).unwrap();

        let before = (p.state(SignalKind::Eyes), p.state(SignalKind::Mouth));
        let report = p.process(&[]).unwrap();
        assert!(report.is_skipped());
        assert!(report.overlays.is_empty());
        assert_eq!(before, (p.state(SignalKind::Eyes), p.state(SignalKind::Mouth)));

        // The run continues where it left off
        let report = p.process(&[face(0.1, 0.9)]).unwrap();
        assert_eq!(report.alarms.len(), 2);
    }

    #[test]
    fn signals_do_not_share_state() {
        let mut p = processor(3, 2);
        p.process(&[face(0.1, 0.2)]).unwrap();
        p.process(&[face(0.1, 0.2)]).unwrap();
        assert_eq!(p.state(SignalKind::Eyes).counter, 2);
        assert_eq!(p.state(SignalKind::Mouth).counter, 0);

        let report = p.process(&[face(0.3, 0.9)]).unwrap();
        assert_eq!(p.state(SignalKind::Eyes).counter, 0);
        assert_eq!(p.state(SignalKind::Mouth).counter, 1);
        assert!(report.alarms.is_empty());
    }

    #[test]
    fn each_face_advances_the_shared_alarms() {
        let mut p = processor(2, 5);
        let report = p.process(&[face(0.1, 0.2), face(0.1, 0.2)]).unwrap();

        assert_eq!(report.faces.len(), 2);
        assert!(!report.faces[0].eyes.update.alarm_active);
        assert!(report.faces[1].eyes.update.just_triggered);
        assert_eq!(report.overlays.len(), 10);
    }

    #[test]
    fn short_landmark_set_changes_nothing() {
        let mut p = processor(1, 1);
        let short = Face {
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            landmarks: Shape::zeros(5),
        };
        let err = p.process(&[face(0.1, 0.9), short]).unwrap_err();
        assert!(matches!(err, Error::TooFewLandmarks { .. }));
        assert_eq!(p.phase(SignalKind::Eyes), AlarmPhase::Idle);
        assert_eq!(p.phase(SignalKind::Mouth), AlarmPhase::Idle);
    }

    #[test]
    fn degenerate_eye_counts_as_open() {
        let mut p = processor(1, 5);
        let mut f = face(0.1, 0.2);
        for i in 36..48 {
            f.landmarks.points[i] = Point::new(50.0, 50.0);
        }
        let report = p.process(&[f]).unwrap();
        assert!(report.faces[0].eyes.ratio.is_nan());
        assert!(!report.faces[0].eyes.update.alarm_active);
        assert_eq!(texts(&report)[0], "eyeAR: NaN");
    }

    #[test]
    fn report_serializes_flat_signal_readings() {
        let mut p = processor(3, 3);
        let report = p.process(&[face(0.3, 0.2)]).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["faces"][0]["eyes"]["counter"], 0);
        assert_eq!(json["faces"][0]["mouth"]["alarm_active"], false);
    }
}
