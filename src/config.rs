//! Monitor configuration.
//!
//! Loaded from an optional JSON file; every field has a default, so a file
//! only needs to name what it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::debounce::{Polarity, SignalConfig};
use crate::error::{Error, Result};

/// Tuning for the rustface sliding-window detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub min_face_size: u32,
    pub score_thresh: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_face_size: 20,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub eye: SignalConfig,
    pub mouth: SignalConfig,
    /// Width frames are resized to before analysis. `None` keeps the source size.
    pub frame_width: Option<u32>,
    pub detector: DetectorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            eye: SignalConfig::new(0.25, 40, Polarity::Below),
            mouth: SignalConfig::new(0.7, 30, Polarity::Above),
            frame_width: Some(450),
            detector: DetectorConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Read and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_signal("eye", &self.eye)?;
        check_signal("mouth", &self.mouth)?;

        if self.frame_width == Some(0) {
            return Err(Error::InvalidConfig("frame_width must be positive".into()));
        }
        if self.detector.min_face_size == 0 || self.detector.slide_window_step == 0 {
            return Err(Error::InvalidConfig(
                "detector min_face_size and slide_window_step must be positive".into(),
            ));
        }
        if !(self.detector.pyramid_scale_factor > 0.0 && self.detector.pyramid_scale_factor < 1.0)
        {
            return Err(Error::InvalidConfig(format!(
                "detector pyramid_scale_factor must be in (0, 1), got {}",
                self.detector.pyramid_scale_factor
            )));
        }
        Ok(())
    }
}

fn check_signal(name: &str, signal: &SignalConfig) -> Result<()> {
    if !signal.threshold.is_finite() || signal.threshold <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "{name} threshold must be a positive number, got {}",
            signal.threshold
        )));
    }
    if signal.consecutive_frames == 0 {
        return Err(Error::InvalidConfig(format!(
            "{name} consecutive_frames must be at least 1"
        )));
    }
    Ok(())
}
