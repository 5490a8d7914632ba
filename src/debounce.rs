//! Per-signal debounce state machine.
//!
//! A [`DebounceAlarm`] turns one noisy ratio per frame into a latched alarm:
//! the condition has to hold for `consecutive_frames` frames in a row before
//! the alarm fires, and the alarm clears on the first frame it no longer
//! holds. The unit is frames, not seconds, so the effective delay scales
//! with the camera's frame rate.

use serde::{Deserialize, Serialize};

/// Which side of the threshold counts as "condition present".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// `ratio < threshold` (eye closure).
    Below,
    /// `ratio > threshold` (mouth opening).
    Above,
}

/// Fixed parameters of one monitored signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub threshold: f32,
    pub consecutive_frames: u32,
    pub polarity: Polarity,
}

impl SignalConfig {
    pub const fn new(threshold: f32, consecutive_frames: u32, polarity: Polarity) -> Self {
        Self {
            threshold,
            consecutive_frames,
            polarity,
        }
    }

    /// Whether `ratio` is on the alarming side of the threshold.
    ///
    /// The comparison is strict, so a ratio equal to the threshold is absent.
    /// Non-finite ratios (degenerate landmark geometry) are always absent.
    pub fn condition_present(&self, ratio: f32) -> bool {
        if !ratio.is_finite() {
            return false;
        }
        match self.polarity {
            Polarity::Below => ratio < self.threshold,
            Polarity::Above => ratio > self.threshold,
        }
    }
}

/// Coarse state of a signal, derived from its counter and latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmPhase {
    Idle,
    Accumulating,
    Alarming,
}

/// Mutable state of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SignalState {
    pub counter: u32,
    pub alarm_active: bool,
}

/// Result of feeding one frame's ratio into a [`DebounceAlarm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlarmUpdate {
    /// True only on the frame the alarm latched.
    pub just_triggered: bool,
    pub alarm_active: bool,
    pub counter: u32,
}

#[derive(Debug, Clone)]
pub struct DebounceAlarm {
    config: SignalConfig,
    state: SignalState,
}

impl DebounceAlarm {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            state: SignalState::default(),
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn phase(&self) -> AlarmPhase {
        if self.state.alarm_active {
            AlarmPhase::Alarming
        } else if self.state.counter > 0 {
            AlarmPhase::Accumulating
        } else {
            AlarmPhase::Idle
        }
    }

    /// Advance by one frame.
    pub fn update(&mut self, ratio: f32) -> AlarmUpdate {
        let (next, just_triggered) = step(self.state, &self.config, ratio);
        self.state = next;

        AlarmUpdate {
            just_triggered,
            alarm_active: next.alarm_active,
            counter: next.counter,
        }
    }

    /// Return to `Idle`.
    pub fn reset(&mut self) {
        self.state = SignalState::default();
    }
}

fn step(state: SignalState, config: &SignalConfig, ratio: f32) -> (SignalState, bool) {
    if !config.condition_present(ratio) {
        return (SignalState::default(), false);
    }

    let counter = state.counter.saturating_add(1);
    let just_triggered = !state.alarm_active && counter == config.consecutive_frames;

    (
        SignalState {
            counter,
            alarm_active: state.alarm_active || just_triggered,
        },
        just_triggered,
    )
}
