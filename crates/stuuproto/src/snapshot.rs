//! Transport snapshots.
//!
//! The canonical position tuple shared by the backend protocol, the
//! transport clock, and the client gateway. The musical frame is fixed:
//! 4 beats per bar, 4 steps per beat, 16 steps per bar. Beat-valued
//! floats are rounded to 6 decimal places when emitted.

use serde::{Deserialize, Serialize};

pub const BEATS_PER_BAR: f64 = 4.0;
pub const STEPS_PER_BEAT: f64 = 4.0;
pub const STEPS_PER_BAR: i64 = 16;

/// Round to the 6-decimal precision beat values are emitted at.
pub fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Epoch milliseconds, the timestamp unit snapshots carry.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransportSnapshot {
    pub playing: bool,

    /// Tempo in beats per minute. When present in a backend snapshot it
    /// is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,

    /// 1-based bar number.
    pub bar: i64,

    /// 1-based beat within the bar.
    pub beat: i64,

    /// 1-based step within the bar.
    pub step: i64,

    /// 0-based step within the bar.
    pub step_index: i64,

    pub position_bars: f64,

    pub position_beats: f64,

    /// Epoch milliseconds at which the snapshot was taken.
    pub timestamp: i64,
}

impl TransportSnapshot {
    /// Build a snapshot from a raw beat position, deriving the bar /
    /// beat / step fields.
    pub fn at_position(playing: bool, bpm: f64, position_beats: f64, timestamp: i64) -> Self {
        let beats = if position_beats.is_finite() {
            position_beats.max(0.0)
        } else {
            0.0
        };
        let step_index = ((beats * STEPS_PER_BEAT).floor() as i64).rem_euclid(STEPS_PER_BAR);
        Self {
            playing,
            bpm: Some(bpm),
            bar: (beats / BEATS_PER_BAR).floor() as i64 + 1,
            beat: (beats % BEATS_PER_BAR).floor() as i64 + 1,
            step: step_index + 1,
            step_index,
            position_bars: round6(beats / BEATS_PER_BAR),
            position_beats: round6(beats),
            timestamp,
        }
    }

    /// A stopped snapshot at position zero.
    pub fn stopped(bpm: f64, timestamp: i64) -> Self {
        Self::at_position(false, bpm, 0.0, timestamp)
    }

    /// Clamp integer fields to their floors and squash non-finite
    /// numerics. Applied to every snapshot adopted from the backend; the
    /// field values themselves are taken verbatim.
    pub fn sanitize(mut self) -> Self {
        self.bar = self.bar.max(1);
        self.beat = self.beat.max(1);
        self.step = self.step.max(1);
        self.step_index = self.step_index.max(0);
        if !self.position_bars.is_finite() || self.position_bars < 0.0 {
            self.position_bars = 0.0;
        }
        if !self.position_beats.is_finite() || self.position_beats < 0.0 {
            self.position_beats = 0.0;
        }
        self.position_bars = round6(self.position_bars);
        self.position_beats = round6(self.position_beats);
        if let Some(bpm) = self.bpm {
            if !bpm.is_finite() {
                self.bpm = None;
            }
        }
        self
    }
}
