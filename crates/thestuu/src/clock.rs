//! Transport clock with backend-or-fallback semantics.
//!
//! While the native backend is connected its snapshots are authoritative:
//! `adopt` stores the latest one verbatim (sanitized) and reads return it
//! unchanged. When the backend goes away, `to_fallback` seeds a local
//! monotonic clock from the last adopted position so playback time keeps
//! flowing without a jump.
//!
//! The local clock stores the instant play was pressed and the beat
//! offset accumulated before that; the current position is
//! `offset + elapsed_seconds * bpm / 60`. Pause folds the elapsed span
//! into the offset, stop resets both, seek replaces the offset and - only
//! while playing - restarts the elapsed span.

use std::time::Instant;

use stuumodel::grid::{clamp_finite, BPM_MAX, BPM_MIN};
use stuuproto::{now_ms, round6, TransportSnapshot};

pub struct TransportClock {
    bpm: f64,

    /// Beat position accumulated before `started_at` (local mode).
    offset_beats: f64,

    /// When play was pressed (None if paused/stopped).
    started_at: Option<Instant>,

    /// Last adopted backend snapshot; Some means backend-authoritative.
    native: Option<TransportSnapshot>,
}

impl TransportClock {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: clamp_finite(bpm, BPM_MIN, BPM_MAX, 128.0),
            offset_beats: 0.0,
            started_at: None,
            native: None,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Change tempo. In local mode the position accumulated so far is
    /// folded first so the rate change applies from now, not
    /// retroactively.
    pub fn set_bpm(&mut self, bpm: f64, now: Instant) {
        if self.native.is_none() && self.started_at.is_some() {
            self.offset_beats = self.position_beats(now);
            self.started_at = Some(now);
        }
        self.bpm = clamp_finite(bpm, BPM_MIN, BPM_MAX, self.bpm);
    }

    /// Adopt a backend snapshot as the authoritative transport state. A
    /// `bpm` carried by the snapshot overrides the local tempo.
    pub fn adopt(&mut self, snapshot: &TransportSnapshot) {
        let snapshot = snapshot.clone().sanitize();
        if let Some(bpm) = snapshot.bpm {
            self.bpm = clamp_finite(bpm, BPM_MIN, BPM_MAX, self.bpm);
        }
        self.offset_beats = snapshot.position_beats;
        self.started_at = None;
        self.native = Some(snapshot);
    }

    pub fn native_authoritative(&self) -> bool {
        self.native.is_some()
    }

    /// Switch to the local clock, seeding it from the last adopted
    /// snapshot so a playing transport keeps moving smoothly.
    pub fn to_fallback(&mut self, now: Instant) {
        if let Some(snapshot) = self.native.take() {
            self.offset_beats = snapshot.position_beats;
            self.started_at = if snapshot.playing { Some(now) } else { None };
        }
    }

    pub fn playing(&self) -> bool {
        match &self.native {
            Some(snapshot) => snapshot.playing,
            None => self.started_at.is_some(),
        }
    }

    pub fn play(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(started) = self.started_at.take() {
            self.offset_beats = round6(self.offset_beats + elapsed_beats(started, now, self.bpm));
        }
    }

    pub fn stop(&mut self) {
        self.offset_beats = 0.0;
        self.started_at = None;
    }

    pub fn seek(&mut self, position_beats: f64, now: Instant) {
        self.offset_beats = if position_beats.is_finite() {
            position_beats.max(0.0)
        } else {
            0.0
        };
        if self.started_at.is_some() {
            self.started_at = Some(now);
        }
    }

    pub fn position_beats(&self, now: Instant) -> f64 {
        match &self.native {
            Some(snapshot) => snapshot.position_beats,
            None => match self.started_at {
                Some(started) => self.offset_beats + elapsed_beats(started, now, self.bpm),
                None => self.offset_beats,
            },
        }
    }

    /// The canonical snapshot at `now`.
    pub fn snapshot(&self, now: Instant) -> TransportSnapshot {
        match &self.native {
            Some(snapshot) => {
                let mut snap = snapshot.clone();
                snap.bpm = Some(self.bpm);
                snap
            }
            None => TransportSnapshot::at_position(
                self.playing(),
                self.bpm,
                self.position_beats(now),
                now_ms(),
            ),
        }
    }
}

fn elapsed_beats(started: Instant, now: Instant, bpm: f64) -> f64 {
    now.saturating_duration_since(started).as_secs_f64() * bpm / 60.0
}
