//! Transport commands: backend-forwarded when connected, clock-local
//! otherwise. Every ack carries the resulting snapshot.

use std::time::Instant;

use serde_json::{json, Value};

use stuumodel::grid::{BPM_MAX, BPM_MIN};
use stuuproto::{cmd, TransportSnapshot, BEATS_PER_BAR};

use super::commands::{Seek, SetBpm};
use super::error::EngineError;
use super::Engine;

/// Pull the snapshot out of a backend response payload.
pub(super) fn snapshot_from_payload(payload: &Value) -> Option<TransportSnapshot> {
    serde_json::from_value(payload.get("transport")?.clone()).ok()
}

fn adopt_response(engine: &mut Engine, payload: &Value) {
    if let Some(snapshot) = snapshot_from_payload(payload) {
        engine.adopt_snapshot(&snapshot);
    }
}

fn finish(engine: &mut Engine) -> Result<Value, EngineError> {
    engine.broadcast_transport();
    let snapshot = engine.clock.snapshot(Instant::now());
    Ok(json!({"transport": snapshot}))
}

pub(super) async fn play(engine: &mut Engine) -> Result<Value, EngineError> {
    if let Some(peer) = engine.native() {
        let payload = peer.request(cmd::TRANSPORT_PLAY, json!({})).await?;
        adopt_response(engine, &payload);
    } else {
        engine.clock.play(Instant::now());
    }
    finish(engine)
}

pub(super) async fn pause(engine: &mut Engine) -> Result<Value, EngineError> {
    if let Some(peer) = engine.native() {
        let payload = peer.request(cmd::TRANSPORT_PAUSE, json!({})).await?;
        adopt_response(engine, &payload);
    } else {
        engine.clock.pause(Instant::now());
    }
    finish(engine)
}

pub(super) async fn stop(engine: &mut Engine) -> Result<Value, EngineError> {
    if let Some(peer) = engine.native() {
        let payload = peer.request(cmd::TRANSPORT_STOP, json!({})).await?;
        adopt_response(engine, &payload);
    } else {
        engine.clock.stop();
    }
    finish(engine)
}

pub(super) async fn get_state(engine: &mut Engine) -> Result<Value, EngineError> {
    if let Some(peer) = engine.native() {
        let payload = peer.request(cmd::TRANSPORT_GET_STATE, json!({})).await?;
        adopt_response(engine, &payload);
    }
    let snapshot = engine.clock.snapshot(Instant::now());
    Ok(json!({"transport": snapshot}))
}

pub(super) async fn set_bpm(engine: &mut Engine, p: SetBpm) -> Result<Value, EngineError> {
    if !p.bpm.is_finite() {
        return Err(EngineError::validation("bpm must be a finite number"));
    }
    let bpm = p.bpm.clamp(BPM_MIN, BPM_MAX);

    if let Some(peer) = engine.native() {
        let payload = peer.request(cmd::TRANSPORT_SET_BPM, json!({"bpm": bpm})).await?;
        match snapshot_from_payload(&payload) {
            Some(snapshot) => engine.adopt_snapshot(&snapshot),
            None => engine.clock.set_bpm(bpm, Instant::now()),
        }
    } else {
        engine.clock.set_bpm(bpm, Instant::now());
    }

    engine.project.bpm = engine.clock.bpm();
    engine.broadcast_state();
    finish(engine)
}

pub(super) async fn seek(engine: &mut Engine, p: Seek) -> Result<Value, EngineError> {
    let beats = match (p.position_beats, p.position_bars) {
        (Some(beats), _) => beats,
        (None, Some(bars)) => bars * BEATS_PER_BAR,
        (None, None) => {
            return Err(EngineError::validation(
                "position_beats or position_bars required",
            ))
        }
    };
    if !beats.is_finite() {
        return Err(EngineError::validation("seek position must be finite"));
    }
    let beats = beats.max(0.0);

    if let Some(peer) = engine.native() {
        let payload = peer
            .request(cmd::TRANSPORT_SEEK, json!({"position_beats": beats}))
            .await?;
        adopt_response(engine, &payload);
    } else {
        engine.clock.seek(beats, Instant::now());
    }
    finish(engine)
}
