//! Mixer strip commands. Each one upserts the strip for its track and
//! clamps into the declared range, so repeating a command is a no-op.

use serde_json::{json, Value};

use stuumodel::grid::{PAN_MAX, PAN_MIN, VOLUME_MAX, VOLUME_MIN};
use stuumodel::{MixerStrip, Project};

use super::commands::{SetMute, SetPan, SetRecordArm, SetSolo, SetVolume};
use super::error::EngineError;
use super::tracks::require_track;
use super::Engine;

fn upsert_strip(draft: &mut Project, track_id: u32) -> usize {
    match draft.mixer.iter().position(|s| s.track_id == track_id) {
        Some(pos) => pos,
        None => {
            draft.mixer.push(MixerStrip::new(track_id));
            draft.mixer.len() - 1
        }
    }
}

pub(super) fn set_volume(engine: &mut Engine, p: SetVolume) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;
    if !p.volume.is_finite() {
        return Err(EngineError::validation("volume must be a finite number"));
    }
    let mut draft = engine.project.clone();
    let pos = upsert_strip(&mut draft, p.track_id);
    draft.mixer[pos].volume = p.volume.clamp(VOLUME_MIN, VOLUME_MAX);
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn set_pan(engine: &mut Engine, p: SetPan) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;
    if !p.pan.is_finite() {
        return Err(EngineError::validation("pan must be a finite number"));
    }
    let mut draft = engine.project.clone();
    let pos = upsert_strip(&mut draft, p.track_id);
    draft.mixer[pos].pan = p.pan.clamp(PAN_MIN, PAN_MAX);
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn set_mute(engine: &mut Engine, p: SetMute) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;
    let mut draft = engine.project.clone();
    let pos = upsert_strip(&mut draft, p.track_id);
    draft.mixer[pos].mute = p.mute;
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn set_solo(engine: &mut Engine, p: SetSolo) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;
    let mut draft = engine.project.clone();
    let pos = upsert_strip(&mut draft, p.track_id);
    draft.mixer[pos].solo = p.solo;
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn set_record_arm(engine: &mut Engine, p: SetRecordArm) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;
    let mut draft = engine.project.clone();
    let pos = upsert_strip(&mut draft, p.track_id);
    draft.mixer[pos].record_armed = p.record_armed;
    engine.commit(draft)?;
    Ok(json!({}))
}
