//! Pattern commands.
//!
//! Deleting a pattern is the one cross-entity cascade here: every clip
//! referencing the deleted id is dropped in the same mutation, before
//! normalization runs, so the stub-pattern synthesis never resurrects it.

use serde_json::{json, Value};

use stuumodel::grid::{PATTERN_STEPS_MAX, PATTERN_STEPS_MIN, PITCH_MAX, SWING_MAX};
use stuumodel::{fresh_id, DrumStep, PatternData};

use super::commands::{CreatePattern, MoveMidiNote, PatternRef, UpdatePattern, UpdateStep};
use super::error::EngineError;
use super::Engine;

pub(super) fn create(engine: &mut Engine, p: CreatePattern) -> Result<Value, EngineError> {
    let mut pattern = p.pattern;
    if pattern.id.trim().is_empty() {
        pattern.id = fresh_id();
    }
    if engine.project.pattern(&pattern.id).is_some() {
        return Err(EngineError::validation(format!(
            "pattern id {} already exists",
            pattern.id
        )));
    }

    let pattern_id = pattern.id.clone();
    let mut draft = engine.project.clone();
    draft.patterns.push(pattern);
    engine.commit(draft)?;
    Ok(json!({"pattern_id": pattern_id}))
}

pub(super) fn update(engine: &mut Engine, p: UpdatePattern) -> Result<Value, EngineError> {
    let mut draft = engine.project.clone();
    let pattern = draft
        .pattern_mut(&p.pattern_id)
        .ok_or_else(|| EngineError::not_found(format!("pattern {}", p.pattern_id)))?;

    if let Some(length) = p.length {
        pattern.length = length.clamp(PATTERN_STEPS_MIN, PATTERN_STEPS_MAX);
    }
    if let Some(swing) = p.swing {
        if !swing.is_finite() {
            return Err(EngineError::validation("swing must be a finite number"));
        }
        pattern.swing = swing.clamp(0.0, SWING_MAX);
    }
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn update_step(engine: &mut Engine, p: UpdateStep) -> Result<Value, EngineError> {
    if !p.velocity.is_finite() {
        return Err(EngineError::validation("velocity must be a finite number"));
    }
    if p.step >= PATTERN_STEPS_MAX {
        return Err(EngineError::validation(format!(
            "step {} out of range 0..{PATTERN_STEPS_MAX}",
            p.step
        )));
    }

    let mut draft = engine.project.clone();
    let pattern = draft
        .pattern_mut(&p.pattern_id)
        .ok_or_else(|| EngineError::not_found(format!("pattern {}", p.pattern_id)))?;

    let PatternData::Drum { steps } = &mut pattern.data else {
        return Err(EngineError::validation(format!(
            "pattern {} is not a drum pattern",
            p.pattern_id
        )));
    };

    steps.retain(|s| !(s.lane == p.lane && s.step == p.step));
    if p.velocity > 0.0 {
        steps.push(DrumStep {
            lane: p.lane,
            step: p.step,
            velocity: p.velocity.min(1.0),
        });
    }
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn delete(engine: &mut Engine, p: PatternRef) -> Result<Value, EngineError> {
    if engine.project.pattern(&p.pattern_id).is_none() {
        return Err(EngineError::not_found(format!("pattern {}", p.pattern_id)));
    }

    let mut draft = engine.project.clone();
    draft.patterns.retain(|pattern| pattern.id != p.pattern_id);
    for track in &mut draft.playlist {
        track
            .clips
            .retain(|clip| clip.pattern_id() != Some(p.pattern_id.as_str()));
    }
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn move_midi_note(engine: &mut Engine, p: MoveMidiNote) -> Result<Value, EngineError> {
    let mut draft = engine.project.clone();
    let pattern = draft
        .pattern_mut(&p.pattern_id)
        .ok_or_else(|| EngineError::not_found(format!("pattern {}", p.pattern_id)))?;

    let PatternData::Midi { notes } = &mut pattern.data else {
        return Err(EngineError::validation(format!(
            "pattern {} is not a midi pattern",
            p.pattern_id
        )));
    };

    let note = notes
        .iter_mut()
        .find(|n| n.id == p.note_id)
        .ok_or_else(|| EngineError::not_found(format!("note {}", p.note_id)))?;

    if let Some(start) = p.start {
        if !start.is_finite() || start < 0.0 {
            return Err(EngineError::validation(
                "note start must be a non-negative number",
            ));
        }
        note.start = start;
    }
    if let Some(length) = p.length {
        if !length.is_finite() || length <= 0.0 {
            return Err(EngineError::validation(
                "note length must be a positive number",
            ));
        }
        note.length = length;
    }
    if let Some(pitch) = p.pitch {
        note.pitch = pitch.min(PITCH_MAX);
    }
    if let Some(velocity) = p.velocity {
        if !velocity.is_finite() {
            return Err(EngineError::validation("velocity must be a finite number"));
        }
        note.velocity = velocity.clamp(0.0, 1.0);
    }

    engine.commit(draft)?;
    Ok(json!({}))
}
