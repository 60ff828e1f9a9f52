//! Clip commands.
//!
//! Timeline placement always lands on the grid: explicit positions are
//! quantized, and a clip created without a start lands at the next grid
//! line after the last clip on its track. Backend import of file-backed
//! clips is best-effort; the clip exists locally either way.

use serde_json::{json, Value};
use tracing::warn;

use stuumodel::grid::GRID_STEP;
use stuumodel::{ceil_to_grid, fresh_id, quantize, Clip, ClipContent, FileClip, FileKind,
    SOURCE_FORMATS};
use stuuproto::cmd;

use super::commands::{ClipRef, CreateClip, ImportFile, MoveClip, ResizeClip};
use super::error::EngineError;
use super::Engine;

pub(super) fn create(engine: &mut Engine, p: CreateClip) -> Result<Value, EngineError> {
    let track = engine
        .project
        .track(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    if engine.project.pattern(&p.pattern_id).is_none() {
        return Err(EngineError::not_found(format!("pattern {}", p.pattern_id)));
    }

    let clip_id = match p.id {
        Some(id) if !id.trim().is_empty() => {
            if track.clip(&id).is_some() {
                return Err(EngineError::validation(format!(
                    "clip id {id} already exists on track {}",
                    p.track_id
                )));
            }
            id
        }
        _ => fresh_id(),
    };

    let start = resolve_start(p.start, track.end())?;
    let length = resolve_length(p.length, 1.0)?;

    let mut draft = engine.project.clone();
    let track = draft
        .track_mut(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    track
        .clips
        .push(Clip::pattern(clip_id.clone(), p.pattern_id, start, length));
    engine.commit(draft)?;

    Ok(json!({"clip_id": clip_id, "start": start, "length": length}))
}

pub(super) async fn import_file(engine: &mut Engine, p: ImportFile) -> Result<Value, EngineError> {
    let track = engine
        .project
        .track(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;

    let format = p.format.trim().to_ascii_lowercase();
    if !SOURCE_FORMATS.contains(&format.as_str()) {
        return Err(EngineError::validation(format!(
            "unsupported source format {format:?}"
        )));
    }
    let kind = if format == "mid" || format == "midi" {
        FileKind::Midi
    } else {
        FileKind::Audio
    };

    let start = resolve_start(p.start, track.end())?;
    let length = resolve_length(p.length, 8.0)?;
    let clip_id = fresh_id();
    let source_path = p.source_path.clone();

    let mut draft = engine.project.clone();
    let track = draft
        .track_mut(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    track.clips.push(Clip {
        id: clip_id.clone(),
        start,
        length,
        content: ClipContent::File(FileClip {
            kind,
            name: p.name,
            format,
            mime: p.mime,
            size: p.size,
            duration: p.duration,
            peaks: p.peaks,
            source_path: p.source_path,
        }),
    });
    engine.commit(draft)?;

    // hand the source to the backend; a failure here stays a log line,
    // the local clip already exists
    if let (Some(peer), Some(source_path)) = (engine.native(), source_path) {
        let kind = match kind {
            FileKind::Audio => "audio",
            FileKind::Midi => "midi",
        };
        let request = json!({
            "track_id": p.track_id,
            "source_path": source_path,
            "start": start,
            "length": length,
            "type": kind,
        });
        if let Err(e) = peer.request(cmd::CLIP_IMPORT_FILE, request).await {
            warn!(track_id = p.track_id, "backend clip import failed: {e}");
        }
    }

    Ok(json!({"clip_id": clip_id, "start": start, "length": length}))
}

pub(super) fn move_clip(engine: &mut Engine, p: MoveClip) -> Result<Value, EngineError> {
    if !p.start.is_finite() || p.start < 0.0 {
        return Err(EngineError::validation(
            "start must be a non-negative number",
        ));
    }
    let start = quantize(p.start);
    let destination = p.to_track_id.unwrap_or(p.track_id);

    let mut draft = engine.project.clone();

    if destination == p.track_id {
        let track = draft
            .track_mut(p.track_id)
            .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
        let clip = track
            .clips
            .iter_mut()
            .find(|c| c.id == p.clip_id)
            .ok_or_else(|| EngineError::not_found(format!("clip {}", p.clip_id)))?;
        clip.start = start;
    } else {
        if draft.track(destination).is_none() {
            return Err(EngineError::not_found(format!("track {destination}")));
        }
        if draft
            .track(destination)
            .is_some_and(|t| t.clip(&p.clip_id).is_some())
        {
            return Err(EngineError::validation(format!(
                "clip id {} already exists on track {destination}",
                p.clip_id
            )));
        }

        let source = draft
            .track_mut(p.track_id)
            .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
        let position = source
            .clips
            .iter()
            .position(|c| c.id == p.clip_id)
            .ok_or_else(|| EngineError::not_found(format!("clip {}", p.clip_id)))?;
        let mut clip = source.clips.remove(position);
        clip.start = start;

        let target = draft
            .track_mut(destination)
            .ok_or_else(|| EngineError::not_found(format!("track {destination}")))?;
        target.clips.push(clip);
    }

    engine.commit(draft)?;
    Ok(json!({"start": start}))
}

pub(super) fn resize(engine: &mut Engine, p: ResizeClip) -> Result<Value, EngineError> {
    if !p.length.is_finite() || p.length <= 0.0 {
        return Err(EngineError::validation("length must be a positive number"));
    }
    let length = quantize(p.length).max(GRID_STEP);

    let mut draft = engine.project.clone();
    let track = draft
        .track_mut(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    let clip = track
        .clips
        .iter_mut()
        .find(|c| c.id == p.clip_id)
        .ok_or_else(|| EngineError::not_found(format!("clip {}", p.clip_id)))?;
    clip.length = length;

    engine.commit(draft)?;
    Ok(json!({"length": length}))
}

pub(super) fn delete(engine: &mut Engine, p: ClipRef) -> Result<Value, EngineError> {
    let mut draft = engine.project.clone();
    let track = draft
        .track_mut(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    let before = track.clips.len();
    track.clips.retain(|c| c.id != p.clip_id);
    if track.clips.len() == before {
        return Err(EngineError::not_found(format!("clip {}", p.clip_id)));
    }
    engine.commit(draft)?;
    Ok(json!({}))
}

fn resolve_start(requested: Option<f64>, track_end: f64) -> Result<f64, EngineError> {
    match requested {
        Some(start) => {
            if !start.is_finite() || start < 0.0 {
                return Err(EngineError::validation(
                    "start must be a non-negative number",
                ));
            }
            Ok(quantize(start))
        }
        None => Ok(ceil_to_grid(track_end)),
    }
}

fn resolve_length(requested: Option<f64>, default: f64) -> Result<f64, EngineError> {
    match requested {
        Some(length) => {
            if !length.is_finite() || length <= 0.0 {
                return Err(EngineError::validation("length must be a positive number"));
            }
            Ok(quantize(length).max(GRID_STEP))
        }
        None => Ok(default),
    }
}
