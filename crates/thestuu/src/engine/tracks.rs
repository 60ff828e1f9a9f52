//! Track lifecycle commands.
//!
//! Structural changes (insert, reorder, delete, bulk-delete, duplicate)
//! re-index everything that hangs off a track id - plugin nodes and
//! mixer strips move with their track - and then replay the edit state
//! into the backend when one is connected.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use stuumodel::grid::TRACK_NAME_MAX;
use stuumodel::{fresh_id, MixerStrip, PluginNode, Project, Track};

use super::commands::{
    BulkDeleteTracks, InsertTrack, ReorderTrack, SetChainCollapsed, SetChainEnabled, SetTrackName,
    TrackRef,
};
use super::error::EngineError;
use super::{sync, Engine};

pub(super) async fn create(engine: &mut Engine) -> Result<Value, EngineError> {
    let mut draft = engine.project.clone();
    let track_id = draft.playlist.len() as u32 + 1;
    draft
        .playlist
        .push(Track::new(track_id, format!("Track {track_id}")));
    draft.mixer.push(MixerStrip::new(track_id));
    engine.commit(draft)?;
    Ok(json!({"track_id": track_id}))
}

pub(super) async fn insert(engine: &mut Engine, p: InsertTrack) -> Result<Value, EngineError> {
    let after = p.after_track_id;
    let count = engine.project.playlist.len() as u32;
    if after > count {
        return Err(EngineError::validation(format!(
            "after_track_id {after} out of range 0..={count}"
        )));
    }

    let mut draft = engine.project.clone();
    shift_ids_up(&mut draft, after);
    let new_id = after + 1;
    draft
        .playlist
        .insert(after as usize, Track::new(new_id, format!("Track {new_id}")));
    draft.mixer.push(MixerStrip::new(new_id));
    engine.commit(draft)?;

    let report = sync::resync(engine).await;
    Ok(sync::ack_with_sync(json!({"track_id": new_id}), report))
}

pub(super) async fn reorder(engine: &mut Engine, p: ReorderTrack) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;

    let mut draft = engine.project.clone();
    let from = draft
        .playlist
        .iter()
        .position(|t| t.track_id == p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    let track = draft.playlist.remove(from);
    let to = p.to_index.min(draft.playlist.len());
    draft.playlist.insert(to, track);

    remap_to_playlist_order(&mut draft);
    engine.commit(draft)?;

    let report = sync::resync(engine).await;
    Ok(sync::ack_with_sync(json!({"track_id": to as u32 + 1}), report))
}

pub(super) async fn delete(engine: &mut Engine, p: TrackRef) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;

    let mut draft = engine.project.clone();
    drop_tracks(&mut draft, &HashSet::from([p.track_id]));
    engine.commit(draft)?;

    let report = sync::resync(engine).await;
    Ok(sync::ack_with_sync(json!({}), report))
}

pub(super) async fn bulk_delete(
    engine: &mut Engine,
    p: BulkDeleteTracks,
) -> Result<Value, EngineError> {
    if p.track_ids.is_empty() {
        return Err(EngineError::validation("track_ids must not be empty"));
    }
    for &track_id in &p.track_ids {
        require_track(&engine.project, track_id)?;
    }

    let doomed: HashSet<u32> = p.track_ids.iter().copied().collect();
    let mut draft = engine.project.clone();
    drop_tracks(&mut draft, &doomed);
    engine.commit(draft)?;

    let report = sync::resync(engine).await;
    Ok(sync::ack_with_sync(
        json!({"deleted": doomed.len()}),
        report,
    ))
}

pub(super) async fn duplicate(engine: &mut Engine, p: TrackRef) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;

    let src_id = p.track_id;
    let new_id = src_id + 1;

    let mut draft = engine.project.clone();
    shift_ids_up(&mut draft, src_id);

    let src_pos = draft
        .playlist
        .iter()
        .position(|t| t.track_id == src_id)
        .ok_or_else(|| EngineError::not_found(format!("track {src_id}")))?;

    let mut copy = draft.playlist[src_pos].clone();
    copy.track_id = new_id;
    for clip in &mut copy.clips {
        clip.id = fresh_id();
    }
    draft.playlist.insert(src_pos + 1, copy);

    let chain: Vec<PluginNode> = draft
        .nodes
        .iter()
        .filter(|n| n.track_id == src_id)
        .cloned()
        .collect();
    for mut node in chain {
        node.id = fresh_id();
        node.track_id = new_id;
        draft.nodes.push(node);
    }

    if let Some(mut strip) = draft
        .mixer
        .iter()
        .find(|s| s.track_id == src_id)
        .cloned()
    {
        strip.track_id = new_id;
        draft.mixer.push(strip);
    }

    engine.commit(draft)?;

    let report = sync::resync(engine).await;
    Ok(sync::ack_with_sync(json!({"track_id": new_id}), report))
}

pub(super) fn set_name(engine: &mut Engine, p: SetTrackName) -> Result<Value, EngineError> {
    let name = p.name.trim().to_string();
    if name.is_empty() {
        return Err(EngineError::validation("track name must not be empty"));
    }
    if name.chars().count() > TRACK_NAME_MAX {
        return Err(EngineError::validation(format!(
            "track name longer than {TRACK_NAME_MAX} characters"
        )));
    }

    let mut draft = engine.project.clone();
    let track = draft
        .track_mut(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    track.name = name;
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn set_chain_collapsed(
    engine: &mut Engine,
    p: SetChainCollapsed,
) -> Result<Value, EngineError> {
    let mut draft = engine.project.clone();
    let track = draft
        .track_mut(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    track.chain_collapsed = p.collapsed;
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn set_chain_enabled(
    engine: &mut Engine,
    p: SetChainEnabled,
) -> Result<Value, EngineError> {
    let mut draft = engine.project.clone();
    let track = draft
        .track_mut(p.track_id)
        .ok_or_else(|| EngineError::not_found(format!("track {}", p.track_id)))?;
    track.chain_enabled = p.enabled;

    // a disabled chain bypasses every node on the track
    for node in &mut draft.nodes {
        if node.track_id == p.track_id {
            node.bypassed = !p.enabled;
        }
    }
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) fn require_track(project: &Project, track_id: u32) -> Result<(), EngineError> {
    if project.track(track_id).is_none() {
        return Err(EngineError::not_found(format!("track {track_id}")));
    }
    Ok(())
}

/// Shift every id strictly above `pivot` up by one, across tracks,
/// nodes, and strips, opening the slot `pivot + 1`.
fn shift_ids_up(draft: &mut Project, pivot: u32) {
    for track in &mut draft.playlist {
        if track.track_id > pivot {
            track.track_id += 1;
        }
    }
    for node in &mut draft.nodes {
        if node.track_id > pivot {
            node.track_id += 1;
        }
    }
    for strip in &mut draft.mixer {
        if strip.track_id > pivot {
            strip.track_id += 1;
        }
    }
}

/// Reassign ids to match playlist order, carrying nodes and strips along.
fn remap_to_playlist_order(draft: &mut Project) {
    let remap: HashMap<u32, u32> = draft
        .playlist
        .iter()
        .enumerate()
        .map(|(index, track)| (track.track_id, index as u32 + 1))
        .collect();
    for track in &mut draft.playlist {
        track.track_id = remap[&track.track_id];
    }
    for node in &mut draft.nodes {
        if let Some(&id) = remap.get(&node.track_id) {
            node.track_id = id;
        }
    }
    for strip in &mut draft.mixer {
        if let Some(&id) = remap.get(&strip.track_id) {
            strip.track_id = id;
        }
    }
}

/// Remove a set of tracks with everything they own, then densify the
/// surviving ids.
fn drop_tracks(draft: &mut Project, doomed: &HashSet<u32>) {
    draft.playlist.retain(|t| !doomed.contains(&t.track_id));
    draft.nodes.retain(|n| !doomed.contains(&n.track_id));
    draft.mixer.retain(|s| !doomed.contains(&s.track_id));
    remap_to_playlist_order(draft);
}
