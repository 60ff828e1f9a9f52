//! Invariant checks over a (normally already normalized) project.
//!
//! `validate` never mutates; it reports every violation it finds so a
//! failed save can surface the full list at once.

use std::collections::HashSet;

use thiserror::Error;

use crate::grid::{
    is_grid_aligned, BAR_WIDTH_MAX, BAR_WIDTH_MIN, BPM_MAX, BPM_MIN, MAX_PEAKS, PATTERN_STEPS_MAX,
    PATTERN_STEPS_MIN, PITCH_MAX, SWING_MAX, TRACK_NAME_MAX, VIEW_BARS_MAX, VIEW_BARS_MIN,
    VOLUME_MAX, VOLUME_MIN,
};
use crate::project::{PatternData, Project, SOURCE_FORMATS};

/// A project that failed validation, with every violation found.
#[derive(Debug, Error)]
#[error("invalid project: {}", errors.join("; "))]
pub struct ValidateError {
    pub errors: Vec<String>,
}

/// Check every invariant, returning a list of human-readable violations.
/// An empty list means the project is valid.
pub fn validate(project: &Project) -> Vec<String> {
    let mut errors = Vec::new();

    if !(BPM_MIN..=BPM_MAX).contains(&project.bpm) {
        errors.push(format!("bpm {} outside [{BPM_MIN}, {BPM_MAX}]", project.bpm));
    }
    if !(VIEW_BARS_MIN..=VIEW_BARS_MAX).contains(&project.playlist_view_bars) {
        errors.push(format!(
            "playlist_view_bars {} outside [{VIEW_BARS_MIN}, {VIEW_BARS_MAX}]",
            project.playlist_view_bars
        ));
    }
    if !(BAR_WIDTH_MIN..=BAR_WIDTH_MAX).contains(&project.playlist_bar_width) {
        errors.push(format!(
            "playlist_bar_width {} outside [{BAR_WIDTH_MIN}, {BAR_WIDTH_MAX}]",
            project.playlist_bar_width
        ));
    }

    check_tracks(project, &mut errors);
    check_patterns(project, &mut errors);
    check_nodes(project, &mut errors);
    check_mixer(project, &mut errors);

    errors
}

/// Validate and convert the violation list into an error.
pub fn ensure_valid(project: &Project) -> Result<(), ValidateError> {
    let errors = validate(project);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError { errors })
    }
}

fn check_tracks(project: &Project, errors: &mut Vec<String>) {
    if project.playlist.is_empty() {
        errors.push("project has no tracks".to_string());
    }

    for (index, track) in project.playlist.iter().enumerate() {
        let expected = index as u32 + 1;
        if track.track_id != expected {
            errors.push(format!(
                "track at position {index} has id {} (expected {expected})",
                track.track_id
            ));
        }
        if track.name.is_empty() {
            errors.push(format!("track {} has an empty name", track.track_id));
        }
        if track.name.chars().count() > TRACK_NAME_MAX {
            errors.push(format!(
                "track {} name exceeds {TRACK_NAME_MAX} characters",
                track.track_id
            ));
        }

        let mut clip_ids = HashSet::new();
        for clip in &track.clips {
            if !clip_ids.insert(clip.id.as_str()) {
                errors.push(format!(
                    "track {} has duplicate clip id {}",
                    track.track_id, clip.id
                ));
            }
            if !clip.start.is_finite() || clip.start < 0.0 || !is_grid_aligned(clip.start) {
                errors.push(format!(
                    "clip {} start {} is not a non-negative grid position",
                    clip.id, clip.start
                ));
            }
            if !clip.length.is_finite() || clip.length <= 0.0 || !is_grid_aligned(clip.length) {
                errors.push(format!(
                    "clip {} length {} is not a positive grid length",
                    clip.id, clip.length
                ));
            }
            if let Some(pattern_id) = clip.pattern_id() {
                if project.pattern(pattern_id).is_none() {
                    errors.push(format!(
                        "clip {} references missing pattern {pattern_id}",
                        clip.id
                    ));
                }
            }
            if let Some(file) = clip.file() {
                if !SOURCE_FORMATS.contains(&file.format.as_str()) {
                    errors.push(format!(
                        "clip {} has unsupported source format {:?}",
                        clip.id, file.format
                    ));
                }
                if let Some(duration) = file.duration {
                    if !duration.is_finite() || duration <= 0.0 {
                        errors.push(format!("clip {} has non-positive duration", clip.id));
                    }
                }
                if let Some(peaks) = &file.peaks {
                    if peaks.len() > MAX_PEAKS {
                        errors.push(format!("clip {} has more than {MAX_PEAKS} peaks", clip.id));
                    }
                    if peaks.iter().any(|p| !(0.0..=1.0).contains(p)) {
                        errors.push(format!("clip {} has peaks outside [0, 1]", clip.id));
                    }
                }
            }
        }
    }
}

fn check_patterns(project: &Project, errors: &mut Vec<String>) {
    let mut ids = HashSet::new();
    for pattern in &project.patterns {
        if !ids.insert(pattern.id.as_str()) {
            errors.push(format!("duplicate pattern id {}", pattern.id));
        }
        if !(PATTERN_STEPS_MIN..=PATTERN_STEPS_MAX).contains(&pattern.length) {
            errors.push(format!(
                "pattern {} length {} outside [{PATTERN_STEPS_MIN}, {PATTERN_STEPS_MAX}]",
                pattern.id, pattern.length
            ));
        }
        if !(0.0..=SWING_MAX).contains(&pattern.swing) {
            errors.push(format!(
                "pattern {} swing {} outside [0, {SWING_MAX}]",
                pattern.id, pattern.swing
            ));
        }

        match &pattern.data {
            PatternData::Drum { steps } => {
                let mut cells = HashSet::new();
                for step in steps {
                    if !cells.insert((step.lane.as_str(), step.step)) {
                        errors.push(format!(
                            "pattern {} has duplicate cell ({}, {})",
                            pattern.id, step.lane, step.step
                        ));
                    }
                    if !step.velocity.is_finite()
                        || step.velocity <= 0.0
                        || step.velocity > 1.0
                    {
                        errors.push(format!(
                            "pattern {} cell ({}, {}) velocity {} outside (0, 1]",
                            pattern.id, step.lane, step.step, step.velocity
                        ));
                    }
                }
            }
            PatternData::Midi { notes } => {
                let mut note_ids = HashSet::new();
                for note in notes {
                    if !note_ids.insert(note.id.as_str()) {
                        errors.push(format!(
                            "pattern {} has duplicate note id {}",
                            pattern.id, note.id
                        ));
                    }
                    if !note.start.is_finite() || note.start < 0.0 || !is_grid_aligned(note.start)
                    {
                        errors.push(format!(
                            "note {} start {} is not a non-negative grid position",
                            note.id, note.start
                        ));
                    }
                    if !note.length.is_finite()
                        || note.length <= 0.0
                        || !is_grid_aligned(note.length)
                    {
                        errors.push(format!(
                            "note {} length {} is not a positive grid length",
                            note.id, note.length
                        ));
                    }
                    if note.pitch > PITCH_MAX {
                        errors.push(format!("note {} pitch {} above {PITCH_MAX}", note.id, note.pitch));
                    }
                    if !(0.0..=1.0).contains(&note.velocity) {
                        errors.push(format!(
                            "note {} velocity {} outside [0, 1]",
                            note.id, note.velocity
                        ));
                    }
                }
            }
        }
    }
}

fn check_nodes(project: &Project, errors: &mut Vec<String>) {
    let mut ids = HashSet::new();
    for node in &project.nodes {
        if !ids.insert(node.id.as_str()) {
            errors.push(format!("duplicate node id {}", node.id));
        }
        if project.track(node.track_id).is_none() {
            errors.push(format!(
                "node {} belongs to missing track {}",
                node.id, node.track_id
            ));
        }
        if node.values.values().any(|v| !v.is_finite()) {
            errors.push(format!("node {} has a non-finite parameter value", node.id));
        }
    }

    for track in &project.playlist {
        let chain = project.chain(track.track_id);
        let indexes: Vec<u32> = chain.iter().map(|n| n.plugin_index).collect();
        let expected: Vec<u32> = (0..chain.len() as u32).collect();
        if indexes != expected {
            errors.push(format!(
                "track {} plugin indexes {:?} are not dense 0..{}",
                track.track_id,
                indexes,
                chain.len()
            ));
        }
    }
}

fn check_mixer(project: &Project, errors: &mut Vec<String>) {
    let mut covered = HashSet::new();
    for strip in &project.mixer {
        if !covered.insert(strip.track_id) {
            errors.push(format!("duplicate mixer strip for track {}", strip.track_id));
        }
        if project.track(strip.track_id).is_none() {
            errors.push(format!(
                "mixer strip for missing track {}",
                strip.track_id
            ));
        }
        if !(VOLUME_MIN..=VOLUME_MAX).contains(&strip.volume) {
            errors.push(format!(
                "strip {} volume {} outside [{VOLUME_MIN}, {VOLUME_MAX}]",
                strip.track_id, strip.volume
            ));
        }
        if !(-1.0..=1.0).contains(&strip.pan) {
            errors.push(format!(
                "strip {} pan {} outside [-1, 1]",
                strip.track_id, strip.pan
            ));
        }
    }
    for track in &project.playlist {
        if !covered.contains(&track.track_id) {
            errors.push(format!("track {} has no mixer strip", track.track_id));
        }
    }
}
