//! The canonical normalization pass.
//!
//! `normalize` is total and idempotent: it accepts any document shape the
//! serde layer produced and leaves it satisfying every structural
//! invariant. Every load and every mutation ends with this pass, so the
//! rest of the system can assume contiguous track ids, dense plugin
//! indexes, one strip per track, grid-aligned positions, and in-range
//! numerics.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::grid::{
    clamp_finite, quantize, BAR_WIDTH_MAX, BAR_WIDTH_MIN, BPM_MAX, BPM_MIN, GRID_STEP, MAX_PEAKS,
    PATTERN_STEPS_MAX, PATTERN_STEPS_MIN, PITCH_MAX, SWING_MAX, TRACK_NAME_MAX, VIEW_BARS_MAX,
    VIEW_BARS_MIN, VOLUME_MAX, VOLUME_MIN,
};
use crate::project::{
    fresh_id, Clip, DrumStep, FileClip, MixerStrip, Pattern, PatternData, Project, Track,
    DEFAULT_STRIP_VOLUME, SCHEMA_VERSION,
};

/// Normalize a project in place. Safe to call on any document; calling it
/// twice is the same as calling it once.
pub fn normalize(project: &mut Project) {
    normalize_header(project);
    let remap = densify_tracks(project);
    remap_owners(project, &remap);
    ensure_nonempty(project);
    normalize_tracks(project);
    normalize_patterns(project);
    synthesize_stub_patterns(project);
    normalize_nodes(project);
    normalize_mixer(project);
}

fn normalize_header(project: &mut Project) {
    if project.version.trim().is_empty() {
        project.version = SCHEMA_VERSION.to_string();
    }
    let name = project.project_name.trim();
    project.project_name = if name.is_empty() {
        "Untitled".to_string()
    } else {
        name.to_string()
    };
    project.bpm = clamp_finite(project.bpm, BPM_MIN, BPM_MAX, 128.0);
    project.playlist_view_bars = project
        .playlist_view_bars
        .clamp(VIEW_BARS_MIN, VIEW_BARS_MAX);
    project.playlist_bar_width =
        clamp_finite(project.playlist_bar_width, BAR_WIDTH_MIN, BAR_WIDTH_MAX, 92.0);
}

/// Reassign track ids to the contiguous prefix `1..=N` in playlist order,
/// returning the old-id -> new-id mapping.
fn densify_tracks(project: &mut Project) -> HashMap<u32, u32> {
    let mut remap = HashMap::new();
    for (index, track) in project.playlist.iter_mut().enumerate() {
        let new_id = index as u32 + 1;
        remap.entry(track.track_id).or_insert(new_id);
        track.track_id = new_id;
    }
    remap
}

/// Follow the track remapping into plugin nodes and mixer strips, dropping
/// entries whose track no longer exists.
fn remap_owners(project: &mut Project, remap: &HashMap<u32, u32>) {
    project.nodes.retain_mut(|node| match remap.get(&node.track_id) {
        Some(&new_id) => {
            node.track_id = new_id;
            true
        }
        None => false,
    });
    project.mixer.retain_mut(|strip| match remap.get(&strip.track_id) {
        Some(&new_id) => {
            strip.track_id = new_id;
            true
        }
        None => false,
    });
}

fn ensure_nonempty(project: &mut Project) {
    if project.playlist.is_empty() {
        project.playlist.push(Track::new(1, "Track 1"));
    }
}

fn normalize_tracks(project: &mut Project) {
    for track in &mut project.playlist {
        let name = track.name.trim();
        track.name = if name.is_empty() {
            format!("Track {}", track.track_id)
        } else if name.chars().count() > TRACK_NAME_MAX {
            name.chars().take(TRACK_NAME_MAX).collect()
        } else {
            name.to_string()
        };

        let mut seen = HashSet::new();
        for clip in &mut track.clips {
            if clip.id.is_empty() || !seen.insert(clip.id.clone()) {
                clip.id = fresh_id();
                seen.insert(clip.id.clone());
            }

            clip.start = if clip.start.is_finite() && clip.start > 0.0 {
                quantize(clip.start)
            } else {
                0.0
            };
            clip.length = if clip.length.is_finite() && clip.length > 0.0 {
                quantize(clip.length).max(GRID_STEP)
            } else {
                GRID_STEP
            };

            if let Some(file) = clip_file_mut(clip) {
                file.format = file.format.trim().to_ascii_lowercase();
                if let Some(peaks) = &mut file.peaks {
                    peaks.truncate(MAX_PEAKS);
                    for peak in peaks.iter_mut() {
                        *peak = clamp_finite(*peak, 0.0, 1.0, 0.0);
                    }
                }
                if let Some(duration) = file.duration {
                    if !duration.is_finite() || duration <= 0.0 {
                        file.duration = None;
                    }
                }
            }
        }
    }
}

fn clip_file_mut(clip: &mut Clip) -> Option<&mut FileClip> {
    match &mut clip.content {
        crate::project::ClipContent::File(file) => Some(file),
        crate::project::ClipContent::Pattern { .. } => None,
    }
}

fn normalize_patterns(project: &mut Project) {
    let mut seen = HashSet::new();
    project.patterns.retain_mut(|pattern| {
        if pattern.id.is_empty() {
            pattern.id = fresh_id();
        }
        if !seen.insert(pattern.id.clone()) {
            return false;
        }

        pattern.length = pattern.length.clamp(PATTERN_STEPS_MIN, PATTERN_STEPS_MAX);
        pattern.swing = clamp_finite(pattern.swing, 0.0, SWING_MAX, 0.0);

        match &mut pattern.data {
            PatternData::Drum { steps } => {
                // last write wins for duplicate (lane, step) cells
                let mut cells: BTreeMap<(String, u32), f64> = BTreeMap::new();
                for step in steps.drain(..) {
                    if step.lane.is_empty() || step.step >= PATTERN_STEPS_MAX {
                        continue;
                    }
                    if !step.velocity.is_finite() || step.velocity <= 0.0 {
                        continue;
                    }
                    cells.insert((step.lane, step.step), step.velocity.min(1.0));
                }
                *steps = cells
                    .into_iter()
                    .map(|((lane, step), velocity)| DrumStep {
                        lane,
                        step,
                        velocity,
                    })
                    .collect();
            }
            PatternData::Midi { notes } => {
                let mut ids = HashSet::new();
                for note in notes.iter_mut() {
                    if note.id.is_empty() || !ids.insert(note.id.clone()) {
                        note.id = fresh_id();
                        ids.insert(note.id.clone());
                    }
                    note.start = if note.start.is_finite() && note.start > 0.0 {
                        quantize(note.start)
                    } else {
                        0.0
                    };
                    note.length = if note.length.is_finite() && note.length > 0.0 {
                        quantize(note.length).max(GRID_STEP)
                    } else {
                        GRID_STEP
                    };
                    note.pitch = note.pitch.min(PITCH_MAX);
                    note.velocity = clamp_finite(note.velocity, 0.0, 1.0, 1.0);
                }
            }
        }

        true
    });
}

/// Any clip that references a pattern id with no matching pattern gets a
/// silent stub so the reference stays resolvable. Deliberate deletion
/// cascades drop the clips *before* normalization runs.
fn synthesize_stub_patterns(project: &mut Project) {
    let known: HashSet<String> = project.patterns.iter().map(|p| p.id.clone()).collect();
    let mut missing: Vec<String> = Vec::new();
    for track in &project.playlist {
        for clip in &track.clips {
            if let Some(pattern_id) = clip.pattern_id() {
                if !known.contains(pattern_id) && !missing.iter().any(|m| m == pattern_id) {
                    missing.push(pattern_id.to_string());
                }
            }
        }
    }
    for id in missing {
        project.patterns.push(Pattern::drum(id, 16));
    }
}

fn normalize_nodes(project: &mut Project) {
    let mut seen = HashSet::new();
    for node in &mut project.nodes {
        if node.id.is_empty() || !seen.insert(node.id.clone()) {
            node.id = fresh_id();
            seen.insert(node.id.clone());
        }
        if node.node_type.trim().is_empty() {
            node.node_type = "vst_instrument".to_string();
        }
        if node.name.trim().is_empty() {
            node.name = node.uid.clone();
        }

        for spec in &mut node.parameters {
            if !spec.min.is_finite() {
                spec.min = 0.0;
            }
            if !spec.max.is_finite() || spec.max < spec.min {
                spec.max = spec.min.max(1.0);
            }
            spec.value = clamp_finite(spec.value, spec.min, spec.max, spec.min);
        }

        let specs: Vec<(String, f64, f64)> = node
            .parameters
            .iter()
            .map(|p| (p.id.clone(), p.min, p.max))
            .collect();
        node.values.retain(|_, v| v.is_finite());
        for (id, min, max) in specs {
            if let Some(v) = node.values.get_mut(&id) {
                *v = v.clamp(min, max);
            }
        }
    }

    // dense 0..K-1 chain positions per track, stable on current order
    let mut order: Vec<usize> = (0..project.nodes.len()).collect();
    order.sort_by_key(|&i| {
        (
            project.nodes[i].track_id,
            project.nodes[i].plugin_index,
            i,
        )
    });
    let mut next: HashMap<u32, u32> = HashMap::new();
    for i in order {
        let node = &mut project.nodes[i];
        let slot = next.entry(node.track_id).or_insert(0);
        node.plugin_index = *slot;
        *slot += 1;
    }
}

fn normalize_mixer(project: &mut Project) {
    let tracks: HashSet<u32> = project.playlist.iter().map(|t| t.track_id).collect();

    let mut seen = HashSet::new();
    project
        .mixer
        .retain(|strip| tracks.contains(&strip.track_id) && seen.insert(strip.track_id));

    for strip in &mut project.mixer {
        strip.volume = clamp_finite(strip.volume, VOLUME_MIN, VOLUME_MAX, DEFAULT_STRIP_VOLUME);
        strip.pan = clamp_finite(strip.pan, -1.0, 1.0, 0.0);
    }

    for track in &project.playlist {
        if !seen.contains(&track.track_id) {
            project.mixer.push(MixerStrip::new(track.track_id));
        }
    }

    project.mixer.sort_by_key(|s| s.track_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Clip, ClipContent, DrumStep, FileClip, FileKind, MidiNote, PluginNode};
    use pretty_assertions::assert_eq;

    fn messy_project() -> Project {
        let mut p = Project::empty("  Messy  ");
        p.bpm = 9999.0;
        p.playlist_view_bars = 2;
        p.playlist_bar_width = 1.0;

        let mut t1 = Track::new(3, "");
        t1.clips.push(Clip::pattern("c1", "ghost", 0.37, 0.0));
        let mut t2 = Track::new(9, "a name that is much longer than allowed");
        t2.clips.push(Clip::pattern("c1", "ghost", -2.0, 1.01));
        p.playlist.push(t1);
        p.playlist.push(t2);

        p.nodes.push(PluginNode::new("vendor.synth", 9, 7));
        p.nodes.push(PluginNode::new("vendor.eq", 42, 0));

        p.mixer.push(MixerStrip {
            track_id: 3,
            volume: 5.0,
            pan: -7.0,
            mute: false,
            solo: false,
            record_armed: false,
        });
        p.mixer.push(MixerStrip::new(17));
        p
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut once = messy_project();
        normalize(&mut once);
        let mut twice = once.clone();
        normalize(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn densifies_track_ids_and_remaps_owners() {
        let mut p = messy_project();
        normalize(&mut p);

        let ids: Vec<u32> = p.playlist.iter().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![1, 2]);

        // node on old track 9 follows it to id 2; node on unknown track 42 is gone
        assert_eq!(p.nodes.len(), 1);
        assert_eq!(p.nodes[0].track_id, 2);
        assert_eq!(p.nodes[0].plugin_index, 0);

        // orphan strip dropped, both tracks covered, clamped into range
        let strip_ids: Vec<u32> = p.mixer.iter().map(|s| s.track_id).collect();
        assert_eq!(strip_ids, vec![1, 2]);
        assert_eq!(p.mixer[0].volume, VOLUME_MAX);
        assert_eq!(p.mixer[0].pan, -1.0);
    }

    #[test]
    fn quantizes_and_repairs_clips() {
        let mut p = messy_project();
        normalize(&mut p);

        let c1 = &p.playlist[0].clips[0];
        assert_eq!(c1.start, 0.375);
        assert_eq!(c1.length, GRID_STEP);

        let c2 = &p.playlist[1].clips[0];
        assert_eq!(c2.start, 0.0);
        assert_eq!(c2.length, 1.0);
        // duplicate id across tracks is fine; ids are unique per track
        assert_eq!(c1.id, "c1");
        assert_eq!(c2.id, "c1");
    }

    #[test]
    fn synthesizes_stub_for_dangling_pattern_ref() {
        let mut p = messy_project();
        normalize(&mut p);
        let stub = p.pattern("ghost").expect("stub pattern");
        assert!(stub.is_drum());
        assert_eq!(stub.length, 16);
    }

    #[test]
    fn empty_playlist_gets_default_track_and_strip() {
        let mut p = Project::empty("Empty");
        normalize(&mut p);
        assert_eq!(p.playlist.len(), 1);
        assert_eq!(p.playlist[0].track_id, 1);
        assert_eq!(p.mixer.len(), 1);
        assert_eq!(p.mixer[0].volume, DEFAULT_STRIP_VOLUME);
    }

    #[test]
    fn drum_steps_dedupe_last_write_wins() {
        let mut p = Project::empty("Drums");
        let mut pat = Pattern::drum("p1", 200);
        if let PatternData::Drum { steps } = &mut pat.data {
            steps.push(DrumStep {
                lane: "kick".into(),
                step: 0,
                velocity: 0.5,
            });
            steps.push(DrumStep {
                lane: "kick".into(),
                step: 0,
                velocity: 0.9,
            });
            steps.push(DrumStep {
                lane: "kick".into(),
                step: 500,
                velocity: 0.9,
            });
            steps.push(DrumStep {
                lane: "kick".into(),
                step: 1,
                velocity: 0.0,
            });
            steps.push(DrumStep {
                lane: "kick".into(),
                step: 2,
                velocity: 3.0,
            });
        }
        p.patterns.push(pat);
        normalize(&mut p);

        assert_eq!(p.patterns[0].length, PATTERN_STEPS_MAX);
        let PatternData::Drum { steps } = &p.patterns[0].data else {
            panic!("expected drum pattern");
        };
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step, 0);
        assert_eq!(steps[0].velocity, 0.9);
        assert_eq!(steps[1].step, 2);
        assert_eq!(steps[1].velocity, 1.0);
    }

    #[test]
    fn midi_notes_are_quantized_and_bounded() {
        let mut p = Project::empty("Midi");
        let mut pat = Pattern::midi("m1", 16);
        if let PatternData::Midi { notes } = &mut pat.data {
            notes.push(MidiNote {
                id: "n1".into(),
                start: 0.33,
                length: -1.0,
                pitch: 200,
                velocity: 4.0,
            });
            notes.push(MidiNote {
                id: "n1".into(),
                start: 1.0,
                length: 1.0,
                pitch: 60,
                velocity: 0.5,
            });
        }
        p.patterns.push(pat);
        normalize(&mut p);

        let PatternData::Midi { notes } = &p.patterns[0].data else {
            panic!("expected midi pattern");
        };
        assert_eq!(notes[0].start, 0.3125);
        assert_eq!(notes[0].length, GRID_STEP);
        assert_eq!(notes[0].pitch, PITCH_MAX);
        assert_eq!(notes[0].velocity, 1.0);
        assert_ne!(notes[0].id, notes[1].id);
    }

    #[test]
    fn file_clip_metadata_is_repaired() {
        let mut p = Project::empty("Files");
        let mut t = Track::new(1, "Audio");
        t.clips.push(Clip {
            id: "a1".into(),
            start: 0.0,
            length: 8.0,
            content: ClipContent::File(FileClip {
                kind: FileKind::Audio,
                name: "Loop.WAV".into(),
                format: " WAV ".into(),
                mime: None,
                size: Some(1024),
                duration: Some(-3.0),
                peaks: Some(vec![2.0, -1.0, 0.5]),
                source_path: None,
            }),
        });
        p.playlist.push(t);
        normalize(&mut p);

        let file = p.playlist[0].clips[0].file().unwrap();
        assert_eq!(file.format, "wav");
        assert_eq!(file.duration, None);
        assert_eq!(file.peaks.as_deref(), Some(&[1.0, 0.0, 0.5][..]));
    }

    #[test]
    fn plugin_indexes_densify_per_track() {
        let mut p = Project::empty("Chains");
        p.playlist.push(Track::new(1, "A"));
        p.playlist.push(Track::new(2, "B"));
        for (track, index) in [(1u32, 5u32), (1, 2), (2, 9), (1, 2)] {
            p.nodes.push(PluginNode::new("uid", track, index));
        }
        normalize(&mut p);

        let chain1: Vec<u32> = p.chain(1).iter().map(|n| n.plugin_index).collect();
        assert_eq!(chain1, vec![0, 1, 2]);
        let chain2: Vec<u32> = p.chain(2).iter().map(|n| n.plugin_index).collect();
        assert_eq!(chain2, vec![0]);
    }
}
