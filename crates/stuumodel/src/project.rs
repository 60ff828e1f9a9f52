//! The in-memory project document.
//!
//! These types serialize directly to the persisted `.stu` document and to
//! the `state` payload pushed to clients, so field names here are wire
//! names. All cross-entity invariants (contiguous track ids, dense plugin
//! indexes, one strip per track) are enforced by [`crate::normalize`], not
//! by constructors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document schema version written into every project file.
pub const SCHEMA_VERSION: &str = "1.0.0-alpha";

/// Source formats accepted for file-backed clips.
pub const SOURCE_FORMATS: &[&str] = &["wav", "mp3", "flac", "ogg", "aiff", "m4a", "mid", "midi"];

/// Default fader level for a freshly created mixer strip.
pub const DEFAULT_STRIP_VOLUME: f64 = 0.85;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_project_name")]
    pub project_name: String,

    #[serde(default = "default_bpm")]
    pub bpm: f64,

    #[serde(default = "default_view_bars")]
    pub playlist_view_bars: u32,

    #[serde(default = "default_bar_width")]
    pub playlist_bar_width: f64,

    #[serde(default)]
    pub playlist_show_track_nodes: bool,

    #[serde(default)]
    pub nodes: Vec<PluginNode>,

    #[serde(default)]
    pub patterns: Vec<Pattern>,

    #[serde(default)]
    pub playlist: Vec<Track>,

    #[serde(default)]
    pub mixer: Vec<MixerStrip>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_project_name() -> String {
    "Untitled".to_string()
}

fn default_bpm() -> f64 {
    128.0
}

fn default_view_bars() -> u32 {
    32
}

fn default_bar_width() -> f64 {
    92.0
}

fn default_true() -> bool {
    true
}

/// A playlist lane. `track_id` values are a contiguous `1..=N` prefix
/// after normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub track_id: u32,

    pub name: String,

    #[serde(default)]
    pub chain_collapsed: bool,

    #[serde(default = "default_true")]
    pub chain_enabled: bool,

    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(track_id: u32, name: impl Into<String>) -> Self {
        Self {
            track_id,
            name: name.into(),
            chain_collapsed: false,
            chain_enabled: true,
            clips: Vec::new(),
        }
    }

    /// End position (in beats) of the clip that extends furthest.
    pub fn end(&self) -> f64 {
        self.clips
            .iter()
            .map(|c| c.start + c.length)
            .fold(0.0, f64::max)
    }

    pub fn clip(&self, clip_id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }
}

/// A placed segment on a track's timeline. Either binds a pattern or
/// carries imported file metadata, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: String,

    /// Position in beats, grid-quantized.
    pub start: f64,

    /// Duration in beats, grid-quantized, > 0.
    pub length: f64,

    #[serde(flatten)]
    pub content: ClipContent,
}

impl Clip {
    pub fn pattern(id: impl Into<String>, pattern_id: impl Into<String>, start: f64, length: f64) -> Self {
        Self {
            id: id.into(),
            start,
            length,
            content: ClipContent::Pattern {
                pattern_id: pattern_id.into(),
            },
        }
    }

    pub fn pattern_id(&self) -> Option<&str> {
        match &self.content {
            ClipContent::Pattern { pattern_id } => Some(pattern_id),
            ClipContent::File(_) => None,
        }
    }

    pub fn file(&self) -> Option<&FileClip> {
        match &self.content {
            ClipContent::File(file) => Some(file),
            ClipContent::Pattern { .. } => None,
        }
    }
}

/// Clip payload. File clips carry a `type` discriminator on the wire;
/// pattern clips are just `{pattern_id}`, so untagged ordering matters:
/// the file shape is tried first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ClipContent {
    File(FileClip),
    Pattern { pattern_id: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Audio,
    Midi,
}

/// Metadata for a clip imported from a source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileClip {
    #[serde(rename = "type")]
    pub kind: FileKind,

    /// Source filename as shown to the user.
    pub name: String,

    /// Lowercased source extension, one of [`SOURCE_FORMATS`].
    pub format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    /// Source size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Source duration in seconds, > 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Waveform preview, 0..=1 floats, at most [`crate::grid::MAX_PEAKS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peaks: Option<Vec<f64>>,

    /// Absolute path the backend can stream the source from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

/// A reusable drum grid or MIDI sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    pub id: String,

    /// Length in steps, 1..=128.
    pub length: u32,

    /// Swing amount, 0.0..=0.95.
    #[serde(default)]
    pub swing: f64,

    #[serde(flatten)]
    pub data: PatternData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternData {
    Drum {
        #[serde(default)]
        steps: Vec<DrumStep>,
    },
    Midi {
        #[serde(default)]
        notes: Vec<MidiNote>,
    },
}

impl Pattern {
    pub fn drum(id: impl Into<String>, length: u32) -> Self {
        Self {
            id: id.into(),
            length,
            swing: 0.0,
            data: PatternData::Drum { steps: Vec::new() },
        }
    }

    pub fn midi(id: impl Into<String>, length: u32) -> Self {
        Self {
            id: id.into(),
            length,
            swing: 0.0,
            data: PatternData::Midi { notes: Vec::new() },
        }
    }

    pub fn is_drum(&self) -> bool {
        matches!(self.data, PatternData::Drum { .. })
    }
}

/// One cell of a drum grid. `(lane, step)` pairs are unique within a
/// pattern; velocity is in `(0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrumStep {
    pub lane: String,
    pub step: u32,
    pub velocity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MidiNote {
    pub id: String,

    /// Position in beats, grid-quantized.
    pub start: f64,

    /// Duration in beats, grid-quantized, > 0.
    pub length: f64,

    /// MIDI pitch, 0..=127.
    pub pitch: u8,

    /// Normalized velocity, 0..=1.
    pub velocity: f64,
}

/// One stage in a track's plugin chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginNode {
    pub id: String,

    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,

    /// Display name reported by the backend (falls back to the uid).
    pub name: String,

    /// Plugin identifier understood by the backend.
    pub uid: String,

    pub track_id: u32,

    /// Dense per-track chain position, 0..K-1.
    pub plugin_index: u32,

    #[serde(default)]
    pub bypassed: bool,

    /// Parameter schema reported by the backend. `value` holds the
    /// parameter's default.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,

    /// Current parameter values keyed by parameter id.
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

fn default_node_type() -> String {
    "vst_instrument".to_string()
}

impl PluginNode {
    pub fn new(uid: impl Into<String>, track_id: u32, plugin_index: u32) -> Self {
        let uid = uid.into();
        Self {
            id: fresh_id(),
            node_type: default_node_type(),
            name: uid.clone(),
            uid,
            track_id,
            plugin_index,
            bypassed: false,
            parameters: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn param(&self, param_id: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.id == param_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub id: String,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub value: f64,
}

/// Per-track level/pan/mute/solo/arm state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixerStrip {
    pub track_id: u32,

    pub volume: f64,

    #[serde(default)]
    pub pan: f64,

    #[serde(default)]
    pub mute: bool,

    #[serde(default)]
    pub solo: bool,

    #[serde(default)]
    pub record_armed: bool,
}

impl MixerStrip {
    pub fn new(track_id: u32) -> Self {
        Self {
            track_id,
            volume: DEFAULT_STRIP_VOLUME,
            pan: 0.0,
            mute: false,
            solo: false,
            record_armed: false,
        }
    }
}

/// A fresh opaque entity id.
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

impl Project {
    /// An empty project shell. Callers almost always want
    /// [`Project::default_project`] or a loaded document instead.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            project_name: name.into(),
            bpm: default_bpm(),
            playlist_view_bars: default_view_bars(),
            playlist_bar_width: default_bar_width(),
            playlist_show_track_nodes: true,
            nodes: Vec::new(),
            patterns: Vec::new(),
            playlist: Vec::new(),
            mixer: Vec::new(),
        }
    }

    /// The project seeded on first run.
    pub fn default_project() -> Self {
        let mut beat = Pattern::drum("welcome-beat", 16);
        if let PatternData::Drum { steps } = &mut beat.data {
            for kick in [0u32, 4, 8, 12] {
                steps.push(DrumStep {
                    lane: "kick".to_string(),
                    step: kick,
                    velocity: 0.9,
                });
            }
            for snare in [4u32, 12] {
                steps.push(DrumStep {
                    lane: "snare".to_string(),
                    step: snare,
                    velocity: 0.8,
                });
            }
            for hat in (0u32..16).step_by(2) {
                steps.push(DrumStep {
                    lane: "hat".to_string(),
                    step: hat,
                    velocity: 0.6,
                });
            }
        }

        let mut drums = Track::new(1, "Drums");
        drums
            .clips
            .push(Clip::pattern("welcome-clip", "welcome-beat", 0.0, 4.0));

        let mut project = Self::empty("Welcome to TheStuu");
        project.patterns.push(beat);
        project.playlist.push(drums);
        project.playlist.push(Track::new(2, "Bass"));
        project.mixer.push(MixerStrip::new(1));
        project.mixer.push(MixerStrip::new(2));
        project
    }

    pub fn track(&self, track_id: u32) -> Option<&Track> {
        self.playlist.iter().find(|t| t.track_id == track_id)
    }

    pub fn track_mut(&mut self, track_id: u32) -> Option<&mut Track> {
        self.playlist.iter_mut().find(|t| t.track_id == track_id)
    }

    pub fn pattern(&self, pattern_id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == pattern_id)
    }

    pub fn pattern_mut(&mut self, pattern_id: &str) -> Option<&mut Pattern> {
        self.patterns.iter_mut().find(|p| p.id == pattern_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&PluginNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn strip_mut(&mut self, track_id: u32) -> Option<&mut MixerStrip> {
        self.mixer.iter_mut().find(|s| s.track_id == track_id)
    }

    /// Nodes on one track in chain order.
    pub fn chain(&self, track_id: u32) -> Vec<&PluginNode> {
        let mut nodes: Vec<&PluginNode> =
            self.nodes.iter().filter(|n| n.track_id == track_id).collect();
        nodes.sort_by_key(|n| n.plugin_index);
        nodes
    }
}
