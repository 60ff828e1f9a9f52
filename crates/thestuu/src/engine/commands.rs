//! The closed command surface of the mutation engine.
//!
//! Clients speak `{cmd, payload}` pairs; `Command::from_wire` is the one
//! mapping table from wire names to typed commands, so adding a command
//! means adding a variant, a table row, and an executor arm. Payloads
//! deserialize through serde, which is where missing/ill-typed fields
//! are rejected.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use stuumodel::Pattern;

use super::error::EngineError;

#[derive(Debug, Clone)]
pub enum Command {
    // transport
    Play,
    Pause,
    Stop,
    GetTransport,
    SetBpm(SetBpm),
    Seek(Seek),

    // track lifecycle
    CreateTrack,
    InsertTrack(InsertTrack),
    ReorderTrack(ReorderTrack),
    DeleteTrack(TrackRef),
    BulkDeleteTracks(BulkDeleteTracks),
    DuplicateTrack(TrackRef),
    SetTrackName(SetTrackName),
    SetChainCollapsed(SetChainCollapsed),
    SetChainEnabled(SetChainEnabled),

    // mixer
    SetVolume(SetVolume),
    SetPan(SetPan),
    SetMute(SetMute),
    SetSolo(SetSolo),
    SetRecordArm(SetRecordArm),

    // patterns
    CreatePattern(CreatePattern),
    UpdatePattern(UpdatePattern),
    UpdateStep(UpdateStep),
    DeletePattern(PatternRef),
    MoveMidiNote(MoveMidiNote),

    // clips
    CreateClip(CreateClip),
    ImportFile(ImportFile),
    MoveClip(MoveClip),
    ResizeClip(ResizeClip),
    DeleteClip(ClipRef),

    // plugins
    ScanPlugins,
    AddPlugin(AddPlugin),
    RemovePlugin(NodeRef),
    ReorderPlugins(ReorderPlugins),
    SetBypass(SetBypass),
    SetParameter(SetParameter),

    // project i/o
    NewProject(NewProject),
    LoadProject(LoadProject),
    SaveProject(SaveProject),
    ListProjects,
    UpdateView(UpdateView),
}

impl Command {
    /// Map a wire-level `{cmd, payload}` pair to a typed command.
    pub fn from_wire(cmd: &str, payload: Value) -> Result<Self, EngineError> {
        Ok(match cmd {
            "transport.play" => Command::Play,
            "transport.pause" => Command::Pause,
            "transport.stop" => Command::Stop,
            "transport.get-state" => Command::GetTransport,
            "transport.set-bpm" => Command::SetBpm(params(payload)?),
            "transport.seek" => Command::Seek(params(payload)?),

            "track.create" => Command::CreateTrack,
            "track.insert" => Command::InsertTrack(params(payload)?),
            "track.reorder" => Command::ReorderTrack(params(payload)?),
            "track.delete" => Command::DeleteTrack(params(payload)?),
            "track.bulk-delete" => Command::BulkDeleteTracks(params(payload)?),
            "track.duplicate" => Command::DuplicateTrack(params(payload)?),
            "track.set-name" => Command::SetTrackName(params(payload)?),
            "track.set-chain-collapsed" => Command::SetChainCollapsed(params(payload)?),
            "track.set-chain-enabled" => Command::SetChainEnabled(params(payload)?),

            "mixer.set-volume" => Command::SetVolume(params(payload)?),
            "mixer.set-pan" => Command::SetPan(params(payload)?),
            "mixer.set-mute" => Command::SetMute(params(payload)?),
            "mixer.set-solo" => Command::SetSolo(params(payload)?),
            "mixer.set-record-arm" => Command::SetRecordArm(params(payload)?),

            "pattern.create" => Command::CreatePattern(params(payload)?),
            "pattern.update" => Command::UpdatePattern(params(payload)?),
            "pattern.update-step" => Command::UpdateStep(params(payload)?),
            "pattern.delete" => Command::DeletePattern(params(payload)?),
            "pattern.move-midi-note" => Command::MoveMidiNote(params(payload)?),

            "clip.create" => Command::CreateClip(params(payload)?),
            "clip.import-file" => Command::ImportFile(params(payload)?),
            "clip.move" => Command::MoveClip(params(payload)?),
            "clip.resize" => Command::ResizeClip(params(payload)?),
            "clip.delete" => Command::DeleteClip(params(payload)?),

            "plugin.scan" => Command::ScanPlugins,
            "plugin.add" => Command::AddPlugin(params(payload)?),
            "plugin.remove" => Command::RemovePlugin(params(payload)?),
            "plugin.reorder" => Command::ReorderPlugins(params(payload)?),
            "plugin.set-bypass" => Command::SetBypass(params(payload)?),
            "plugin.set-parameter" => Command::SetParameter(params(payload)?),

            "project.new" => Command::NewProject(params(payload)?),
            "project.load" => Command::LoadProject(params(payload)?),
            "project.save" => Command::SaveProject(params(payload)?),
            "project.list" => Command::ListProjects,
            "project.update-view" => Command::UpdateView(params(payload)?),

            other => {
                return Err(EngineError::validation(format!("unknown command: {other}")))
            }
        })
    }
}

fn params<T: DeserializeOwned>(payload: Value) -> Result<T, EngineError> {
    let payload = if payload.is_null() {
        Value::Object(Default::default())
    } else {
        payload
    };
    serde_json::from_value(payload)
        .map_err(|e| EngineError::validation(format!("invalid payload: {e}")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetBpm {
    pub bpm: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Seek {
    #[serde(default)]
    pub position_beats: Option<f64>,
    #[serde(default)]
    pub position_bars: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackRef {
    pub track_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertTrack {
    pub after_track_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderTrack {
    pub track_id: u32,
    pub to_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteTracks {
    pub track_ids: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetTrackName {
    pub track_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetChainCollapsed {
    pub track_id: u32,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetChainEnabled {
    pub track_id: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetVolume {
    pub track_id: u32,
    pub volume: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPan {
    pub track_id: u32,
    pub pan: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetMute {
    pub track_id: u32,
    pub mute: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetSolo {
    pub track_id: u32,
    pub solo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetRecordArm {
    pub track_id: u32,
    pub record_armed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePattern {
    pub pattern: Pattern,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePattern {
    pub pattern_id: String,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub swing: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStep {
    pub pattern_id: String,
    pub lane: String,
    pub step: u32,
    pub velocity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternRef {
    pub pattern_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveMidiNote {
    pub pattern_id: String,
    pub note_id: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub pitch: Option<u8>,
    #[serde(default)]
    pub velocity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClip {
    pub track_id: u32,
    pub pattern_id: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportFile {
    pub track_id: u32,
    pub name: String,
    pub format: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub peaks: Option<Vec<f64>>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveClip {
    pub track_id: u32,
    pub clip_id: String,
    pub start: f64,
    #[serde(default)]
    pub to_track_id: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResizeClip {
    pub track_id: u32,
    pub clip_id: String,
    pub length: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipRef {
    pub track_id: u32,
    pub clip_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddPlugin {
    pub track_id: u32,
    pub plugin_uid: String,
    #[serde(default)]
    pub insert_index: Option<u32>,
    #[serde(default)]
    pub bypassed: Option<bool>,
}

/// A node addressed either by id or by `(track_id, plugin_index)`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeRef {
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub track_id: Option<u32>,
    #[serde(default)]
    pub plugin_index: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderPlugins {
    pub track_id: u32,
    pub from_index: u32,
    pub to_index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetBypass {
    #[serde(flatten)]
    pub node: NodeRef,
    pub bypassed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetParameter {
    pub track_id: u32,
    pub plugin_index: u32,
    pub param_id: String,
    pub value: f64,
    #[serde(default)]
    pub node_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadProject {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveProject {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub project: Option<stuumodel::Project>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateView {
    #[serde(default)]
    pub playlist_view_bars: Option<u32>,
    #[serde(default)]
    pub playlist_bar_width: Option<f64>,
    #[serde(default)]
    pub playlist_show_track_nodes: Option<bool>,
}
