//! Mutation engine tests without a native backend: every command runs
//! against the local model and the transport clock alone.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use stuuconf::StuuConfig;
use stuumodel::{Project, SCHEMA_VERSION};
use thestuu::engine::Engine;
use thestuu::persistence::{ProjectStore, DEFAULT_PROJECT_FILE};

fn fixture() -> (tempfile::TempDir, Engine) {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = StuuConfig::default();
    config.paths.project_dir = tmp.path().join("projects");
    config.native.enabled = false;

    let store = ProjectStore::new(config.paths.project_dir.clone());
    let (events, _) = broadcast::channel(64);
    let engine = Engine::new(
        Project::default_project(),
        config,
        store,
        None,
        events,
        DEFAULT_PROJECT_FILE,
    );
    (tmp, engine)
}

async fn ok(engine: &mut Engine, cmd: &str, payload: Value) -> Value {
    let ack = engine.execute_wire(cmd, payload).await;
    assert_eq!(ack["ok"], true, "{cmd} failed: {ack}");
    ack
}

async fn fail(engine: &mut Engine, cmd: &str, payload: Value) -> String {
    let ack = engine.execute_wire(cmd, payload).await;
    assert_eq!(ack["ok"], false, "{cmd} unexpectedly succeeded: {ack}");
    ack["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn default_project_passes_validation() {
    let (_tmp, engine) = fixture();
    let project = engine.project();
    assert_eq!(project.version, SCHEMA_VERSION);
    assert_eq!(project.project_name, "Welcome to TheStuu");
    assert!(stuumodel::validate(project).is_empty());
}

#[tokio::test]
async fn create_track_appends_with_default_strip() {
    let (_tmp, mut engine) = fixture();
    let ack = ok(&mut engine, "track.create", Value::Null).await;
    assert_eq!(ack["track_id"], 3);

    let project = engine.project();
    assert_eq!(project.playlist.len(), 3);
    assert_eq!(project.playlist[2].track_id, 3);
    let strip = project.mixer.iter().find(|s| s.track_id == 3).unwrap();
    assert_eq!(strip.volume, 0.85);
}

#[tokio::test]
async fn insert_track_shifts_ids_and_plugin_nodes() {
    let (_tmp, mut engine) = fixture();
    // a plugin on track 2 (offline add keeps the uid as the name)
    ok(
        &mut engine,
        "plugin.add",
        json!({"track_id": 2, "plugin_uid": "vendor.synth"}),
    )
    .await;

    let ack = ok(&mut engine, "track.insert", json!({"after_track_id": 1})).await;
    assert_eq!(ack["track_id"], 2);

    let project = engine.project();
    let ids: Vec<u32> = project.playlist.iter().map(|t| t.track_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    // the old track 2 moved to id 3 and its node followed
    assert_eq!(project.playlist[2].name, "Bass");
    assert_eq!(project.nodes.len(), 1);
    assert_eq!(project.nodes[0].track_id, 3);
    assert_eq!(project.nodes[0].plugin_index, 0);
    // every track has exactly one strip
    let mut strip_ids: Vec<u32> = project.mixer.iter().map(|s| s.track_id).collect();
    strip_ids.sort_unstable();
    assert_eq!(strip_ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn delete_track_densifies_and_drops_owned_entities() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "plugin.add",
        json!({"track_id": 1, "plugin_uid": "vendor.eq"}),
    )
    .await;

    ok(&mut engine, "track.delete", json!({"track_id": 1})).await;

    let project = engine.project();
    assert_eq!(project.playlist.len(), 1);
    assert_eq!(project.playlist[0].track_id, 1);
    assert_eq!(project.playlist[0].name, "Bass");
    assert!(project.playlist[0].clips.is_empty());
    assert!(project.nodes.is_empty());
    assert_eq!(project.mixer.len(), 1);
    // patterns are not owned by tracks and survive
    assert!(project.pattern("welcome-beat").is_some());
}

#[tokio::test]
async fn bulk_delete_rejects_unknown_ids_without_mutating() {
    let (_tmp, mut engine) = fixture();
    let before = engine.project().clone();

    let error = fail(
        &mut engine,
        "track.bulk-delete",
        json!({"track_ids": [2, 9]}),
    )
    .await;
    assert!(error.contains("track 9"));
    assert_eq!(engine.project(), &before);

    ok(&mut engine, "track.bulk-delete", json!({"track_ids": [1, 2]})).await;
    // normalization refuses to leave the project empty
    assert_eq!(engine.project().playlist.len(), 1);
    assert_eq!(engine.project().playlist[0].track_id, 1);
}

#[tokio::test]
async fn duplicate_track_deep_copies_with_fresh_ids() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "plugin.add",
        json!({"track_id": 1, "plugin_uid": "vendor.synth"}),
    )
    .await;
    ok(
        &mut engine,
        "mixer.set-volume",
        json!({"track_id": 1, "volume": 1.1}),
    )
    .await;

    let ack = ok(&mut engine, "track.duplicate", json!({"track_id": 1})).await;
    assert_eq!(ack["track_id"], 2);

    let project = engine.project();
    assert_eq!(project.playlist.len(), 3);
    assert_eq!(project.playlist[0].name, "Drums");
    assert_eq!(project.playlist[1].name, "Drums");
    assert_eq!(project.playlist[2].name, "Bass");

    // clips copied with fresh ids but identical placement
    let original = &project.playlist[0].clips[0];
    let copy = &project.playlist[1].clips[0];
    assert_ne!(original.id, copy.id);
    assert_eq!(original.start, copy.start);
    assert_eq!(original.pattern_id(), copy.pattern_id());

    // plugin chain copied with fresh node ids
    let chain1 = project.chain(1);
    let chain2 = project.chain(2);
    assert_eq!(chain1.len(), 1);
    assert_eq!(chain2.len(), 1);
    assert_ne!(chain1[0].id, chain2[0].id);
    assert_eq!(chain2[0].uid, "vendor.synth");

    // strip settings copied
    let strip = project.mixer.iter().find(|s| s.track_id == 2).unwrap();
    assert_eq!(strip.volume, 1.1);
}

#[tokio::test]
async fn reorder_track_reassigns_ids_to_new_order() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "track.reorder",
        json!({"track_id": 1, "to_index": 1}),
    )
    .await;

    let project = engine.project();
    let names: Vec<&str> = project.playlist.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Bass", "Drums"]);
    let ids: Vec<u32> = project.playlist.iter().map(|t| t.track_id).collect();
    assert_eq!(ids, vec![1, 2]);
    // the moved track's clip is still attached to it
    assert_eq!(project.playlist[1].clips.len(), 1);
}

#[tokio::test]
async fn set_name_validates_length_and_emptiness() {
    let (_tmp, mut engine) = fixture();

    let error = fail(
        &mut engine,
        "track.set-name",
        json!({"track_id": 1, "name": "   "}),
    )
    .await;
    assert!(error.contains("empty"));

    let error = fail(
        &mut engine,
        "track.set-name",
        json!({"track_id": 1, "name": "a really long track name over the limit"}),
    )
    .await;
    assert!(error.contains("25"));

    ok(
        &mut engine,
        "track.set-name",
        json!({"track_id": 1, "name": "Kicks"}),
    )
    .await;
    assert_eq!(engine.project().playlist[0].name, "Kicks");
}

#[tokio::test]
async fn chain_enabled_toggles_bypass_on_every_node() {
    let (_tmp, mut engine) = fixture();
    for uid in ["vendor.synth", "vendor.eq"] {
        ok(
            &mut engine,
            "plugin.add",
            json!({"track_id": 1, "plugin_uid": uid}),
        )
        .await;
    }

    ok(
        &mut engine,
        "track.set-chain-enabled",
        json!({"track_id": 1, "enabled": false}),
    )
    .await;
    assert!(engine.project().nodes.iter().all(|n| n.bypassed));
    assert!(!engine.project().playlist[0].chain_enabled);

    ok(
        &mut engine,
        "track.set-chain-enabled",
        json!({"track_id": 1, "enabled": true}),
    )
    .await;
    assert!(engine.project().nodes.iter().all(|n| !n.bypassed));
}

#[tokio::test]
async fn mixer_commands_clamp_and_are_idempotent() {
    let (_tmp, mut engine) = fixture();

    ok(
        &mut engine,
        "mixer.set-volume",
        json!({"track_id": 1, "volume": 5.0}),
    )
    .await;
    assert_eq!(engine.project().mixer[0].volume, 1.2);

    ok(
        &mut engine,
        "mixer.set-pan",
        json!({"track_id": 1, "pan": -3.0}),
    )
    .await;
    assert_eq!(engine.project().mixer[0].pan, -1.0);

    ok(
        &mut engine,
        "mixer.set-mute",
        json!({"track_id": 2, "mute": true}),
    )
    .await;
    let once = engine.project().clone();
    ok(
        &mut engine,
        "mixer.set-mute",
        json!({"track_id": 2, "mute": true}),
    )
    .await;
    assert_eq!(engine.project(), &once);

    let error = fail(
        &mut engine,
        "mixer.set-solo",
        json!({"track_id": 42, "solo": true}),
    )
    .await;
    assert!(error.contains("not found"));
}

#[tokio::test]
async fn pattern_create_rejects_duplicate_ids() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "pattern.create",
        json!({"pattern": {"id": "p2", "length": 16, "type": "drum", "steps": []}}),
    )
    .await;

    let error = fail(
        &mut engine,
        "pattern.create",
        json!({"pattern": {"id": "p2", "length": 16, "type": "drum", "steps": []}}),
    )
    .await;
    assert!(error.contains("already exists"));
}

#[tokio::test]
async fn pattern_update_clamps_and_is_idempotent() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "pattern.update",
        json!({"pattern_id": "welcome-beat", "length": 500, "swing": 2.0}),
    )
    .await;
    let pattern = engine.project().pattern("welcome-beat").unwrap();
    assert_eq!(pattern.length, 128);
    assert_eq!(pattern.swing, 0.95);

    let once = engine.project().clone();
    ok(
        &mut engine,
        "pattern.update",
        json!({"pattern_id": "welcome-beat", "length": 128, "swing": 0.95}),
    )
    .await;
    assert_eq!(engine.project(), &once);
}

#[tokio::test]
async fn update_step_upserts_and_zero_velocity_removes() {
    let (_tmp, mut engine) = fixture();

    ok(
        &mut engine,
        "pattern.update-step",
        json!({"pattern_id": "welcome-beat", "lane": "clap", "step": 3, "velocity": 1.5}),
    )
    .await;
    let steps = drum_steps(engine.project(), "welcome-beat");
    let clap = steps.iter().find(|s| s.lane == "clap").unwrap();
    assert_eq!(clap.velocity, 1.0);

    ok(
        &mut engine,
        "pattern.update-step",
        json!({"pattern_id": "welcome-beat", "lane": "clap", "step": 3, "velocity": 0.0}),
    )
    .await;
    let steps = drum_steps(engine.project(), "welcome-beat");
    assert!(steps.iter().all(|s| s.lane != "clap"));

    let error = fail(
        &mut engine,
        "pattern.update-step",
        json!({"pattern_id": "welcome-beat", "lane": "clap", "step": 400, "velocity": 0.5}),
    )
    .await;
    assert!(error.contains("out of range"));
}

#[tokio::test]
async fn delete_pattern_cascades_to_exactly_its_clips() {
    let (_tmp, mut engine) = fixture();
    // second pattern with a clip on track 2
    ok(
        &mut engine,
        "pattern.create",
        json!({"pattern": {"id": "p2", "length": 16, "type": "drum", "steps": []}}),
    )
    .await;
    ok(
        &mut engine,
        "clip.create",
        json!({"track_id": 2, "pattern_id": "p2"}),
    )
    .await;

    ok(
        &mut engine,
        "pattern.delete",
        json!({"pattern_id": "welcome-beat"}),
    )
    .await;

    let project = engine.project();
    assert!(project.pattern("welcome-beat").is_none());
    assert!(project.pattern("p2").is_some());
    assert!(project.playlist[0].clips.is_empty());
    assert_eq!(project.playlist[1].clips.len(), 1);
}

#[tokio::test]
async fn move_midi_note_quantizes_and_clamps() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "pattern.create",
        json!({"pattern": {
            "id": "melody",
            "length": 32,
            "type": "midi",
            "notes": [{"id": "n1", "start": 0.0, "length": 1.0, "pitch": 60, "velocity": 0.8}]
        }}),
    )
    .await;

    ok(
        &mut engine,
        "pattern.move-midi-note",
        json!({"pattern_id": "melody", "note_id": "n1", "start": 0.33, "pitch": 127, "velocity": 1.5}),
    )
    .await;

    let note = midi_notes(engine.project(), "melody")[0].clone();
    assert_eq!(note.start, 0.3125);
    assert_eq!(note.pitch, 127);
    assert_eq!(note.velocity, 1.0);

    let error = fail(
        &mut engine,
        "pattern.move-midi-note",
        json!({"pattern_id": "melody", "note_id": "ghost", "start": 1.0}),
    )
    .await;
    assert!(error.contains("not found"));
}

#[tokio::test]
async fn clip_create_defaults_land_after_the_last_clip() {
    let (_tmp, mut engine) = fixture();
    // track 1 ends at beat 4 (the welcome clip)
    let ack = ok(
        &mut engine,
        "clip.create",
        json!({"track_id": 1, "pattern_id": "welcome-beat"}),
    )
    .await;
    assert_eq!(ack["start"], 4.0);
    assert_eq!(ack["length"], 1.0);

    let ack = ok(
        &mut engine,
        "clip.create",
        json!({"track_id": 1, "pattern_id": "welcome-beat"}),
    )
    .await;
    assert_eq!(ack["start"], 5.0);
}

#[tokio::test]
async fn clip_create_validates_references_and_ids() {
    let (_tmp, mut engine) = fixture();
    let before = engine.project().clone();

    let error = fail(
        &mut engine,
        "clip.create",
        json!({"track_id": 1, "pattern_id": "nope"}),
    )
    .await;
    assert!(error.contains("pattern nope"));
    assert_eq!(engine.project(), &before);

    let error = fail(
        &mut engine,
        "clip.create",
        json!({"track_id": 1, "pattern_id": "welcome-beat", "id": "welcome-clip"}),
    )
    .await;
    assert!(error.contains("already exists"));
}

#[tokio::test]
async fn clip_move_snaps_to_the_grid() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "clip.move",
        json!({"track_id": 1, "clip_id": "welcome-clip", "start": 0.37}),
    )
    .await;
    assert_eq!(engine.project().playlist[0].clips[0].start, 0.375);
}

#[tokio::test]
async fn clip_move_across_tracks_carries_the_clip() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "clip.move",
        json!({"track_id": 1, "clip_id": "welcome-clip", "start": 8.0, "to_track_id": 2}),
    )
    .await;

    let project = engine.project();
    assert!(project.playlist[0].clips.is_empty());
    assert_eq!(project.playlist[1].clips.len(), 1);
    assert_eq!(project.playlist[1].clips[0].start, 8.0);
}

#[tokio::test]
async fn clip_resize_and_delete() {
    let (_tmp, mut engine) = fixture();
    let ack = ok(
        &mut engine,
        "clip.resize",
        json!({"track_id": 1, "clip_id": "welcome-clip", "length": 2.04}),
    )
    .await;
    assert_eq!(ack["length"], 2.0625);

    ok(
        &mut engine,
        "clip.delete",
        json!({"track_id": 1, "clip_id": "welcome-clip"}),
    )
    .await;
    assert!(engine.project().playlist[0].clips.is_empty());

    let error = fail(
        &mut engine,
        "clip.delete",
        json!({"track_id": 1, "clip_id": "welcome-clip"}),
    )
    .await;
    assert!(error.contains("not found"));
}

#[tokio::test]
async fn import_file_validates_format_and_defaults_length() {
    let (_tmp, mut engine) = fixture();

    let error = fail(
        &mut engine,
        "clip.import-file",
        json!({"track_id": 2, "name": "virus.exe", "format": "exe"}),
    )
    .await;
    assert!(error.contains("unsupported source format"));

    let ack = ok(
        &mut engine,
        "clip.import-file",
        json!({"track_id": 2, "name": "Loop.WAV", "format": "WAV", "size": 44100, "duration": 2.5}),
    )
    .await;
    assert_eq!(ack["length"], 8.0);

    let clip = &engine.project().playlist[1].clips[0];
    let file = clip.file().unwrap();
    assert_eq!(file.format, "wav");
    assert_eq!(file.size, Some(44100));

    let ack = ok(
        &mut engine,
        "clip.import-file",
        json!({"track_id": 2, "name": "riff.mid", "format": "mid"}),
    )
    .await;
    assert_eq!(ack["ok"], true);
    let clip = &engine.project().playlist[1].clips[1];
    assert!(matches!(
        clip.file().unwrap().kind,
        stuumodel::FileKind::Midi
    ));
}

#[tokio::test]
async fn plugin_chain_local_lifecycle() {
    let (_tmp, mut engine) = fixture();
    let a = ok(
        &mut engine,
        "plugin.add",
        json!({"track_id": 1, "plugin_uid": "vendor.a"}),
    )
    .await;
    ok(
        &mut engine,
        "plugin.add",
        json!({"track_id": 1, "plugin_uid": "vendor.b"}),
    )
    .await;

    let order: Vec<String> = engine
        .project()
        .chain(1)
        .iter()
        .map(|n| n.uid.clone())
        .collect();
    assert_eq!(order, vec!["vendor.a", "vendor.b"]);

    ok(
        &mut engine,
        "plugin.reorder",
        json!({"track_id": 1, "from_index": 1, "to_index": 0}),
    )
    .await;
    let order: Vec<String> = engine
        .project()
        .chain(1)
        .iter()
        .map(|n| n.uid.clone())
        .collect();
    assert_eq!(order, vec!["vendor.b", "vendor.a"]);

    let node_id = a["node_id"].as_str().unwrap().to_string();
    ok(
        &mut engine,
        "plugin.set-bypass",
        json!({"node_id": node_id, "bypassed": true}),
    )
    .await;
    assert!(engine.project().node(&node_id).unwrap().bypassed);

    // offline parameter write: no schema yet, value stored as requested
    ok(
        &mut engine,
        "plugin.set-parameter",
        json!({"track_id": 1, "plugin_index": 1, "param_id": "cutoff", "value": 0.7}),
    )
    .await;
    assert_eq!(
        engine.project().node(&node_id).unwrap().values.get("cutoff"),
        Some(&0.7)
    );

    ok(
        &mut engine,
        "plugin.remove",
        json!({"track_id": 1, "plugin_index": 0}),
    )
    .await;
    let chain = engine.project().chain(1);
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].uid, "vendor.a");
    assert_eq!(chain[0].plugin_index, 0);
}

#[tokio::test]
async fn plugin_scan_requires_the_backend() {
    let (_tmp, mut engine) = fixture();
    let error = fail(&mut engine, "plugin.scan", Value::Null).await;
    assert!(error.contains("not connected"));
}

#[tokio::test]
async fn transport_runs_on_the_local_clock() {
    let (_tmp, mut engine) = fixture();

    let ack = ok(&mut engine, "transport.play", Value::Null).await;
    assert_eq!(ack["transport"]["playing"], true);
    assert!(engine.clock().playing());

    let ack = ok(&mut engine, "transport.set-bpm", json!({"bpm": 500.0})).await;
    assert_eq!(ack["transport"]["bpm"], 300.0);
    assert_eq!(engine.project().bpm, 300.0);

    let ack = ok(&mut engine, "transport.seek", json!({"position_bars": 2.0})).await;
    let position = ack["transport"]["positionBeats"].as_f64().unwrap();
    assert!((8.0..8.1).contains(&position), "position {position}");

    ok(&mut engine, "transport.pause", Value::Null).await;
    assert!(!engine.clock().playing());

    let ack = ok(&mut engine, "transport.stop", Value::Null).await;
    assert_eq!(ack["transport"]["positionBeats"], 0.0);

    let error = fail(&mut engine, "transport.seek", json!({})).await;
    assert!(error.contains("position"));
}

#[tokio::test]
async fn update_view_clamps_metrics() {
    let (_tmp, mut engine) = fixture();
    ok(
        &mut engine,
        "project.update-view",
        json!({"playlist_view_bars": 100000, "playlist_bar_width": 10.0, "playlist_show_track_nodes": false}),
    )
    .await;

    let project = engine.project();
    assert_eq!(project.playlist_view_bars, 4096);
    assert_eq!(project.playlist_bar_width, 36.0);
    assert!(!project.playlist_show_track_nodes);
}

#[tokio::test]
async fn save_and_load_roundtrip_through_the_store() {
    let (_tmp, mut engine) = fixture();
    ok(&mut engine, "project.save", json!({"filename": "mine"})).await;
    assert_eq!(engine.project_file(), "mine");

    ok(
        &mut engine,
        "mixer.set-volume",
        json!({"track_id": 1, "volume": 0.2}),
    )
    .await;
    assert_eq!(engine.project().mixer[0].volume, 0.2);

    let ack = ok(&mut engine, "project.load", json!({"filename": "mine"})).await;
    assert_eq!(ack["project_file"], "mine");
    assert_eq!(engine.project().mixer[0].volume, 0.85);

    let error = fail(&mut engine, "project.load", json!({"filename": "ghost"})).await;
    assert!(error.contains("not found"));
}

#[tokio::test]
async fn new_project_resets_the_model_without_writing() {
    let (_tmp, mut engine) = fixture();
    let ack = ok(
        &mut engine,
        "project.new",
        json!({"project_name": "My First Jam!"}),
    )
    .await;
    assert_eq!(ack["project_name"], "My First Jam!");
    assert_eq!(ack["project_file"], "my-first-jam");

    let project = engine.project();
    assert_eq!(project.project_name, "My First Jam!");
    assert_eq!(project.playlist.len(), 1);
    assert!(project.patterns.is_empty());

    // nothing hits the disk until an explicit save
    let ack = ok(&mut engine, "project.list", Value::Null).await;
    assert_eq!(ack["projects"], json!([]));

    ok(&mut engine, "project.save", Value::Null).await;
    let ack = ok(&mut engine, "project.list", Value::Null).await;
    assert_eq!(ack["projects"], json!(["my-first-jam.stu"]));
}

#[tokio::test]
async fn unknown_commands_and_bad_payloads_are_acked_as_errors() {
    let (_tmp, mut engine) = fixture();

    let error = fail(&mut engine, "nope.nothing", Value::Null).await;
    assert!(error.contains("unknown command"));

    let error = fail(&mut engine, "mixer.set-volume", json!({"track_id": 1})).await;
    assert!(error.contains("invalid payload"));
}

#[tokio::test]
async fn hello_frames_are_ready_state_transport_in_order() {
    let (_tmp, engine) = fixture();
    let frames = engine.hello_frames();
    assert_eq!(frames.len(), 3);

    let ready: Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(ready["event"], "ready");
    assert_eq!(ready["payload"]["projectFile"], DEFAULT_PROJECT_FILE);
    assert_eq!(ready["payload"]["enginePort"], 7373);
    assert_eq!(ready["payload"]["nativeTransport"], false);

    let state: Value = serde_json::from_str(&frames[1]).unwrap();
    assert_eq!(state["event"], "state");
    assert_eq!(
        state["payload"]["project"]["project_name"],
        "Welcome to TheStuu"
    );
    assert_eq!(state["payload"]["nativeTransport"], false);

    let transport: Value = serde_json::from_str(&frames[2]).unwrap();
    assert_eq!(transport["event"], "transport");
    assert_eq!(transport["payload"]["playing"], false);
}

fn drum_steps(project: &Project, pattern_id: &str) -> Vec<stuumodel::DrumStep> {
    match &project.pattern(pattern_id).unwrap().data {
        stuumodel::PatternData::Drum { steps } => steps.clone(),
        _ => panic!("expected drum pattern"),
    }
}

fn midi_notes(project: &Project, pattern_id: &str) -> Vec<stuumodel::MidiNote> {
    match &project.pattern(pattern_id).unwrap().data {
        stuumodel::PatternData::Midi { notes } => notes.clone(),
        _ => panic!("expected midi pattern"),
    }
}
