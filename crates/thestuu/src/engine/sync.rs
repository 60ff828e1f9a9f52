//! Backend re-sync: replay the whole edit state after a structural
//! change or a reconnect.
//!
//! The sequence is edit-reset, reload every plugin node in chain order,
//! reapply stored parameter values, then re-import every file-backed
//! clip that has a streamable source. It never short-circuits: every
//! failure is collected into the report and the local model stays the
//! source of truth throughout.

use serde::Serialize;
use serde_json::{json, Value};

use stuumodel::{normalize, FileKind};
use stuuproto::{cmd, PeerError};

use super::Engine;

/// Internal UID tried once when a node carries no UID of its own and the
/// backend cannot find the plugin.
pub const FALLBACK_PLUGIN_UID: &str = "thestuu.internal.gain";

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub restored: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

/// Attach a sync report to an ack payload as `nativeSync`.
pub(super) fn ack_with_sync(mut ack: Value, report: Option<SyncReport>) -> Value {
    if let Some(report) = report {
        ack["nativeSync"] = serde_json::to_value(&report).expect("sync report serializes");
    }
    ack
}

/// Run the re-sync sequence. Returns None when no backend is connected.
pub(super) async fn resync(engine: &mut Engine) -> Option<SyncReport> {
    let peer = engine.native()?;
    let mut report = SyncReport::default();

    normalize(&mut engine.project);

    let track_count = track_count(engine);
    if let Err(e) = peer
        .request(cmd::EDIT_RESET, json!({"track_count": track_count}))
        .await
    {
        report.failed += 1;
        report.errors.push(format!("edit:reset: {e}"));
    }

    let mut order: Vec<usize> = (0..engine.project.nodes.len()).collect();
    order.sort_by_key(|&i| {
        (
            engine.project.nodes[i].track_id,
            engine.project.nodes[i].plugin_index,
            i,
        )
    });

    for i in order {
        let (node_id, uid, track_id, values) = {
            let node = &engine.project.nodes[i];
            (
                node.id.clone(),
                node.uid.clone(),
                node.track_id,
                node.values.clone(),
            )
        };

        let mut load = peer
            .request(cmd::VST_LOAD, json!({"plugin_uid": uid, "track_id": track_id}))
            .await;
        if uid.trim().is_empty() {
            if let Err(PeerError::Backend(message)) = &load {
                if message.contains("VST not found") {
                    load = peer
                        .request(
                            cmd::VST_LOAD,
                            json!({"plugin_uid": FALLBACK_PLUGIN_UID, "track_id": track_id}),
                        )
                        .await;
                }
            }
        }

        match load {
            Ok(payload) => {
                report.restored += 1;
                if let Some(node) = engine.project.nodes.iter_mut().find(|n| n.id == node_id) {
                    super::plugins::adopt_plugin_info(node, payload.get("plugin"));
                }

                for (param_id, value) in values {
                    let plugin_index = engine
                        .project
                        .node(&node_id)
                        .map(|n| n.plugin_index)
                        .unwrap_or(0);
                    let set = peer
                        .request(
                            cmd::VST_PARAM_SET,
                            json!({
                                "track_id": track_id,
                                "plugin_index": plugin_index,
                                "param_id": param_id,
                                "value": value,
                            }),
                        )
                        .await;
                    match set {
                        Ok(payload) => {
                            let applied = payload
                                .get("parameter")
                                .and_then(|p| p.get("value"))
                                .and_then(Value::as_f64)
                                .unwrap_or(value);
                            if let Some(node) =
                                engine.project.nodes.iter_mut().find(|n| n.id == node_id)
                            {
                                node.values.insert(param_id, applied);
                            }
                        }
                        Err(e) => report.errors.push(format!("vst:param:set {param_id}: {e}")),
                    }
                }
            }
            Err(e) => {
                report.failed += 1;
                report.errors.push(format!("vst:load {uid}: {e}"));
            }
        }
    }

    let imports: Vec<(u32, String, f64, f64, &'static str)> = engine
        .project
        .playlist
        .iter()
        .flat_map(|track| {
            track.clips.iter().filter_map(move |clip| {
                let file = clip.file()?;
                let source_path = file.source_path.clone()?;
                if clip.start < 0.0 || clip.length <= 0.0 {
                    return None;
                }
                let kind = match file.kind {
                    FileKind::Audio => "audio",
                    FileKind::Midi => "midi",
                };
                Some((track.track_id, source_path, clip.start, clip.length, kind))
            })
        })
        .collect();

    for (track_id, source_path, start, length, kind) in imports {
        let request = json!({
            "track_id": track_id,
            "source_path": source_path,
            "start": start,
            "length": length,
            "type": kind,
        });
        match peer.request(cmd::CLIP_IMPORT_FILE, request).await {
            Ok(_) => report.restored += 1,
            Err(e) => {
                report.failed += 1;
                report
                    .errors
                    .push(format!("clip:import-file {source_path}: {e}"));
            }
        }
    }

    normalize(&mut engine.project);
    engine.broadcast_state();
    Some(report)
}

fn track_count(engine: &Engine) -> u32 {
    let max_node = engine
        .project
        .nodes
        .iter()
        .map(|n| n.track_id)
        .max()
        .unwrap_or(0);
    let max_track = engine
        .project
        .playlist
        .iter()
        .map(|t| t.track_id)
        .max()
        .unwrap_or(0);
    engine
        .config
        .native
        .default_track_count
        .max(max_node)
        .max(max_track)
}
