//! Plugin chain commands.
//!
//! Chain order is the dense `plugin_index` sequence per track. Commands
//! that change the chain shape (add at a position, remove, reorder)
//! replay the edit state into the backend; bypass stays local, and
//! parameter writes go through the backend when it is there so the
//! applied value can be adopted.

use serde_json::{json, Value};

use stuumodel::{ParamSpec, PluginNode, Project};
use stuuproto::{cmd, PeerError};

use super::commands::{AddPlugin, NodeRef, ReorderPlugins, SetBypass, SetParameter};
use super::error::EngineError;
use super::tracks::require_track;
use super::{sync, Engine};

pub(super) async fn scan(engine: &mut Engine) -> Result<Value, EngineError> {
    let peer = engine
        .native()
        .ok_or(EngineError::Backend(PeerError::NotConnected))?;
    let payload = peer.request(cmd::VST_SCAN, json!({})).await?;
    let plugins = payload.get("plugins").cloned().unwrap_or_else(|| json!([]));
    Ok(json!({"plugins": plugins}))
}

pub(super) async fn add(engine: &mut Engine, p: AddPlugin) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;
    let uid = p.plugin_uid.trim().to_string();
    if uid.is_empty() {
        return Err(EngineError::validation("plugin_uid must not be empty"));
    }

    let next_index = engine.project.chain(p.track_id).len() as u32;
    let mut node = PluginNode::new(uid, p.track_id, next_index);
    node.bypassed = p.bypassed.unwrap_or(false);

    if let Some(peer) = engine.native() {
        let payload = peer
            .request(
                cmd::VST_LOAD,
                json!({"plugin_uid": node.uid, "track_id": p.track_id}),
            )
            .await?;
        adopt_plugin_info(&mut node, payload.get("plugin"));
        node.track_id = p.track_id;
    }

    let node_id = node.id.clone();
    let mut draft = engine.project.clone();
    draft.nodes.push(node);
    if let Some(insert_index) = p.insert_index {
        move_within_chain(&mut draft, p.track_id, next_index, insert_index);
    }
    engine.commit(draft)?;

    let report = if p.insert_index.is_some() {
        sync::resync(engine).await
    } else {
        None
    };
    Ok(sync::ack_with_sync(json!({"node_id": node_id}), report))
}

pub(super) async fn remove(engine: &mut Engine, r: NodeRef) -> Result<Value, EngineError> {
    let node_id = resolve_node(&engine.project, &r)?;
    let mut draft = engine.project.clone();
    draft.nodes.retain(|n| n.id != node_id);
    engine.commit(draft)?;

    let report = sync::resync(engine).await;
    Ok(sync::ack_with_sync(json!({"node_id": node_id}), report))
}

pub(super) async fn reorder(engine: &mut Engine, p: ReorderPlugins) -> Result<Value, EngineError> {
    require_track(&engine.project, p.track_id)?;
    let chain_len = engine.project.chain(p.track_id).len() as u32;
    if p.from_index >= chain_len {
        return Err(EngineError::validation(format!(
            "from_index {} out of range 0..{chain_len}",
            p.from_index
        )));
    }

    let mut draft = engine.project.clone();
    move_within_chain(&mut draft, p.track_id, p.from_index, p.to_index);
    engine.commit(draft)?;

    let report = sync::resync(engine).await;
    Ok(sync::ack_with_sync(json!({}), report))
}

pub(super) fn set_bypass(engine: &mut Engine, p: SetBypass) -> Result<Value, EngineError> {
    let node_id = resolve_node(&engine.project, &p.node)?;
    let mut draft = engine.project.clone();
    if let Some(node) = draft.nodes.iter_mut().find(|n| n.id == node_id) {
        node.bypassed = p.bypassed;
    }
    engine.commit(draft)?;
    Ok(json!({}))
}

pub(super) async fn set_parameter(
    engine: &mut Engine,
    p: SetParameter,
) -> Result<Value, EngineError> {
    if !p.value.is_finite() {
        return Err(EngineError::validation("value must be a finite number"));
    }

    let node_ref = NodeRef {
        node_id: p.node_id.clone(),
        track_id: Some(p.track_id),
        plugin_index: Some(p.plugin_index),
    };
    let node_id = resolve_node(&engine.project, &node_ref)?;

    // only reject unknown parameter ids when a schema is known; nodes
    // added while the backend was down have none yet
    let has_schema = engine
        .project
        .node(&node_id)
        .map(|n| !n.parameters.is_empty())
        .unwrap_or(false);
    if has_schema
        && engine
            .project
            .node(&node_id)
            .and_then(|n| n.param(&p.param_id))
            .is_none()
    {
        return Err(EngineError::not_found(format!(
            "parameter {} on node {node_id}",
            p.param_id
        )));
    }

    let mut applied = p.value;
    if let Some(peer) = engine.native() {
        let payload = peer
            .request(
                cmd::VST_PARAM_SET,
                json!({
                    "track_id": p.track_id,
                    "plugin_index": p.plugin_index,
                    "param_id": p.param_id,
                    "value": p.value,
                }),
            )
            .await?;
        if let Some(value) = payload
            .get("parameter")
            .and_then(|param| param.get("value"))
            .and_then(Value::as_f64)
        {
            applied = value;
        }
    }

    let mut draft = engine.project.clone();
    let node = draft
        .nodes
        .iter_mut()
        .find(|n| n.id == node_id)
        .ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
    node.values.insert(p.param_id.clone(), applied);
    engine.commit(draft)?;

    // normalization may have clamped into the schema range
    let value = engine
        .project
        .node(&node_id)
        .and_then(|n| n.values.get(&p.param_id).copied())
        .unwrap_or(applied);
    Ok(json!({"parameter": {"id": p.param_id, "value": value}}))
}

/// Resolve a node reference to its id, by id or by (track, index) pair.
pub(super) fn resolve_node(project: &Project, r: &NodeRef) -> Result<String, EngineError> {
    if let Some(node_id) = &r.node_id {
        return project
            .node(node_id)
            .map(|n| n.id.clone())
            .ok_or_else(|| EngineError::not_found(format!("node {node_id}")));
    }
    match (r.track_id, r.plugin_index) {
        (Some(track_id), Some(plugin_index)) => project
            .nodes
            .iter()
            .find(|n| n.track_id == track_id && n.plugin_index == plugin_index)
            .map(|n| n.id.clone())
            .ok_or_else(|| {
                EngineError::not_found(format!("plugin {plugin_index} on track {track_id}"))
            }),
        _ => Err(EngineError::validation(
            "node_id or track_id+plugin_index required",
        )),
    }
}

/// Adopt what the backend reported for a loaded plugin.
pub(super) fn adopt_plugin_info(node: &mut PluginNode, info: Option<&Value>) {
    let Some(info) = info else { return };
    if let Some(name) = info.get("name").and_then(Value::as_str) {
        node.name = name.to_string();
    }
    if let Some(uid) = info.get("uid").and_then(Value::as_str) {
        node.uid = uid.to_string();
    }
    if let Some(track_id) = info.get("trackId").and_then(Value::as_u64) {
        node.track_id = track_id as u32;
    }
    if let Some(index) = info.get("pluginIndex").and_then(Value::as_u64) {
        node.plugin_index = index as u32;
    }
    if let Some(params) = info.get("parameters") {
        if let Ok(specs) = serde_json::from_value::<Vec<ParamSpec>>(params.clone()) {
            node.parameters = specs;
        }
    }
}

/// Move the node at `from_index` to `to_index` within a track's chain,
/// rewriting the dense index sequence.
fn move_within_chain(draft: &mut Project, track_id: u32, from_index: u32, to_index: u32) {
    let mut ids: Vec<String> = draft
        .chain(track_id)
        .iter()
        .map(|n| n.id.clone())
        .collect();
    let from = from_index as usize;
    if from >= ids.len() {
        return;
    }
    let id = ids.remove(from);
    let to = (to_index as usize).min(ids.len());
    ids.insert(to, id);

    for (index, id) in ids.iter().enumerate() {
        if let Some(node) = draft.nodes.iter_mut().find(|n| &n.id == id) {
            node.plugin_index = index as u32;
        }
    }
}
