//! Project load/save and view-state commands.
//!
//! Mutations never persist implicitly; `project.save` is the only path
//! to disk. A save may carry a whole document from the client, which
//! then becomes the in-memory model as well.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::info;

use stuumodel::{normalize, Project};

use super::commands::{LoadProject, NewProject, SaveProject, UpdateView};
use super::error::EngineError;
use super::Engine;

pub(super) fn new(engine: &mut Engine, p: NewProject) -> Result<Value, EngineError> {
    let name = p
        .project_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let filename = p
        .filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| slugify(&name));

    // reject bad filenames before touching the model
    engine.store.path_for(&filename)?;

    let mut project = Project::empty(name.clone());
    normalize(&mut project);
    engine.project = project;
    engine.project_file = filename.clone();

    if !engine.clock.native_authoritative() {
        engine.clock.stop();
        engine.clock.set_bpm(engine.project.bpm, Instant::now());
    }

    info!(filename = %filename, "fresh project created");
    engine.broadcast_state();
    Ok(json!({"project_name": name, "project_file": filename}))
}

pub(super) fn load(engine: &mut Engine, p: LoadProject) -> Result<Value, EngineError> {
    let project = engine.store.load(&p.filename)?;
    engine.project = project;
    engine.project_file = p.filename.clone();

    if !engine.clock.native_authoritative() {
        engine.clock.set_bpm(engine.project.bpm, Instant::now());
    }

    info!(filename = %p.filename, "project loaded");
    engine.broadcast_state();
    Ok(json!({"project_file": p.filename}))
}

pub(super) fn save(engine: &mut Engine, p: SaveProject) -> Result<Value, EngineError> {
    let filename = p.filename.unwrap_or_else(|| engine.project_file.clone());

    match p.project {
        Some(mut incoming) => {
            // client-authored document: persist it and adopt it
            engine.store.save(&filename, &incoming)?;
            normalize(&mut incoming);
            engine.project = incoming;
            engine.broadcast_state();
        }
        None => {
            engine.store.save(&filename, &engine.project)?;
        }
    }

    engine.project_file = filename.clone();
    info!(filename = %filename, "project saved");
    Ok(json!({"project_file": filename}))
}

pub(super) fn list(engine: &Engine) -> Result<Value, EngineError> {
    let projects = engine.store.list()?;
    Ok(json!({"projects": projects, "current": engine.project_file}))
}

pub(super) fn update_view(engine: &mut Engine, p: UpdateView) -> Result<Value, EngineError> {
    let mut draft = engine.project.clone();
    if let Some(bars) = p.playlist_view_bars {
        draft.playlist_view_bars = bars;
    }
    if let Some(width) = p.playlist_bar_width {
        if !width.is_finite() {
            return Err(EngineError::validation("bar width must be a finite number"));
        }
        draft.playlist_bar_width = width;
    }
    if let Some(show) = p.playlist_show_track_nodes {
        draft.playlist_show_track_nodes = show;
    }
    engine.commit(draft)?;
    Ok(json!({}))
}

/// A filesystem-safe project filename derived from a display name.
fn slugify(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_makes_safe_filenames() {
        assert_eq!(slugify("My First Jam!"), "my-first-jam");
        assert_eq!(slugify("   "), "untitled");
        assert_eq!(slugify("../evil"), "evil");
    }
}
