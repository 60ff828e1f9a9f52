//! Project document storage.
//!
//! One JSON document per project, `.stu` extension, living in the
//! configured project directory. Reads flow through the normalizer,
//! writes through normalize + validate, and the actual write is staged
//! to a temp file and renamed into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use stuumodel::{normalize, validate, Project};

/// Project file seeded on first run.
pub const DEFAULT_PROJECT_FILE: &str = "welcome.stu";

pub const PROJECT_EXT: &str = "stu";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project file {0} not found")]
    NotFound(String),

    #[error("invalid project filename {0:?}")]
    BadName(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("could not parse project document: {0}")]
    Parse(String),

    #[error("project failed validation: {0}")]
    Invalid(String),
}

pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a project filename inside the store directory. Bare names
    /// get the `.stu` extension; anything that would escape the
    /// directory is rejected.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(StoreError::BadName(name.to_string()));
        }
        let mut file = PathBuf::from(name);
        if file.extension().is_none() {
            file.set_extension(PROJECT_EXT);
        }
        Ok(self.dir.join(file))
    }

    pub fn load(&self, name: &str) -> Result<Project, StoreError> {
        let path = self.path_for(name)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut project: Project =
            serde_json::from_str(&text).map_err(|e| StoreError::Parse(e.to_string()))?;
        normalize(&mut project);

        let errors = validate(&project);
        if !errors.is_empty() {
            return Err(StoreError::Invalid(errors.join("; ")));
        }
        Ok(project)
    }

    pub fn save(&self, name: &str, project: &Project) -> Result<(), StoreError> {
        let path = self.path_for(name)?;

        let mut normalized = project.clone();
        normalize(&mut normalized);
        let errors = validate(&normalized);
        if !errors.is_empty() {
            return Err(StoreError::Invalid(errors.join("; ")));
        }

        fs::create_dir_all(&self.dir)?;
        let text = serde_json::to_string_pretty(&normalized)
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        // stage next to the target so the rename stays on one filesystem
        let staging = path.with_extension("stu.tmp");
        fs::write(&staging, text)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    /// Load the named project; on any failure fall back to writing a
    /// fresh default project and returning that.
    pub fn load_or_seed(&self, name: &str) -> Result<Project, StoreError> {
        match self.load(name) {
            Ok(project) => Ok(project),
            Err(StoreError::NotFound(_)) => {
                info!(name, "no project file yet, seeding the default project");
                self.seed_default(name)
            }
            Err(e) => {
                warn!(name, "could not load project ({e}), starting from the default");
                self.seed_default(name)
            }
        }
    }

    fn seed_default(&self, name: &str) -> Result<Project, StoreError> {
        let mut project = Project::default_project();
        normalize(&mut project);
        self.save(name, &project)?;
        Ok(project)
    }

    /// Project documents in the store directory, sorted by filename.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension()? != PROJECT_EXT {
                    return None;
                }
                Some(path.file_name()?.to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        Ok(names)
    }
}
