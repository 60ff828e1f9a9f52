//! Minimal configuration loading for the TheStuu engine.
//!
//! This crate provides configuration loading with minimal dependencies so
//! that every other TheStuu crate can import it without dependency cycles.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/thestuu/config.toml` (system)
//! 2. `~/.config/thestuu/config.toml` (user)
//! 3. `./thestuu.toml` (local override, or the `--config` path)
//! 4. Environment variables (`THESTUU_*`)
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! engine_port = 7373
//! engine_host = "127.0.0.1"
//!
//! [paths]
//! project_dir = "~/.local/share/thestuu/projects"
//!
//! [native]
//! socket_path = "/tmp/thestuu-native.sock"
//! enabled = true
//! request_timeout_ms = 2000
//! reconnect_delay_ms = 750
//! default_track_count = 8
//! ```

pub mod loader;

pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Where the client gateway listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindConfig {
    /// TCP port the WebSocket client gateway listens on.
    /// Default: 7373
    #[serde(default = "BindConfig::default_engine_port")]
    pub engine_port: u16,

    /// Bind address for the gateway.
    /// Default: 127.0.0.1
    #[serde(default = "BindConfig::default_engine_host")]
    pub engine_host: String,
}

impl BindConfig {
    fn default_engine_port() -> u16 {
        7373
    }

    fn default_engine_host() -> String {
        "127.0.0.1".to_string()
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            engine_port: Self::default_engine_port(),
            engine_host: Self::default_engine_host(),
        }
    }
}

/// Filesystem paths for project documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `.stu` project documents and imported media.
    /// Default: ~/.local/share/thestuu/projects
    #[serde(default = "PathsConfig::default_project_dir")]
    pub project_dir: PathBuf,
}

impl PathsConfig {
    fn default_project_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".local/share/thestuu/projects"))
            .unwrap_or_else(|| PathBuf::from(".local/share/thestuu/projects"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_dir: Self::default_project_dir(),
        }
    }
}

/// Connection to the native audio backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Unix socket path of the native backend.
    /// Default: /tmp/thestuu-native.sock
    #[serde(default = "NativeConfig::default_socket_path")]
    pub socket_path: PathBuf,

    /// When false the backend client is never started and the transport
    /// clock runs in local fallback permanently.
    #[serde(default = "NativeConfig::default_enabled")]
    pub enabled: bool,

    /// Per-request deadline in milliseconds.
    /// Default: 2000
    #[serde(default = "NativeConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Delay between reconnect attempts in milliseconds.
    /// Default: 750
    #[serde(default = "NativeConfig::default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Minimum track count sent to the backend on `edit:reset`.
    /// Default: 8
    #[serde(default = "NativeConfig::default_default_track_count")]
    pub default_track_count: u32,
}

impl NativeConfig {
    fn default_socket_path() -> PathBuf {
        PathBuf::from("/tmp/thestuu-native.sock")
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_request_timeout_ms() -> u64 {
        2000
    }

    fn default_reconnect_delay_ms() -> u64 {
        750
    }

    fn default_default_track_count() -> u32 {
        8
    }
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            socket_path: Self::default_socket_path(),
            enabled: Self::default_enabled(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            reconnect_delay_ms: Self::default_reconnect_delay_ms(),
            default_track_count: Self::default_default_track_count(),
        }
    }
}

/// Complete TheStuu engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StuuConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub native: NativeConfig,
}

impl StuuConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and return information about sources.
    pub fn load_with_sources() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_with_sources_from(None)
    }

    /// Load configuration from an optional path and return source information.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = StuuConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            config = loader::load_from_file(&path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# TheStuu Engine Configuration\n\n");

        output.push_str("[bind]\n");
        output.push_str(&format!("engine_port = {}\n", self.bind.engine_port));
        output.push_str(&format!("engine_host = \"{}\"\n", self.bind.engine_host));

        output.push_str("\n[paths]\n");
        output.push_str(&format!(
            "project_dir = \"{}\"\n",
            self.paths.project_dir.display()
        ));

        output.push_str("\n[native]\n");
        output.push_str(&format!(
            "socket_path = \"{}\"\n",
            self.native.socket_path.display()
        ));
        output.push_str(&format!("enabled = {}\n", self.native.enabled));
        output.push_str(&format!(
            "request_timeout_ms = {}\n",
            self.native.request_timeout_ms
        ));
        output.push_str(&format!(
            "reconnect_delay_ms = {}\n",
            self.native.reconnect_delay_ms
        ));
        output.push_str(&format!(
            "default_track_count = {}\n",
            self.native.default_track_count
        ));

        output
    }
}
