//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, StuuConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/thestuu/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("thestuu/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("thestuu.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<StuuConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config: StuuConfig =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    config.paths.project_dir = expand_path(&config.paths.project_dir);
    Ok(config)
}

/// Apply `THESTUU_*` environment variable overrides.
pub fn apply_env_overrides(config: &mut StuuConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("THESTUU_ENGINE_PORT") {
        if let Ok(port) = v.parse() {
            config.bind.engine_port = port;
            sources.env_overrides.push("THESTUU_ENGINE_PORT".to_string());
        }
    }

    if let Ok(v) = env::var("THESTUU_ENGINE_HOST") {
        config.bind.engine_host = v;
        sources.env_overrides.push("THESTUU_ENGINE_HOST".to_string());
    }

    if let Ok(v) = env::var("THESTUU_PROJECT_DIR") {
        config.paths.project_dir = expand_path(Path::new(&v));
        sources.env_overrides.push("THESTUU_PROJECT_DIR".to_string());
    }

    if let Ok(v) = env::var("THESTUU_NATIVE_SOCKET") {
        config.native.socket_path = PathBuf::from(v);
        sources.env_overrides.push("THESTUU_NATIVE_SOCKET".to_string());
    }

    if let Ok(v) = env::var("THESTUU_NATIVE_ENABLED") {
        if let Ok(enabled) = v.parse() {
            config.native.enabled = enabled;
            sources
                .env_overrides
                .push("THESTUU_NATIVE_ENABLED".to_string());
        }
    }

    if let Ok(v) = env::var("THESTUU_REQUEST_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            config.native.request_timeout_ms = ms;
            sources
                .env_overrides
                .push("THESTUU_REQUEST_TIMEOUT_MS".to_string());
        }
    }

    if let Ok(v) = env::var("THESTUU_RECONNECT_DELAY_MS") {
        if let Ok(ms) = v.parse() {
            config.native.reconnect_delay_ms = ms;
            sources
                .env_overrides
                .push("THESTUU_RECONNECT_DELAY_MS".to_string());
        }
    }

    if let Ok(v) = env::var("THESTUU_DEFAULT_TRACK_COUNT") {
        if let Ok(count) = v.parse() {
            config.native.default_track_count = count;
            sources
                .env_overrides
                .push("THESTUU_DEFAULT_TRACK_COUNT".to_string());
        }
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_path(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };

    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thestuu.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[native]\nsocket_path = \"/tmp/other.sock\"\nreconnect_delay_ms = 100\n"
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.native.socket_path, PathBuf::from("/tmp/other.sock"));
        assert_eq!(config.native.reconnect_delay_ms, 100);
        // untouched section keeps defaults
        assert_eq!(config.bind.engine_port, 7373);
    }

    #[test]
    fn test_parse_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not [valid toml").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_env_override() {
        let mut config = StuuConfig::default();
        let mut sources = ConfigSources::default();

        env::set_var("THESTUU_ENGINE_PORT", "9999");
        apply_env_overrides(&mut config, &mut sources);
        env::remove_var("THESTUU_ENGINE_PORT");

        assert_eq!(config.bind.engine_port, 9999);
        assert!(sources
            .env_overrides
            .contains(&"THESTUU_ENGINE_PORT".to_string()));
    }

    #[test]
    fn test_expand_path() {
        let expanded = expand_path(Path::new("~/projects"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
