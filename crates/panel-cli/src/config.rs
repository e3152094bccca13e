use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use panel_core::PanelConfig;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_ENV: &str = "AGENT_PANEL_CONFIG";
const CONFIG_DIR: &str = "agent-panel";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Where the config comes from. An explicit or environment path must exist;
/// the per-user default is only used when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Required(PathBuf),
    Optional(PathBuf),
    Defaults,
}

pub fn resolve_config_source(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Required(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|value| !value.is_empty()) {
        return ConfigSource::Required(PathBuf::from(value));
    }
    match config_dir {
        Some(dir) => ConfigSource::Optional(dir.join(CONFIG_DIR).join(CONFIG_FILE)),
        None => ConfigSource::Defaults,
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<PanelConfig, ConfigError> {
    let source = resolve_config_source(
        explicit,
        std::env::var_os(CONFIG_ENV),
        dirs::config_dir(),
    );
    load_from_source(&source)
}

pub fn load_from_source(source: &ConfigSource) -> Result<PanelConfig, ConfigError> {
    match source {
        ConfigSource::Required(path) => load_file(path),
        ConfigSource::Optional(path) if path.is_file() => load_file(path),
        ConfigSource::Optional(path) => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(PanelConfig::default())
        }
        ConfigSource::Defaults => Ok(PanelConfig::default()),
    }
}

pub fn load_file(path: &Path) -> Result<PanelConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn explicit_path_wins_over_env_and_default() {
        let source = resolve_config_source(
            Some(Path::new("/tmp/explicit.toml")),
            Some(OsString::from("/tmp/env.toml")),
            Some(PathBuf::from("/home/me/.config")),
        );
        assert_eq!(source, ConfigSource::Required(PathBuf::from("/tmp/explicit.toml")));
    }

    #[test]
    fn env_path_is_used_before_default_dir() {
        let source = resolve_config_source(
            None,
            Some(OsString::from("/tmp/env.toml")),
            Some(PathBuf::from("/home/me/.config")),
        );
        assert_eq!(source, ConfigSource::Required(PathBuf::from("/tmp/env.toml")));

        let source = resolve_config_source(
            None,
            Some(OsString::new()),
            Some(PathBuf::from("/home/me/.config")),
        );
        assert_eq!(
            source,
            ConfigSource::Optional(PathBuf::from("/home/me/.config/agent-panel/config.toml"))
        );
        assert_eq!(resolve_config_source(None, None, None), ConfigSource::Defaults);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[bridge]\nartifact_base_url = \"http://artifacts.local\"\ncall_timeout_ms = 5000\n\n[view]\ncopy_feedback_ms = 1000\n",
        )
        .expect("write");

        let config = load_file(&path).expect("load");
        assert_eq!(
            config.bridge.artifact_base_url.as_deref(),
            Some("http://artifacts.local")
        );
        assert_eq!(config.bridge.call_timeout_ms, Some(5000));
        assert_eq!(config.view.copy_feedback_ms, 1000);
        assert_eq!(config.view.row_height, 24.0);
        assert_eq!(config.view.activity_log_capacity, 500);
    }

    #[test]
    fn missing_optional_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = ConfigSource::Optional(dir.path().join("absent.toml"));
        assert_eq!(load_from_source(&source).expect("defaults"), PanelConfig::default());
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = ConfigSource::Required(dir.path().join("absent.toml"));
        let err = load_from_source(&source).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[view]\nrow_height = \"tall\"\n").expect("write");
        let err = load_file(&path).expect_err("bad type");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
