//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Runtime settings, usually loaded from `kite.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub script: ScriptSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory all file transfer paths are resolved against.
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Run queued promise jobs after every timer callback.
    pub drain_pending_jobs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            script: ScriptSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
        }
    }
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            drain_pending_jobs: true,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.storage.root, PathBuf::from("data"));
        assert!(settings.script.drain_pending_jobs);
        assert_eq!(settings.log.filter, "info");
    }

    #[test]
    fn partial_sections_override_only_their_keys() {
        let settings = Settings::from_toml_str(
            r#"
            [storage]
            root = "/srv/kite"

            [log]
            filter = "kite_core=debug"
            "#,
        )
        .unwrap();
        assert_eq!(settings.storage.root, PathBuf::from("/srv/kite"));
        assert_eq!(settings.log.filter, "kite_core=debug");
        assert!(settings.script.drain_pending_jobs);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Settings::from_toml_str("[storage\nroot = 1").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("kite.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
