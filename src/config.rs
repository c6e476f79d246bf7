//! Editor settings.

use crate::versions::DEFAULT_MAX_VERSIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_PLACEHOLDER: &str = "Type something here…";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Settings read from a JSON file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EditorConfig {
    /// Quiet period after the last edit before a save is sent.
    pub debounce_ms: u64,
    pub max_versions: usize,
    /// Shown in an empty block holding the caret.
    pub placeholder: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_versions: DEFAULT_MAX_VERSIONS,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_versions == 0 {
            return Err(ConfigError::Invalid("maxVersions must be at least 1"));
        }
        Ok(())
    }
}
