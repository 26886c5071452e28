//! Injected configuration objects.
//!
//! # Responsibility
//! - Hold controller timing and bibliography defaults (`CoreConfig`).
//! - Hold the author profile used by persona templates (`UserSettings`).
//!
//! # Invariants
//! - Every field has a default, so a partial or missing file still loads.
//! - Configuration is passed in explicitly; core keeps no global settings.

use crate::logging::default_log_level;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

const DEFAULT_PREVIEW_DEBOUNCE_MS: u64 = 500;
const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 60;
const DEFAULT_BIB_FILE: &str = "references.bib";

/// Controller and renderer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Quiet period before a live preview re-render.
    pub preview_debounce_ms: u64,
    /// Period of the silent autosave check.
    pub autosave_interval_secs: u64,
    /// Bibliography file used when the project does not name one.
    pub default_bib_file: String,
    /// Log level passed to `init_logging_from_config`.
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            preview_debounce_ms: DEFAULT_PREVIEW_DEBOUNCE_MS,
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            default_bib_file: DEFAULT_BIB_FILE.to_string(),
            log_level: default_log_level().to_string(),
        }
    }
}

impl CoreConfig {
    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

/// Author profile used to pre-fill persona frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub name: String,
    pub affiliation: String,
    pub company: String,
    pub profession: String,
    pub email: String,
    pub phone: String,
}

/// Configuration file load errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read config: {err}"),
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

/// Loads `CoreConfig` from a JSON file; a missing file yields defaults.
pub fn load_core_config(path: impl AsRef<Path>) -> Result<CoreConfig, ConfigError> {
    load_json_or_default(path.as_ref())
}

/// Loads `UserSettings` from a JSON file; a missing file yields defaults.
pub fn load_user_settings(path: impl AsRef<Path>) -> Result<UserSettings, ConfigError> {
    load_json_or_default(path.as_ref())
}

fn load_json_or_default<T>(path: &Path) -> Result<T, ConfigError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "event=config_load module=config status=default path={}",
                path.display()
            );
            return Ok(T::default());
        }
        Err(err) => {
            warn!(
                "event=config_load module=config status=error path={} error={}",
                path.display(),
                err
            );
            return Err(ConfigError::Io(err));
        }
    };

    serde_json::from_str(&text).map_err(ConfigError::Parse)
}
