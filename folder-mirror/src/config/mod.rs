//! Configuration for the folder mirror.
//!
//! Two layers: [`Settings`] tunes the tool itself and is read from an optional
//! TOML file with environment variable overrides, while [`machine`] holds the
//! per-machine list of folders to mirror.

pub mod machine;

pub use machine::{BackupSource, MachineConfig};

use crate::utils::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`SyncSettings::binary`].
pub const ENV_SYNC_BINARY: &str = "FOLDER_MIRROR_SYNC_BINARY";
/// Environment variable overriding [`LogSettings::level`].
pub const ENV_LOG_LEVEL: &str = "FOLDER_MIRROR_LOG_LEVEL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Sync engine executable (name on PATH or absolute path)
    #[serde(default = "default_sync_binary")]
    pub binary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also append to the daily log file under `logs/`
    #[serde(default = "default_to_file")]
    pub to_file: bool,
}

// Default values
fn default_sync_binary() -> String {
    "rclone".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_to_file() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            binary: default_sync_binary(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_to_file(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from `path` if it exists, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = if path.is_file() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply overrides looked up through `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(binary) = lookup(ENV_SYNC_BINARY).filter(|v| !v.trim().is_empty()) {
            self.sync.binary = binary;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log.level = level;
        }
    }
}
