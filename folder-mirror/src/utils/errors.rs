//! Error types for the folder mirror.
//!
//! Two tiers exist: [`FatalError`] aborts a run before (or instead of)
//! processing sources, while [`SyncError`] is recorded against a single source
//! and never stops the run.

use std::path::PathBuf;
use thiserror::Error;

/// Rejections produced while loading or validating a machine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration must be a JSON object")]
    Malformed,

    #[error("Missing or invalid field: {0}")]
    MissingField(&'static str),

    #[error("Source at index {index} has an invalid '{field}'")]
    InvalidSource { index: usize, field: &'static str },

    #[error("Source at index {index} reuses the name '{name}'")]
    DuplicateSource { index: usize, name: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the optional `settings.toml`.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure of a single sync invocation.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to launch sync engine: {0}")]
    Launch(#[source] std::io::Error),

    #[error("{}", exit_message(.code, .stderr))]
    Exited { code: Option<i32>, stderr: String },

    #[error("Sync engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sync cancelled")]
    Cancelled,
}

fn exit_message(code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Conditions that abort a whole run.
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("Backup destination not found: {}", .0.display())]
    DestinationMissing(PathBuf),

    #[error("Sync engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("No configuration found at {}. Run with --init to create one.", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration {}: {source}", .path.display())]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

pub type Result<T> = std::result::Result<T, FatalError>;
