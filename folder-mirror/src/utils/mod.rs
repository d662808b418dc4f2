//! Utility modules for the folder mirror.

pub mod errors;
pub mod logger;

pub use errors::{ConfigError, FatalError, Result, SettingsError, SyncError};
