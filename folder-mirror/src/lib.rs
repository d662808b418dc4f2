//! Folder Mirror Library
//!
//! Mirrors a per-machine list of local folders into `backups/<machine>/<name>`
//! by driving an external sync engine (rclone), one source at a time.

pub mod commands;
pub mod config;
pub mod executor;
pub mod paths;
pub mod report;
pub mod shutdown;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use config::{BackupSource, MachineConfig, Settings};
pub use executor::{BackupResult, BackupSummary, Orchestrator, OrchestratorConfig, RunOptions};
pub use paths::PathConfig;
pub use utils::errors::{ConfigError, FatalError, SyncError};
