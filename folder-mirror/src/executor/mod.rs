//! Backup run orchestrator.
//!
//! A run moves through fixed stages:
//! prerequisites -> configuration -> sources -> summary.
//!
//! Prerequisite and configuration problems are fatal and returned as
//! [`FatalError`] before any source is touched. Everything that goes wrong
//! with a single source is recorded in its [`BackupResult`] and the loop moves
//! on to the next one. Sources run strictly one after another.

pub mod summary;

pub use summary::{BackupResult, BackupSummary, EXIT_FAILURE, EXIT_SUCCESS};

use crate::config::{BackupSource, MachineConfig};
use crate::paths::PathConfig;
use crate::report::{self, EventLevel, EventSink};
use crate::sync::{SyncEngine, SyncRequest};
use crate::utils::{FatalError, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Recorded when a source folder does not exist on disk.
pub const SOURCE_NOT_FOUND: &str = "Source path not found";
/// Recorded for sources never started because the run was cancelled.
pub const RUN_CANCELLED: &str = "Run cancelled";

/// Fixed inputs of a run, resolved once by the caller.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub paths: PathConfig,
    pub machine_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    pub verbose: bool,
}

/// Main backup orchestrator
pub struct Orchestrator<E, S> {
    config: OrchestratorConfig,
    engine: E,
    sink: S,
    cancel_token: CancellationToken,
}

impl<E: SyncEngine, S: EventSink> Orchestrator<E, S> {
    /// Create a new orchestrator (no cancellation support)
    pub fn new(config: OrchestratorConfig, engine: E, sink: S) -> Self {
        Self {
            config,
            engine,
            sink,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token, typically fed by the shutdown coordinator
    pub fn with_cancel(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Execute one backup run
    pub async fn run(&self, options: RunOptions) -> Result<BackupSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, machine = %self.config.machine_name);
        self.run_inner(run_id, options).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, options: RunOptions) -> Result<BackupSummary> {
        let start_time = Local::now();
        self.emit(
            EventLevel::Info,
            format!(
                "Starting backup for {}{}",
                self.config.machine_name,
                if options.dry_run { " (dry run)" } else { "" }
            ),
        );

        self.validate_prereqs().await?;
        let machine_config = load_machine_config(&self.config.paths)?;

        if machine_config.machine_name != self.config.machine_name {
            self.emit(
                EventLevel::Warn,
                format!(
                    "Configuration names machine '{}' but this host is '{}'",
                    machine_config.machine_name, self.config.machine_name
                ),
            );
        }

        let enabled: Vec<&BackupSource> = machine_config.enabled_sources().collect();
        let results = if enabled.is_empty() {
            self.emit(
                EventLevel::Warn,
                format!(
                    "No enabled sources in {}",
                    self.config.paths.machine_config_file.display()
                ),
            );
            Vec::new()
        } else {
            self.process_sources(&enabled, options).await
        };

        let summary = BackupSummary::new(
            run_id,
            self.config.machine_name.clone(),
            start_time,
            Local::now(),
            machine_config.sources.len(),
            results,
            options.dry_run,
        );
        report::report_summary(&self.sink, &summary);

        Ok(summary)
    }

    async fn validate_prereqs(&self) -> Result<()> {
        let backups_dir = &self.config.paths.backups_dir;
        if !backups_dir.is_dir() {
            return Err(FatalError::DestinationMissing(backups_dir.clone()));
        }

        let check = self.engine.probe().await;
        if !check.available {
            return Err(FatalError::EngineUnavailable(format!(
                "'{}' was not found or could not be run",
                self.engine.name()
            )));
        }

        self.emit(
            EventLevel::Info,
            format!(
                "Using {} {} ({})",
                self.engine.name(),
                check.version.as_deref().unwrap_or("(unknown version)"),
                check.path.as_deref().unwrap_or("path unknown")
            ),
        );
        Ok(())
    }

    async fn process_sources(
        &self,
        sources: &[&BackupSource],
        options: RunOptions,
    ) -> Vec<BackupResult> {
        let filters_file = self.filters_file();
        if let Some(filters) = &filters_file {
            self.emit(
                EventLevel::Info,
                format!("Applying filter rules from {}", filters.display()),
            );
        }

        let mut results = Vec::with_capacity(sources.len());
        for (idx, source) in sources.iter().enumerate() {
            info!("Processing source {}/{}: {}", idx + 1, sources.len(), source.name);
            let result = self.process_source(source, filters_file.as_deref(), options).await;
            results.push(result);
        }
        results
    }

    async fn process_source(
        &self,
        source: &BackupSource,
        filters_file: Option<&Path>,
        options: RunOptions,
    ) -> BackupResult {
        if self.cancel_token.is_cancelled() {
            self.emit(EventLevel::Warn, format!("[{}] Skipped: {}", source.name, RUN_CANCELLED));
            return BackupResult::failed(source.clone(), RUN_CANCELLED, None);
        }

        let source_path = Path::new(&source.path);
        if !source_path.exists() {
            return self.source_missing(source);
        }

        let destination = self.config.paths.destination_for(&source.name);
        self.emit(
            EventLevel::Info,
            format!(
                "[{}] {} -> {}",
                source.name,
                source_path.display(),
                destination.display()
            ),
        );

        // Dry runs leave the destination tree untouched
        if !options.dry_run {
            if let Err(e) = std::fs::create_dir_all(&destination) {
                let message = format!(
                    "Failed to create destination {}: {}",
                    destination.display(),
                    e
                );
                self.emit(EventLevel::Error, format!("[{}] {}", source.name, message));
                return BackupResult::failed(source.clone(), message, None);
            }
        }

        // The run is unattended; the folder may have vanished since the first check
        if !source_path.exists() {
            return self.source_missing(source);
        }

        let request = SyncRequest {
            source: source_path.to_path_buf(),
            destination,
            filters_file: filters_file.map(Path::to_path_buf),
            dry_run: options.dry_run,
            verbose: options.verbose,
        };

        let started = Instant::now();
        let outcome = self.engine.sync(&request, &self.cancel_token).await;
        let elapsed = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                self.emit(
                    EventLevel::Success,
                    format!(
                        "[{}] {} in {}",
                        source.name,
                        if options.dry_run { "Checked" } else { "Mirrored" },
                        report::format_duration_ms(elapsed)
                    ),
                );
                BackupResult::succeeded(source.clone(), elapsed)
            }
            Err(e) => {
                let message = e.to_string();
                self.emit(EventLevel::Error, format!("[{}] Sync failed: {}", source.name, message));
                BackupResult::failed(source.clone(), message, Some(elapsed))
            }
        }
    }

    fn source_missing(&self, source: &BackupSource) -> BackupResult {
        self.emit(
            EventLevel::Error,
            format!("[{}] {}: {}", source.name, SOURCE_NOT_FOUND, source.path),
        );
        BackupResult::failed(source.clone(), SOURCE_NOT_FOUND, None)
    }

    fn filters_file(&self) -> Option<PathBuf> {
        let path = &self.config.paths.filters_file;
        if path.is_file() {
            Some(path.clone())
        } else {
            debug!("No filter rules at {}", path.display());
            None
        }
    }

    fn emit(&self, level: EventLevel, message: String) {
        self.sink.emit(level, &message);
    }
}

/// Load this machine's configuration, mapping every problem to a fatal error.
pub fn load_machine_config(paths: &PathConfig) -> Result<MachineConfig> {
    let path = &paths.machine_config_file;
    if !path.is_file() {
        return Err(FatalError::ConfigNotFound(path.clone()));
    }

    MachineConfig::load(path).map_err(|source| FatalError::InvalidConfig {
        path: path.clone(),
        source,
    })
}
