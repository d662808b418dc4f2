//! Per-source results and the run summary built from them.

use crate::config::BackupSource;
use chrono::{DateTime, Local};
use uuid::Uuid;

/// Exit code for a run without failures (or any dry run).
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for fatal errors and real runs with failed sources.
pub const EXIT_FAILURE: u8 = 1;

/// Outcome of one attempted source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupResult {
    pub source: BackupSource,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl BackupResult {
    pub fn succeeded(source: BackupSource, duration_ms: u64) -> Self {
        Self {
            source,
            success: true,
            error: None,
            duration_ms: Some(duration_ms),
        }
    }

    pub fn failed(
        source: BackupSource,
        error: impl Into<String>,
        duration_ms: Option<u64>,
    ) -> Self {
        Self {
            source,
            success: false,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Read-only record of a finished run.
#[derive(Debug, Clone)]
pub struct BackupSummary {
    pub run_id: Uuid,
    pub machine_name: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    /// Enabled sources, i.e. the number of results
    pub total_sources: usize,
    pub success_count: usize,
    pub fail_count: usize,
    /// Configured but disabled sources
    pub skipped_count: usize,
    pub results: Vec<BackupResult>,
    pub dry_run: bool,
}

impl BackupSummary {
    /// Aggregate `results`, one per enabled source, out of `configured` sources.
    pub fn new(
        run_id: Uuid,
        machine_name: String,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
        configured: usize,
        results: Vec<BackupResult>,
        dry_run: bool,
    ) -> Self {
        let total_sources = results.len();
        let success_count = results.iter().filter(|r| r.success).count();

        Self {
            run_id,
            machine_name,
            start_time,
            end_time,
            total_sources,
            success_count,
            fail_count: total_sources - success_count,
            skipped_count: configured.saturating_sub(total_sources),
            results,
            dry_run,
        }
    }

    /// A dry run never signals failure through the exit code.
    pub fn exit_code(&self) -> u8 {
        if self.fail_count == 0 || self.dry_run {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}
