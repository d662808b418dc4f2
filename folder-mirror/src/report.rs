//! Run reporting.
//!
//! The orchestrator reports through an injected [`EventSink`] instead of a
//! global logger. Production uses [`TracingSink`], which forwards to the
//! `tracing` subscriber set up in [`crate::utils::logger`].

use crate::executor::BackupSummary;
use std::fmt;
use std::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLevel::Info => write!(f, "INFO"),
            EventLevel::Success => write!(f, "SUCCESS"),
            EventLevel::Warn => write!(f, "WARN"),
            EventLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Destination for leveled run events.
pub trait EventSink: Send + Sync {
    fn emit(&self, level: EventLevel, message: &str);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, level: EventLevel, message: &str) {
        (**self).emit(level, message);
    }
}

/// Forwards events to `tracing`. `SUCCESS` has no tracing level of its own
/// and is logged at INFO with `outcome = "success"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Info => info!("{}", message),
            EventLevel::Success => info!(outcome = "success", "{}", message),
            EventLevel::Warn => warn!("{}", message),
            EventLevel::Error => error!("{}", message),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(EventLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(EventLevel, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn messages_at(&self, level: EventLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, level: EventLevel, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, message.to_string()));
        }
    }
}

/// Emit the end-of-run summary block.
pub fn report_summary(sink: &dyn EventSink, summary: &BackupSummary) {
    let elapsed = (summary.end_time - summary.start_time)
        .to_std()
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    sink.emit(
        EventLevel::Info,
        &format!(
            "Summary for {}{}: {} succeeded, {} failed, {} skipped (disabled), {} total in {}",
            summary.machine_name,
            if summary.dry_run { " (dry run)" } else { "" },
            summary.success_count,
            summary.fail_count,
            summary.skipped_count,
            summary.total_sources,
            format_duration_ms(elapsed),
        ),
    );

    for result in summary.results.iter().filter(|r| !r.success) {
        sink.emit(
            EventLevel::Error,
            &format!(
                "  {}: {}",
                result.source.name,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        );
    }

    if summary.fail_count == 0 {
        sink.emit(EventLevel::Success, "All enabled sources mirrored");
    } else if summary.dry_run {
        sink.emit(
            EventLevel::Warn,
            "Dry run reported failures; no changes were made",
        );
    }
}

/// Format milliseconds as a short human-readable duration
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        return format!("{}ms", ms);
    }
    let seconds = ms / 1000;
    if seconds < 60 {
        format!("{}.{}s", seconds, (ms % 1000) / 100)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackupSource;
    use crate::executor::BackupResult;
    use chrono::{Duration, Local};
    use uuid::Uuid;

    fn source(name: &str) -> BackupSource {
        BackupSource {
            name: name.to_string(),
            path: format!("/data/{}", name),
            enabled: true,
        }
    }

    #[test]
    fn test_level_display() {
        assert_eq!(EventLevel::Info.to_string(), "INFO");
        assert_eq!(EventLevel::Success.to_string(), "SUCCESS");
        assert_eq!(EventLevel::Warn.to_string(), "WARN");
        assert_eq!(EventLevel::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let by_ref: &dyn EventSink = &sink;
        by_ref.emit(EventLevel::Info, "one");
        by_ref.emit(EventLevel::Error, "two");
        by_ref.emit(EventLevel::Info, "three");

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.messages_at(EventLevel::Info), vec!["one", "three"]);
        assert_eq!(sink.messages_at(EventLevel::Error), vec!["two"]);
    }

    #[test]
    fn test_report_summary_lists_failures() {
        let start = Local::now();
        let summary = BackupSummary::new(
            Uuid::new_v4(),
            "H1".to_string(),
            start,
            start + Duration::milliseconds(1500),
            3,
            vec![
                BackupResult::succeeded(source("a"), 1200),
                BackupResult::failed(source("b"), "Source path not found", None),
            ],
            false,
        );

        let sink = MemorySink::new();
        report_summary(&sink, &summary);

        let info = sink.messages_at(EventLevel::Info);
        assert_eq!(
            info[0],
            "Summary for H1: 1 succeeded, 1 failed, 1 skipped (disabled), 2 total in 1.5s"
        );
        assert_eq!(sink.messages_at(EventLevel::Error), vec!["  b: Source path not found"]);
        assert!(sink.messages_at(EventLevel::Success).is_empty());
    }

    #[test]
    fn test_report_summary_dry_run_warns() {
        let start = Local::now();
        let summary = BackupSummary::new(
            Uuid::new_v4(),
            "H1".to_string(),
            start,
            start,
            1,
            vec![BackupResult::failed(source("b"), "Source path not found", None)],
            true,
        );

        let sink = MemorySink::new();
        report_summary(&sink, &summary);
        assert_eq!(sink.messages_at(EventLevel::Warn).len(), 1);
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(0), "0ms");
        assert_eq!(format_duration_ms(999), "999ms");
        assert_eq!(format_duration_ms(1500), "1.5s");
        assert_eq!(format_duration_ms(90_000), "1m 30s");
        assert_eq!(format_duration_ms(3_665_000), "1h 1m");
    }
}
