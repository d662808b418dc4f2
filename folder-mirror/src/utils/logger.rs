//! Logging configuration using tracing.
//!
//! Events go to the console and, when a log directory is given, are appended
//! to `backup-YYYY-MM-DD.log` inside it. The file is reopened per event so a
//! run crossing midnight rolls over to the next day's file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified level
pub fn init(level: &str, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(DailyLogWriter::new(dir)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Append-only writer targeting one file per calendar day.
#[derive(Debug, Clone)]
pub struct DailyLogWriter {
    dir: PathBuf,
}

impl DailyLogWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of today's log file.
    pub fn current_path(&self) -> PathBuf {
        let today = chrono::Local::now().format("%Y-%m-%d");
        self.dir.join(format!("backup-{}.log", today))
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())
    }
}

impl<'a> MakeWriter<'a> for DailyLogWriter {
    type Writer = Box<dyn io::Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match self.open() {
            Ok(file) => Box::new(file),
            // Unwritable log file: drop the line, keep the console output
            Err(_) => Box::new(io::sink()),
        }
    }
}
