//! External sync engine abstraction.
//!
//! The orchestrator never transfers files itself; it hands a [`SyncRequest`]
//! to a [`SyncEngine`] and only looks at the binary outcome.

pub mod rclone;

pub use rclone::RcloneEngine;

use crate::utils::SyncError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// One mirror operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Exclusion rules handed to the engine; only set when the file exists
    pub filters_file: Option<PathBuf>,
    pub dry_run: bool,
    pub verbose: bool,
}

/// Point-in-time result of probing for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCheck {
    pub available: bool,
    pub path: Option<String>,
    pub version: Option<String>,
}

impl ToolCheck {
    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait SyncEngine: Send + Sync {
    /// Human-readable engine name for log lines.
    fn name(&self) -> &str;

    /// Check whether the engine can be launched.
    async fn probe(&self) -> ToolCheck;

    /// Mirror `request.source` onto `request.destination`.
    ///
    /// Cancelling `cancel` terminates the running engine and yields
    /// [`SyncError::Cancelled`].
    async fn sync(
        &self,
        request: &SyncRequest,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError>;
}

#[async_trait]
impl<T: SyncEngine + ?Sized> SyncEngine for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn probe(&self) -> ToolCheck {
        (**self).probe().await
    }

    async fn sync(
        &self,
        request: &SyncRequest,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        (**self).sync(request, cancel).await
    }
}
