//! SIGINT / SIGTERM handling.
//!
//! A signal cancels the run token. The orchestrator then terminates the sync
//! engine that is currently running, records it as failed, and marks every
//! source that has not started yet as cancelled.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shutdown coordinator
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled once a shutdown signal arrives
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[cfg(test)]
    fn trigger(&self) {
        self.token.cancel();
    }

    /// Listen for SIGINT/SIGTERM in the background
    pub fn listen(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_signal() => token.cancel(),
                _ = token.cancelled() => {}
            }
        })
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), stopping after the current source is terminated...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping after the current source is terminated...");
        }
    }
}
