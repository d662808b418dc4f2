//! rclone adapter.
//!
//! Invocation shape:
//!
//! ```text
//! rclone sync <source> <dest> --checksum --delete-during
//!     [--filter-from <file>] [--dry-run] [--verbose --progress]
//! ```

use super::{SyncEngine, SyncRequest, ToolCheck};
use crate::utils::SyncError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long a terminated engine gets to exit before it is killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RcloneEngine {
    binary: String,
    terminate_grace: Duration,
}

impl RcloneEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            terminate_grace: TERMINATE_GRACE,
        }
    }

    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Build the argument list for a request. Deterministic for a given request.
    pub fn build_args(request: &SyncRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "sync".into(),
            request.source.clone().into_os_string(),
            request.destination.clone().into_os_string(),
            "--checksum".into(),
            "--delete-during".into(),
        ];

        if let Some(filters) = &request.filters_file {
            args.push("--filter-from".into());
            args.push(filters.clone().into_os_string());
        }

        if request.dry_run {
            args.push("--dry-run".into());
        }

        if request.verbose {
            args.push("--verbose".into());
            args.push("--progress".into());
        }

        args
    }

    async fn terminate(&self, child: &mut Child) {
        if send_sigterm(child) {
            match tokio::time::timeout(self.terminate_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!("Sync engine exited after SIGTERM: {}", status);
                    return;
                }
                Ok(Err(e)) => warn!("Failed waiting for sync engine: {}", e),
                Err(_) => warn!(
                    "Sync engine still running {}s after SIGTERM, killing",
                    self.terminate_grace.as_secs()
                ),
            }
        }

        if let Err(e) = child.kill().await {
            warn!("Failed to kill sync engine: {}", e);
        }
    }
}

#[async_trait]
impl SyncEngine for RcloneEngine {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn probe(&self) -> ToolCheck {
        let output = match Command::new(&self.binary)
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!("Could not launch {}: {}", self.binary, e);
                return ToolCheck::unavailable();
            }
        };

        if !output.status.success() {
            debug!("{} version exited with {}", self.binary, output.status);
            return ToolCheck::unavailable();
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = resolve_path(&self.binary)
            .await
            .unwrap_or_else(|| PathBuf::from(&self.binary));

        ToolCheck {
            available: true,
            path: Some(path.display().to_string()),
            version: parse_version(&stdout),
        }
    }

    async fn sync(
        &self,
        request: &SyncRequest,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::build_args(request))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if request.verbose {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        }

        debug!("Launching {} for {}", self.binary, request.source.display());
        let mut child = cmd.spawn().map_err(SyncError::Launch)?;

        // Drain stderr concurrently so a chatty engine cannot block on a full pipe
        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = pipe.read_to_end(&mut buf).await {
                    warn!("Failed to read sync engine stderr: {}", e);
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match waited {
            Some(status) => status?,
            None => {
                self.terminate(&mut child).await;
                return Err(SyncError::Cancelled);
            }
        };

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            Err(SyncError::Exited {
                code: status.code(),
                stderr,
            })
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return false;
    };
    match i32::try_from(pid) {
        Ok(pid) => match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send SIGTERM to sync engine: {}", e);
                false
            }
        },
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}

/// `rclone v1.66.0\n- os/version: ...` -> `v1.66.0`
fn parse_version(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()?
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}

/// Resolve a command name to its full path
async fn resolve_path(command: &str) -> Option<PathBuf> {
    if Path::new(command).components().count() > 1 {
        return Some(PathBuf::from(command));
    }

    #[cfg(target_os = "windows")]
    let which_cmd = "where";
    #[cfg(not(target_os = "windows"))]
    let which_cmd = "which";

    let output = Command::new(which_cmd).arg(command).output().await.ok()?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        let first_line = path_str.lines().next()?.trim();
        if !first_line.is_empty() {
            return Some(PathBuf::from(first_line));
        }
    }
    None
}
