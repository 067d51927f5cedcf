use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, warn};

/// Grace window between SIGTERM and SIGKILL when a child overruns its timeout.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Result of one CLI invocation
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub status: OutcomeStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failed,
    Timeout,
}

/// Invokes the external CLI with a bounded wait.
///
/// Each call spawns one child process with no stdin and piped stdout/stderr.
/// A child that does not finish within the timeout is terminated before the
/// call returns, so no process outlives its request.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    cli_path: PathBuf,
}

impl CliExecutor {
    pub fn new(cli_path: impl Into<PathBuf>) -> Self {
        Self {
            cli_path: cli_path.into(),
        }
    }

    pub fn cli_path(&self) -> &Path {
        &self.cli_path
    }

    pub async fn run(
        &self,
        subcommand: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutcome> {
        let start = Instant::now();

        let mut child = Command::new(&self.cli_path)
            .arg(subcommand)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.cli_path.display()))?;

        let child_id = child.id();
        debug!("spawned {} (pid {:?})", subcommand, child_id);

        let mut stdout = child.stdout.take().context("failed to capture stdout")?;
        let mut stderr = child.stderr.take().context("failed to capture stderr")?;

        // Drain both streams concurrently with the wait; reading after the
        // fact would deadlock on a child that fills a pipe buffer.
        let stdout_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        match tokio_timeout(timeout, child.wait()).await {
            Ok(wait_result) => {
                let status = wait_result.context("failed to wait for child")?;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();

                let outcome_status = if status.success() {
                    OutcomeStatus::Success
                } else {
                    OutcomeStatus::Failed
                };

                Ok(ProcessOutcome {
                    status: outcome_status,
                    exit_code: status.code(),
                    stdout,
                    stderr,
                    duration: start.elapsed(),
                })
            }
            Err(_) => {
                warn!(
                    "{} exceeded its {}s timeout, terminating pid {:?}",
                    subcommand,
                    timeout.as_secs(),
                    child_id
                );
                self.terminate(&mut child, child_id).await;

                // Pipes close once the child is gone. Bound the drain anyway:
                // a leaked grandchild could keep the write end open.
                let stdout = match tokio_timeout(TERM_GRACE, stdout_task).await {
                    Ok(Ok(buf)) => buf,
                    _ => String::new(),
                };
                let stderr = match tokio_timeout(TERM_GRACE, stderr_task).await {
                    Ok(Ok(buf)) => buf,
                    _ => String::new(),
                };

                Ok(ProcessOutcome {
                    status: OutcomeStatus::Timeout,
                    exit_code: None,
                    stdout,
                    stderr,
                    duration: start.elapsed(),
                })
            }
        }
    }

    /// SIGTERM, short grace window, then SIGKILL. Best-effort: the child may
    /// exit on its own between signals.
    async fn terminate(&self, child: &mut Child, pid: Option<u32>) {
        if let Err(e) = self.send_sigterm(child, pid) {
            debug!("SIGTERM failed (child may have exited): {e}");
        }

        if tokio_timeout(TERM_GRACE, child.wait()).await.is_err() {
            if let Err(e) = self.send_sigkill(child, pid).await {
                debug!("SIGKILL failed (child may have exited): {e}");
            }
            let _ = tokio_timeout(TERM_GRACE, child.wait()).await;
        }
    }

    #[cfg(unix)]
    fn send_sigterm(&self, child: &mut Child, pid: Option<u32>) -> Result<()> {
        if let Some(pid) = pid {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            debug!("sending SIGTERM to pid {}", pid);
            kill(Pid::from_raw(pid as i32), Signal::SIGTERM).context("failed to send SIGTERM")?;
        } else {
            child.start_kill().context("failed to send SIGTERM")?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn send_sigterm(&self, child: &mut Child, _pid: Option<u32>) -> Result<()> {
        child.start_kill().context("failed to terminate process")?;
        Ok(())
    }

    #[cfg(unix)]
    async fn send_sigkill(&self, child: &mut Child, pid: Option<u32>) -> Result<()> {
        if let Some(pid) = pid {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            debug!("sending SIGKILL to pid {}", pid);
            kill(Pid::from_raw(pid as i32), Signal::SIGKILL).context("failed to send SIGKILL")?;
        } else {
            child.kill().await.context("failed to kill process")?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn send_sigkill(&self, child: &mut Child, _pid: Option<u32>) -> Result<()> {
        child.kill().await.context("failed to kill process")?;
        Ok(())
    }
}
