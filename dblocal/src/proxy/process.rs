//! Lifecycle of a single supervised child process.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// Grace period between SIGTERM and SIGKILL on stop.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Child process errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Opening the child's log file failed.
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        /// Log file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Spawning the executable failed.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        /// Process name.
        name: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A child process whose stdout and stderr are appended to a log file and
/// which is stopped with SIGTERM, escalating to SIGKILL after a grace
/// period.
#[derive(Debug)]
pub struct ManagedProcess {
    name: &'static str,
    child: Child,
}

impl ManagedProcess {
    /// Spawn `program` with `args`, sending its output to `log_path`.
    pub fn spawn(
        name: &'static str,
        program: &Path,
        args: &[&str],
        log_path: &Path,
    ) -> Result<Self, ProcessError> {
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|source| ProcessError::LogFile {
                path: log_path.display().to_string(),
                source,
            })?;
        let stderr_log = log
            .try_clone()
            .map_err(|source| ProcessError::LogFile {
                path: log_path.display().to_string(),
                source,
            })?;

        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr_log))
            .spawn()
            .map_err(|source| ProcessError::Spawn { name, source })?;

        info!(process = name, pid = child.id(), "process started");
        Ok(Self { name, child })
    }

    /// Stop the process: SIGTERM, wait up to the grace period, then SIGKILL.
    pub async fn stop(mut self) {
        let Some(pid) = self.child.id() else {
            // Already reaped.
            return;
        };

        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(process = self.name, pid = pid, error = %e, "SIGTERM failed");
        }

        match tokio::time::timeout(STOP_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(process = self.name, %status, "process exited");
                return;
            }
            Ok(Err(e)) => {
                warn!(process = self.name, error = %e, "wait failed");
                return;
            }
            Err(_) => {
                warn!(process = self.name, pid = pid, "grace period elapsed, killing");
            }
        }

        if let Err(e) = self.child.start_kill() {
            warn!(process = self.name, error = %e, "SIGKILL failed");
        }
        if let Err(e) = self.child.wait().await {
            warn!(process = self.name, error = %e, "wait after kill failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_spawn_writes_output_to_log() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("proc.log");

        let proc = ManagedProcess::spawn(
            "echo",
            Path::new("/bin/sh"),
            &["-c", "echo hello"],
            &log,
        )
        .unwrap();
        proc.stop().await;

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("hello"));
    }

    #[tokio::test]
    async fn test_stop_terminates_long_running_process() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("proc.log");

        let proc = ManagedProcess::spawn(
            "sleeper",
            Path::new("/bin/sh"),
            &["-c", "sleep 300"],
            &log,
        )
        .unwrap();

        let started = std::time::Instant::now();
        proc.stop().await;
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("proc.log");

        let err = ManagedProcess::spawn(
            "ghost",
            Path::new("/nonexistent/bin"),
            &[],
            &log,
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
