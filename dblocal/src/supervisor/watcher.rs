//! Control-file change detection.
//!
//! The control file is polled on a fixed interval and hashed; any digest
//! change, including the file appearing or disappearing, raises the
//! reload signal. Polling rather than inotify keeps the watcher working
//! across bind mounts and overlay filesystems where change events are
//! unreliable.

use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::signal::ReloadSignal;

/// Default poll interval.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls the control file and raises the reload signal on content change.
pub struct ControlFileWatcher {
    path: PathBuf,
    interval: Duration,
}

impl ControlFileWatcher {
    /// Watcher over `path` with the default poll interval.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: POLL_INTERVAL,
        }
    }

    /// Override the poll interval.
    #[cfg(test)]
    pub fn with_interval(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
        }
    }

    fn digest(&self) -> Option<[u8; 32]> {
        let contents = std::fs::read(&self.path).ok()?;
        Some(Sha256::digest(&contents).into())
    }

    /// Poll until cancelled, raising `signal` whenever the file's digest
    /// changes from the last observation.
    pub async fn run(self, signal: Arc<ReloadSignal>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last = self.digest();
        debug!(path = %self.path.display(), "watching control file");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let current = self.digest();
            if current != last {
                info!(path = %self.path.display(), "control file changed");
                last = current;
                signal.raise();
            }
        }

        debug!("control file watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FAST: Duration = Duration::from_millis(10);

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_content_change_raises_signal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HEAD");
        std::fs::write(&path, "ref: refs/heads/main\n").unwrap();

        let signal = Arc::new(ReloadSignal::new());
        let shutdown = CancellationToken::new();
        let watcher = ControlFileWatcher::with_interval(&path, FAST);
        let handle = tokio::spawn(watcher.run(signal.clone(), shutdown.clone()));

        settle().await;
        assert!(!signal.take());

        std::fs::write(&path, "ref: refs/heads/feature\n").unwrap();
        settle().await;
        assert!(signal.take());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unchanged_file_stays_quiet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HEAD");
        std::fs::write(&path, "ref: refs/heads/main\n").unwrap();

        let signal = Arc::new(ReloadSignal::new());
        let shutdown = CancellationToken::new();
        let watcher = ControlFileWatcher::with_interval(&path, FAST);
        let handle = tokio::spawn(watcher.run(signal.clone(), shutdown.clone()));

        settle().await;
        assert!(!signal.take());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_file_appearing_raises_signal_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HEAD");

        let signal = Arc::new(ReloadSignal::new());
        let shutdown = CancellationToken::new();
        let watcher = ControlFileWatcher::with_interval(&path, FAST);
        let handle = tokio::spawn(watcher.run(signal.clone(), shutdown.clone()));

        settle().await;
        assert!(!signal.take());

        std::fs::write(&path, "ref: refs/heads/main\n").unwrap();
        settle().await;
        assert!(signal.take());
        // No further changes, no further signals.
        settle().await;
        assert!(!signal.take());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_stops_watcher() {
        let dir = TempDir::new().unwrap();
        let signal = Arc::new(ReloadSignal::new());
        let shutdown = CancellationToken::new();
        let watcher = ControlFileWatcher::with_interval(dir.path().join("HEAD"), FAST);
        let handle = tokio::spawn(watcher.run(signal, shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
