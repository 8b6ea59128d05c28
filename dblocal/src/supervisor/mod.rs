//! Supervision of the proxy stack: control-file watching, coalesced
//! reloads, and coordinated shutdown.
//!
//! Two workers run until shutdown. The watcher polls the control file and
//! raises the reload signal on change; the reloader owns the stack and
//! restarts it whenever a reload is pending. Shutdown is latched through a
//! [`CancellationToken`] and always wins over a pending reload.

pub mod head;
mod signal;
mod watcher;

pub use signal::ReloadSignal;
pub use watcher::ControlFileWatcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::proxy::{ProxyStack, StackError};

/// Upper bound on how long the reloader parks before re-checking state.
const RELOAD_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Owns the watcher and reloader workers for one proxy stack.
pub struct Supervisor<S: ProxyStack + 'static> {
    stack: Arc<Mutex<S>>,
    reload: Arc<ReloadSignal>,
    shutdown: CancellationToken,
    watcher: Option<JoinHandle<()>>,
    reloader: Option<JoinHandle<Result<(), StackError>>>,
    cleaned: bool,
}

impl<S: ProxyStack + 'static> Supervisor<S> {
    /// Start supervising: brings the stack up and spawns both workers.
    pub fn spawn(stack: S, control_file: impl Into<PathBuf>) -> Self {
        let stack = Arc::new(Mutex::new(stack));
        let reload = Arc::new(ReloadSignal::new());
        let shutdown = CancellationToken::new();

        let watcher = ControlFileWatcher::new(control_file);
        let watcher_handle = tokio::spawn(watcher.run(reload.clone(), shutdown.clone()));
        let reloader_handle = tokio::spawn(reloader_loop(
            stack.clone(),
            reload.clone(),
            shutdown.clone(),
        ));

        Self {
            stack,
            reload,
            shutdown,
            watcher: Some(watcher_handle),
            reloader: Some(reloader_handle),
            cleaned: false,
        }
    }

    /// Request a reload as if the control file had changed.
    pub fn request_reload(&self) {
        self.reload.raise();
    }

    /// Wait for the reloader to finish.
    ///
    /// Returns the error that brought it down when the initial stack start
    /// failed; under normal operation this only resolves after
    /// [`cleanup`](Self::cleanup) cancels the workers from another task.
    ///
    /// Cancellation-safe: callers race this against signal futures, so the
    /// join handle is only consumed once the reloader has actually
    /// finished. A dropped `wait` leaves the handle for
    /// [`cleanup`](Self::cleanup) to join.
    pub async fn wait(&mut self) -> Result<(), StackError> {
        let Some(handle) = self.reloader.as_mut() else {
            return Ok(());
        };
        let joined = handle.await;
        self.reloader = None;
        match joined {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "reload worker panicked");
                Ok(())
            }
        }
    }

    /// Shut everything down: stop the workers, stop the stack, then
    /// release the branch. Idempotent.
    pub async fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        info!("shutting down");
        self.shutdown.cancel();
        // Wake the reloader if it is parked on the signal.
        self.reload.raise();

        if let Some(handle) = self.reloader.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "reload worker failed"),
                Err(e) => error!(error = %e, "reload worker panicked"),
            }
        }
        if let Some(handle) = self.watcher.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "watcher panicked");
            }
        }

        self.stack.lock().await.cleanup_branch().await;
        info!("shutdown complete");
    }
}

/// The reloader worker: initial start, then restart-on-signal until
/// cancelled, with a final stop on the way out.
///
/// A failed initial start is fatal. A failed restart is not: the stack
/// stays down and the next signal tries again, so a transient API outage
/// during a branch switch does not kill the supervisor.
pub(crate) async fn reloader_loop<S: ProxyStack>(
    stack: Arc<Mutex<S>>,
    reload: Arc<ReloadSignal>,
    shutdown: CancellationToken,
) -> Result<(), StackError> {
    stack.lock().await.start().await?;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = reload.notified() => {}
            _ = tokio::time::sleep(RELOAD_WAIT_TIMEOUT) => {}
        }

        if shutdown.is_cancelled() {
            break;
        }
        if !reload.take() {
            continue;
        }

        let mut stack = stack.lock().await;
        // Shutdown may have latched while this task was parked; a reload
        // now could re-create a branch that cleanup is about to delete.
        if shutdown.is_cancelled() {
            break;
        }

        debug!("reloading proxy stack");
        stack.stop().await;
        if let Err(e) = stack.start().await {
            error!(error = %e, "reload failed, waiting for next change");
        }
    }

    stack.lock().await.stop().await;
    Ok(())
}
