//! Edge-triggered reload signalling between the watcher and the reloader.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A coalescing reload request.
///
/// Any number of [`raise`](Self::raise) calls before the next
/// [`take`](Self::take) collapse into a single pending request, so a burst
/// of control-file changes causes one reload, not a queue of them.
#[derive(Default)]
pub struct ReloadSignal {
    pending: AtomicBool,
    notify: Notify,
}

impl ReloadSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a reload as pending and wake one waiter.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Consume the pending flag, returning whether a reload was requested.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    /// Wait until the signal is raised.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_pending_flag() {
        let signal = ReloadSignal::new();
        assert!(!signal.take());

        signal.raise();
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn test_multiple_raises_coalesce() {
        let signal = ReloadSignal::new();
        signal.raise();
        signal.raise();
        signal.raise();
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[tokio::test]
    async fn test_notified_wakes_on_raise() {
        let signal = std::sync::Arc::new(ReloadSignal::new());
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move {
                signal.notified().await;
                signal.take()
            })
        };
        tokio::task::yield_now().await;
        signal.raise();
        assert!(waiter.await.unwrap());
    }
}
