//! One-shot delayed refresh.
//!
//! Commands take effect on the server a moment after they are accepted,
//! so a second refresh is scheduled shortly after the immediate one.
//! Scheduling again replaces the pending timer; dropping the owner aborts
//! it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Owner of at most one pending delayed refresh.
#[derive(Debug)]
pub struct DelayedRefresh {
    signal: Arc<Notify>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DelayedRefresh {
    /// Create a timer that pokes `signal` when it fires.
    pub const fn new(signal: Arc<Notify>) -> Self {
        Self {
            signal,
            pending: Mutex::new(None),
        }
    }

    /// Fire after `delay`, cancelling any timer already pending.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, delay: Duration) {
        let signal = Arc::clone(&self.signal);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            signal.notify_one();
        });
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&self) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = pending {
            handle.abort();
        }
    }

    /// Whether a timer is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DelayedRefresh {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let signal = Arc::new(Notify::new());
        let delayed = DelayedRefresh::new(Arc::clone(&signal));
        delayed.schedule(Duration::from_secs(1));
        assert!(delayed.is_pending());

        tokio::time::timeout(Duration::from_secs(2), signal.notified())
            .await
            .ok();
        tokio::task::yield_now().await;
        assert!(!delayed.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_pending_timer() {
        let signal = Arc::new(Notify::new());
        let delayed = DelayedRefresh::new(Arc::clone(&signal));
        delayed.schedule(Duration::from_secs(1));
        drop(delayed);

        let fired = tokio::time::timeout(Duration::from_secs(5), signal.notified()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_timer() {
        let signal = Arc::new(Notify::new());
        let delayed = DelayedRefresh::new(Arc::clone(&signal));
        delayed.schedule(Duration::from_secs(1));
        delayed.schedule(Duration::from_secs(3));

        let early = tokio::time::timeout(Duration::from_secs(2), signal.notified()).await;
        assert!(early.is_err());
        let late = tokio::time::timeout(Duration::from_secs(2), signal.notified()).await;
        assert!(late.is_ok());
    }
}
