//! Trailing-edge debounce for viewport changes.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cancellable deferred call.
///
/// Each [`schedule`](Debouncer::schedule) aborts the pending call, if any,
/// and starts a new quiet period. Only the last call of a burst runs.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` once `delay` has passed without another `schedule`.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            if !previous.is_finished() {
                log::debug!("Debounce: superseding pending call");
            }
            previous.abort();
        }
    }

    /// Drop the pending call without running it.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    /// Whether a scheduled call has not finished yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let calls = calls.clone();
            debouncer.schedule(async move {
                calls.fetch_add(1, Ordering::SeqCst);
            });
            settle().await;
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(200));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        debouncer.schedule(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_each_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = calls.clone();
            debouncer.schedule(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            settle().await;
            tokio::time::advance(Duration::from_millis(150)).await;
            settle().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
