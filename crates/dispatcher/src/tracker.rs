//! InFlight - completion counter for asynchronous invocations
//!
//! Incremented when an invocation is scheduled, decremented when it finishes
//! (success, failure or panic). Waiters block until the count reaches zero.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Dispatcher-wide in-flight counter
#[derive(Debug, Default)]
pub struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
    notify: Notify,
}

impl InFlight {
    /// Create a new counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one scheduled invocation
    ///
    /// The returned guard releases the slot when dropped, so an unwinding
    /// handler still counts as completed.
    pub fn begin(self: &Arc<Self>) -> InFlightGuard {
        *self.lock() += 1;
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Current number of in-flight invocations
    pub fn count(&self) -> usize {
        *self.lock()
    }

    /// Block the calling thread until the count is zero
    pub fn wait(&self) {
        let mut count = self.lock();
        while *count > 0 {
            count = self
                .idle
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wait asynchronously until the count is zero
    pub async fn wait_async(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
            self.notify.notify_waiters();
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Slot held by one scheduled invocation
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_immediately_when_idle() {
        let tracker = Arc::new(InFlight::new());
        tracker.wait();
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn test_wait_blocks_until_guards_drop() {
        let tracker = Arc::new(InFlight::new());
        let guards: Vec<_> = (0..3).map(|_| tracker.begin()).collect();
        assert_eq!(tracker.count(), 3);

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(guards);
        });

        tracker.wait();
        assert_eq!(tracker.count(), 0);
        worker.join().unwrap();
    }

    #[test]
    fn test_guard_released_on_panic() {
        let tracker = Arc::new(InFlight::new());
        let guard = tracker.begin();
        let result = thread::spawn(move || {
            let _guard = guard;
            panic!("boom");
        })
        .join();

        assert!(result.is_err());
        tracker.wait();
        assert_eq!(tracker.count(), 0);
    }

    #[tokio::test]
    async fn test_async_wait() {
        let tracker = Arc::new(InFlight::new());
        let guard = tracker.begin();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });

        tracker.wait_async().await;
        assert_eq!(tracker.count(), 0);
        handle.await.unwrap();
    }
}
