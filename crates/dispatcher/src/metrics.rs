//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Total publish calls
    publish_count: AtomicU64,
    /// Total inline invocations
    sync_invocations: AtomicU64,
    /// Total invocations handed to the scheduler
    async_scheduled: AtomicU64,
    /// Total scheduled invocations that finished (any outcome)
    async_completed: AtomicU64,
    /// Total failed invocations (sync and async)
    failure_count: AtomicU64,
    /// Total once-bindings consumed
    once_fired: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get publish count
    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::Relaxed)
    }

    /// Increment publish count
    pub fn inc_publish_count(&self) {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get inline invocation count
    pub fn sync_invocations(&self) -> u64 {
        self.sync_invocations.load(Ordering::Relaxed)
    }

    /// Increment inline invocation count
    pub fn inc_sync_invocations(&self) {
        self.sync_invocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get scheduled invocation count
    pub fn async_scheduled(&self) -> u64 {
        self.async_scheduled.load(Ordering::Relaxed)
    }

    /// Increment scheduled invocation count
    pub fn inc_async_scheduled(&self) {
        self.async_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get completed async invocation count
    pub fn async_completed(&self) -> u64 {
        self.async_completed.load(Ordering::Relaxed)
    }

    /// Increment completed async invocation count
    pub fn inc_async_completed(&self) {
        self.async_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get consumed once-binding count
    pub fn once_fired(&self) -> u64 {
        self.once_fired.load(Ordering::Relaxed)
    }

    /// Increment consumed once-binding count
    pub fn inc_once_fired(&self) {
        self.once_fired.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            publish_count: self.publish_count(),
            sync_invocations: self.sync_invocations(),
            async_scheduled: self.async_scheduled(),
            async_completed: self.async_completed(),
            failure_count: self.failure_count(),
            once_fired: self.once_fired(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub publish_count: u64,
    pub sync_invocations: u64,
    pub async_scheduled: u64,
    pub async_completed: u64,
    pub failure_count: u64,
    pub once_fired: u64,
}

impl MetricsSnapshot {
    /// Total invocations attempted, inline and scheduled
    pub fn total_invocations(&self) -> u64 {
        self.sync_invocations + self.async_scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = DispatchMetrics::new();
        metrics.inc_publish_count();
        metrics.inc_sync_invocations();
        metrics.inc_async_scheduled();
        metrics.inc_async_scheduled();
        metrics.inc_async_completed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.publish_count, 1);
        assert_eq!(snapshot.total_invocations(), 3);
        assert_eq!(snapshot.async_completed, 1);
        assert_eq!(snapshot.failure_count, 0);
    }
}
