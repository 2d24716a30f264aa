//! Run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::RunningStats;

/// Statistics from one `run`
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Publish calls issued
    pub events_published: u64,

    /// Publish calls that returned an error
    pub publish_errors: u64,

    /// Asynchronous failures delivered to the failure channel
    pub async_failures: u64,

    /// Wall-clock time of each publish call, in milliseconds
    pub publish_latency_ms: RunningStats,

    /// Total duration from first publish to quiescence
    pub duration: Duration,

    /// Dispatcher counters at the end of the run
    pub dispatch: MetricsSnapshot,
}

impl RunStats {
    /// Record one publish call
    pub fn record_publish(&mut self, latency: Duration, ok: bool) {
        self.events_published += 1;
        if !ok {
            self.publish_errors += 1;
        }
        self.publish_latency_ms.push_duration(latency);
    }

    /// Publish throughput in events per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.3}s", self.duration.as_secs_f64());
        println!("  Events published: {}", self.events_published);
        println!("  Publish errors: {}", self.publish_errors);
        println!("  Async failures: {}", self.async_failures);
        println!("  Events/s: {:.2}", self.events_per_sec());
        println!("  Publish latency (ms): {}", self.publish_latency_ms.summary());

        let d = &self.dispatch;
        println!("\nDispatcher");
        println!("  Inline invocations: {}", d.sync_invocations);
        println!("  Scheduled invocations: {}", d.async_scheduled);
        println!("  Completed async: {}", d.async_completed);
        println!("  Once bindings fired: {}", d.once_fired);
        println!("  Failures: {}", d.failure_count);

        println!();
    }
}
