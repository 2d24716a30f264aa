//! Dispatcher configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

/// Where asynchronous handler invocations run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Tokio blocking pool when a runtime is available, OS threads otherwise
    #[default]
    Auto,
    /// Tokio blocking pool of the current runtime (required)
    Runtime,
    /// One named OS thread per invocation or serial queue drain
    Threads,
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Scheduler used for asynchronous bindings
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Name prefix for OS worker threads
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Install the tracing failure observer
    #[serde(default = "default_log_failures")]
    pub log_failures: bool,
}

fn default_thread_name() -> String {
    "topicbus-worker".to_string()
}

fn default_log_failures() -> bool {
    true
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            thread_name: default_thread_name(),
            log_failures: default_log_failures(),
        }
    }
}
