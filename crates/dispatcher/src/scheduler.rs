//! Scheduler - runs asynchronous handler invocations off the publisher's thread
//!
//! Handler bodies are plain blocking functions, so on tokio they go to the
//! blocking pool rather than the async workers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use contracts::SchedulerKind;

/// Unit of work handed to the scheduler
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Task spawner for asynchronous bindings
#[derive(Debug, Clone)]
pub enum Scheduler {
    /// Tokio blocking pool
    Runtime(Handle),
    /// Named OS threads
    Threads(Arc<ThreadSpawner>),
}

impl Scheduler {
    /// Resolve a scheduler from configuration
    ///
    /// # Errors
    /// Returns a message when `Runtime` is requested outside a tokio runtime.
    pub fn from_kind(kind: SchedulerKind, thread_name: &str) -> Result<Self, String> {
        match kind {
            SchedulerKind::Auto => Ok(Self::auto(thread_name)),
            SchedulerKind::Runtime => Handle::try_current()
                .map(Self::Runtime)
                .map_err(|e| format!("no tokio runtime available: {e}")),
            SchedulerKind::Threads => Ok(Self::threads(thread_name)),
        }
    }

    /// Tokio blocking pool if a runtime is running, named threads otherwise
    pub fn auto(thread_name: &str) -> Self {
        Handle::try_current()
            .map(Self::Runtime)
            .unwrap_or_else(|_| Self::threads(thread_name))
    }

    /// Scheduler backed by named OS threads
    pub fn threads(prefix: &str) -> Self {
        Self::Threads(Arc::new(ThreadSpawner::new(prefix)))
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Runtime(_) => "runtime",
            Self::Threads(_) => "threads",
        }
    }

    /// Run `job` on an independently scheduled task
    ///
    /// # Errors
    /// Returns the job's spawn failure message; the job has been dropped.
    /// On tokio this happens when the runtime behind the handle has shut down.
    pub fn spawn(&self, job: Job) -> Result<(), String> {
        match self {
            Self::Runtime(handle) => {
                let rejected = Arc::new(AtomicBool::new(false));
                let pending = PendingJob {
                    job: Some(job),
                    rejected: Arc::clone(&rejected),
                };
                // Detached: completion is tracked by the in-flight counter.
                drop(handle.spawn_blocking(move || pending.run()));

                // A shut-down blocking pool drops the task before returning.
                if rejected.load(Ordering::Acquire) {
                    Err("tokio runtime has shut down".to_string())
                } else {
                    Ok(())
                }
            }
            Self::Threads(spawner) => spawner.spawn(job),
        }
    }
}

/// Job wrapper that flags being dropped without running
struct PendingJob {
    job: Option<Job>,
    rejected: Arc<AtomicBool>,
}

impl PendingJob {
    fn run(mut self) {
        if let Some(job) = self.job.take() {
            job();
        }
    }
}

impl Drop for PendingJob {
    fn drop(&mut self) {
        if self.job.is_some() {
            self.rejected.store(true, Ordering::Release);
        }
    }
}

/// Spawns one named thread per job
#[derive(Debug)]
pub struct ThreadSpawner {
    prefix: String,
    next_id: AtomicU64,
}

impl ThreadSpawner {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next_id: AtomicU64::new(0),
        }
    }

    fn spawn(&self, job: Job) -> Result<(), String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{id}", self.prefix);
        debug!(thread = %name, "Spawning handler thread");

        std::thread::Builder::new()
            .name(name)
            .spawn(job)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
