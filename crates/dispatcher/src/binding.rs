//! HandlerBinding - one registered callback plus its execution-mode flags

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, trace};

use contracts::Callback;

use crate::scheduler::{Job, Scheduler};

/// Execution-mode flags chosen at subscribe time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingMode {
    /// Remove after the first invocation
    pub once: bool,
    /// Run on the scheduler instead of inline
    pub is_async: bool,
    /// Serialize this binding's async invocations (async only)
    pub transactional: bool,
}

impl BindingMode {
    pub const SYNC: Self = Self {
        once: false,
        is_async: false,
        transactional: false,
    };

    pub const ONCE: Self = Self {
        once: true,
        is_async: false,
        transactional: false,
    };

    pub const fn asynchronous(transactional: bool) -> Self {
        Self {
            once: false,
            is_async: true,
            transactional,
        }
    }

    pub const ONCE_ASYNC: Self = Self {
        once: true,
        is_async: true,
        transactional: false,
    };

    /// Label for logs and metrics
    pub fn label(&self) -> &'static str {
        match (self.once, self.is_async, self.transactional) {
            (false, false, _) => "sync",
            (true, false, _) => "once",
            (false, true, false) => "async",
            (false, true, true) => "transactional",
            (true, true, _) => "once_async",
        }
    }
}

/// A registered callback
///
/// Bindings do not know their topic; the dispatcher passes it through at
/// dispatch time.
#[derive(Debug)]
pub struct HandlerBinding {
    id: u64,
    callback: Callback,
    mode: BindingMode,
    /// Latch claimed by the single invocation of a once-binding
    invoked_once: AtomicBool,
    /// Set under the structural lock when the binding leaves its topic list
    removed: AtomicBool,
    /// Present only for transactional async bindings
    serial: Option<Arc<SerialQueue>>,
}

impl HandlerBinding {
    pub fn new(id: u64, callback: Callback, mode: BindingMode) -> Self {
        let serial = (mode.is_async && mode.transactional).then(|| Arc::new(SerialQueue::new()));
        Self {
            id,
            callback,
            mode,
            invoked_once: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            serial,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    pub fn is_once(&self) -> bool {
        self.mode.once
    }

    pub fn is_async(&self) -> bool {
        self.mode.is_async
    }

    /// Serial queue of a transactional async binding
    pub fn serial(&self) -> Option<&Arc<SerialQueue>> {
        self.serial.as_ref()
    }

    /// Claim the right to invoke this binding
    ///
    /// Always succeeds for regular bindings. For once-bindings exactly one
    /// caller ever gets `true`.
    pub fn claim(&self) -> bool {
        if !self.mode.once {
            return true;
        }
        !self.invoked_once.swap(true, Ordering::AcqRel)
    }

    /// Mark as removed from its topic list (call under the structural lock)
    pub fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// FIFO executor private to one transactional binding
///
/// Jobs are queued in schedule order and drained one at a time by a single
/// scheduler task; a new drain task is started only when none is running.
/// A job that unwinds is contained so the jobs behind it still run.
#[derive(Default)]
pub struct SerialQueue {
    state: Mutex<SerialState>,
}

#[derive(Default)]
struct SerialState {
    pending: VecDeque<Job>,
    draining: bool,
}

impl SerialQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` behind earlier invocations of the same binding
    ///
    /// # Errors
    /// When the drain task cannot be spawned, every queued job is dropped
    /// (releasing its in-flight slot) and the spawn error is returned.
    pub fn enqueue(self: &Arc<Self>, job: Job, scheduler: &Scheduler) -> Result<(), String> {
        {
            let mut state = self.lock();
            state.pending.push_back(job);
            if state.draining {
                trace!(queued = state.pending.len(), "Queued behind running invocation");
                return Ok(());
            }
            state.draining = true;
        }

        let queue = Arc::clone(self);
        scheduler
            .spawn(Box::new(move || queue.drain()))
            .map_err(|e| {
                let dropped: Vec<Job> = {
                    let mut state = self.lock();
                    state.draining = false;
                    state.pending.drain(..).collect()
                };
                format!("{e} ({} queued invocation(s) dropped)", dropped.len())
            })
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    fn drain(&self) {
        loop {
            let job = {
                let mut state = self.lock();
                match state.pending.pop_front() {
                    Some(job) => job,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                error!("Serial job panicked; continuing with queued invocations");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SerialState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_once_claim_succeeds_once() {
        let binding = HandlerBinding::new(1, Callback::new(|| {}), BindingMode::ONCE);
        assert!(binding.claim());
        assert!(!binding.claim());
        assert!(!binding.claim());
    }

    #[test]
    fn test_regular_claim_always_succeeds() {
        let binding = HandlerBinding::new(1, Callback::new(|| {}), BindingMode::SYNC);
        assert!(binding.claim());
        assert!(binding.claim());
    }

    #[test]
    fn test_serial_queue_only_for_transactional_async() {
        let cb = Callback::new(|| {});
        assert!(HandlerBinding::new(1, cb.clone(), BindingMode::asynchronous(true))
            .serial()
            .is_some());
        assert!(HandlerBinding::new(2, cb.clone(), BindingMode::asynchronous(false))
            .serial()
            .is_none());
        assert!(HandlerBinding::new(3, cb, BindingMode::SYNC).serial().is_none());
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(BindingMode::SYNC.label(), "sync");
        assert_eq!(BindingMode::ONCE.label(), "once");
        assert_eq!(BindingMode::asynchronous(false).label(), "async");
        assert_eq!(BindingMode::asynchronous(true).label(), "transactional");
        assert_eq!(BindingMode::ONCE_ASYNC.label(), "once_async");
    }

    #[test]
    fn test_serial_queue_preserves_order() {
        let queue = Arc::new(SerialQueue::new());
        let scheduler = Scheduler::threads("serial-test");
        let (tx, rx) = mpsc::channel();

        for i in 0..5u64 {
            let tx = tx.clone();
            let job: Job = Box::new(move || {
                // Earlier jobs sleep longer; order must still hold.
                std::thread::sleep(Duration::from_millis(10 * (5 - i)));
                tx.send(i).unwrap();
            });
            queue.enqueue(job, &scheduler).unwrap();
        }
        drop(tx);

        let order: Vec<u64> = rx.iter().collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_serial_queue_survives_panicking_job() {
        let queue = Arc::new(SerialQueue::new());
        let scheduler = Scheduler::threads("serial-panic");
        let (tx, rx) = mpsc::channel();

        for i in 0..3u64 {
            let tx = tx.clone();
            let job: Job = Box::new(move || {
                std::thread::sleep(Duration::from_millis(20));
                if i == 0 {
                    panic!("job {i} failed");
                }
                tx.send(i).unwrap();
            });
            queue.enqueue(job, &scheduler).unwrap();
        }
        drop(tx);

        let order: Vec<u64> = rx.iter().collect();
        assert_eq!(order, vec![1, 2]);

        // The queue is idle again and accepts new work.
        let (tx, rx) = mpsc::channel();
        queue
            .enqueue(Box::new(move || tx.send(9).unwrap()), &scheduler)
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(9));
    }
}
