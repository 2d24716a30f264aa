//! Dispatcher - topic registry and fan-out of published arguments

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, trace, warn};

use contracts::{Args, Callback, ContractError, DispatcherConfig, IntoCallback};

use crate::binding::{BindingMode, HandlerBinding};
use crate::error::DispatcherError;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::observers::{FailureObserver, HandlerFailure, LogObserver};
use crate::scheduler::{Job, Scheduler};
use crate::tracker::InFlight;

type TopicMap = HashMap<String, Vec<Arc<HandlerBinding>>>;

/// Builder for creating a Dispatcher
#[derive(Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    scheduler: Option<Scheduler>,
    observers: Vec<Arc<dyn FailureObserver>>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given configuration
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an explicit scheduler instead of the configured one
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Add a failure observer for asynchronous invocations
    pub fn observer(mut self, observer: impl FailureObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Build the dispatcher
    ///
    /// # Errors
    /// `Config` when the configured scheduler is unavailable.
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Scheduler::from_kind(self.config.scheduler, &self.config.thread_name)
                .map_err(DispatcherError::config)?,
        };

        let mut observers = self.observers;
        if self.config.log_failures {
            observers.insert(0, Arc::new(LogObserver::new()));
        }

        info!(
            scheduler = scheduler.kind(),
            observers = observers.len(),
            "Dispatcher created"
        );

        Ok(Dispatcher::from_parts(scheduler, observers))
    }
}

/// In-process publish/subscribe dispatcher
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    /// Structural lock: topic → bindings in subscription order
    topics: Mutex<TopicMap>,
    in_flight: Arc<InFlight>,
    scheduler: Scheduler,
    observers: Vec<Arc<dyn FailureObserver>>,
    metrics: DispatchMetrics,
    next_binding_id: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher with default configuration
    ///
    /// Async handlers run on tokio's blocking pool when called inside a
    /// runtime, on named OS threads otherwise. Failures are logged.
    pub fn new() -> Self {
        let config = DispatcherConfig::default();
        Self::from_parts(
            Scheduler::auto(&config.thread_name),
            vec![Arc::new(LogObserver::new())],
        )
    }

    /// Start building a dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    fn from_parts(scheduler: Scheduler, observers: Vec<Arc<dyn FailureObserver>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(HashMap::new()),
                in_flight: Arc::new(InFlight::new()),
                scheduler,
                observers,
                metrics: DispatchMetrics::new(),
                next_binding_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register `callback` to run inline on every publish of `topic`
    ///
    /// # Errors
    /// `InvalidHandler` when `callback` is not invocable; the registry is unchanged.
    pub fn subscribe<M>(
        &self,
        topic: &str,
        callback: impl IntoCallback<M>,
    ) -> Result<(), DispatcherError> {
        self.bind(topic, callback, BindingMode::SYNC)
    }

    /// Register `callback` to run inline on the next publish of `topic` only
    ///
    /// # Errors
    /// `InvalidHandler` when `callback` is not invocable.
    pub fn subscribe_once<M>(
        &self,
        topic: &str,
        callback: impl IntoCallback<M>,
    ) -> Result<(), DispatcherError> {
        self.bind(topic, callback, BindingMode::ONCE)
    }

    /// Register `callback` to run on the scheduler on every publish of `topic`
    ///
    /// With `transactional`, this binding's invocations run one at a time in
    /// publish order; other bindings are unaffected.
    ///
    /// # Errors
    /// `InvalidHandler` when `callback` is not invocable.
    pub fn subscribe_async<M>(
        &self,
        topic: &str,
        callback: impl IntoCallback<M>,
        transactional: bool,
    ) -> Result<(), DispatcherError> {
        self.bind(topic, callback, BindingMode::asynchronous(transactional))
    }

    /// Register `callback` to run on the scheduler on the next publish of `topic` only
    ///
    /// # Errors
    /// `InvalidHandler` when `callback` is not invocable.
    pub fn subscribe_once_async<M>(
        &self,
        topic: &str,
        callback: impl IntoCallback<M>,
    ) -> Result<(), DispatcherError> {
        self.bind(topic, callback, BindingMode::ONCE_ASYNC)
    }

    fn bind<M>(
        &self,
        topic: &str,
        callback: impl IntoCallback<M>,
        mode: BindingMode,
    ) -> Result<(), DispatcherError> {
        let callback = callback
            .into_callback()
            .map_err(|e| DispatcherError::from_contract(topic, e))?;

        let id = self.inner.next_binding_id.fetch_add(1, Ordering::Relaxed);
        let binding = Arc::new(HandlerBinding::new(id, callback, mode));

        let mut topics = self.inner.lock_topics();
        let bindings = topics.entry(topic.to_string()).or_default();
        bindings.push(binding);

        debug!(
            topic,
            binding = id,
            mode = mode.label(),
            handlers = bindings.len(),
            "Handler subscribed"
        );
        Ok(())
    }

    /// Remove the first binding of `callback` from `topic`
    ///
    /// Removing a callback that is not registered on an existing topic is a
    /// no-op.
    ///
    /// # Errors
    /// `UnknownTopic` when `topic` has no bindings at all.
    pub fn unsubscribe(&self, topic: &str, callback: &Callback) -> Result<(), DispatcherError> {
        let mut topics = self.inner.lock_topics();
        let bindings = match topics.get_mut(topic) {
            Some(bindings) if !bindings.is_empty() => bindings,
            _ => {
                return Err(DispatcherError::from_contract(
                    topic,
                    ContractError::unknown_topic(topic),
                ))
            }
        };

        match bindings.iter().position(|b| b.callback().same_as(callback)) {
            Some(pos) => {
                let binding = bindings.remove(pos);
                binding.mark_removed();
                debug!(topic, binding = binding.id(), "Handler unsubscribed");
            }
            None => {
                debug!(topic, handler = callback.name(), "Callback not registered on topic");
            }
        }

        if bindings.is_empty() {
            topics.remove(topic);
        }
        Ok(())
    }

    /// Whether `topic` has at least one binding
    pub fn has_callback(&self, topic: &str) -> bool {
        self.inner
            .lock_topics()
            .get(topic)
            .is_some_and(|bindings| !bindings.is_empty())
    }

    /// Number of bindings currently registered on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.lock_topics().get(topic).map_or(0, Vec::len)
    }

    /// Topics with at least one binding, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.lock_topics().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Publish `args` to every binding of `topic`
    ///
    /// Synchronous bindings run on the calling thread, in subscription order,
    /// before this returns. Asynchronous bindings are scheduled and not
    /// awaited. Publishing to a topic without bindings does nothing.
    ///
    /// # Errors
    /// `Invocation` from the first failing synchronous binding. Bindings
    /// before it have run (and async ones have been scheduled); bindings
    /// after it are skipped. Async failures go to the failure observers.
    #[instrument(
        name = "dispatcher_publish",
        level = "debug",
        skip(self, args),
        fields(args = args.len())
    )]
    pub fn publish(&self, topic: &str, args: Args) -> Result<(), DispatcherError> {
        self.inner.metrics.inc_publish_count();
        observability::record_publish(topic);

        let Some(bindings) = self.inner.snapshot(topic) else {
            trace!(topic, "No handlers for topic");
            return Ok(());
        };

        let args = Arc::new(args);
        for binding in bindings {
            if binding.is_removed() || !binding.claim() {
                continue;
            }
            if binding.is_once() {
                self.inner.remove_binding(topic, &binding);
                self.inner.metrics.inc_once_fired();
            }

            if binding.is_async() {
                self.inner.schedule(topic, binding, Arc::clone(&args));
            } else {
                self.inner.invoke_inline(topic, &binding, &args)?;
            }
        }
        Ok(())
    }

    /// Block until every asynchronous invocation scheduled so far has finished
    ///
    /// Returns immediately when nothing is in flight. May be called any
    /// number of times. Has no timeout.
    pub fn wait_async(&self) {
        trace!(in_flight = self.in_flight(), "Waiting for async handlers");
        self.inner.in_flight.wait();
    }

    /// Async counterpart of [`wait_async`](Self::wait_async) for use inside tokio tasks
    pub async fn quiescent(&self) {
        self.inner.in_flight.wait_async().await;
    }

    /// Number of asynchronous invocations not yet finished
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.count()
    }

    /// Get dispatch counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("topics", &self.topics())
            .field("scheduler", &self.inner.scheduler.kind())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Inner {
    fn lock_topics(&self) -> MutexGuard<'_, TopicMap> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, topic: &str) -> Option<Vec<Arc<HandlerBinding>>> {
        self.lock_topics()
            .get(topic)
            .filter(|bindings| !bindings.is_empty())
            .cloned()
    }

    fn remove_binding(&self, topic: &str, binding: &Arc<HandlerBinding>) {
        let mut topics = self.lock_topics();
        if let Some(bindings) = topics.get_mut(topic) {
            if let Some(pos) = bindings.iter().position(|b| Arc::ptr_eq(b, binding)) {
                bindings.remove(pos).mark_removed();
                debug!(topic, binding = binding.id(), "Once handler consumed");
            }
            if bindings.is_empty() {
                topics.remove(topic);
            }
        }
    }

    fn invoke_inline(
        &self,
        topic: &str,
        binding: &HandlerBinding,
        args: &Args,
    ) -> Result<(), DispatcherError> {
        self.metrics.inc_sync_invocations();
        observability::record_handler_invocation(topic, binding.mode().label());

        binding.callback().call(args).map_err(|e| {
            self.metrics.inc_failure_count();
            observability::record_handler_failure(topic, failure_kind(&e));
            DispatcherError::invocation(topic, binding.callback().name(), e)
        })
    }

    fn schedule(self: &Arc<Self>, topic: &str, binding: Arc<HandlerBinding>, args: Arc<Args>) {
        let guard = self.in_flight.begin();
        self.metrics.inc_async_scheduled();
        observability::record_handler_invocation(topic, binding.mode().label());
        observability::record_in_flight(self.in_flight.count());

        let inner = Arc::clone(self);
        let job_topic = topic.to_string();
        let job_binding = Arc::clone(&binding);
        let job: Job = Box::new(move || {
            inner.run_detached(&job_topic, &job_binding, &args);
            drop(guard);
            observability::record_in_flight(inner.in_flight.count());
        });

        let scheduled = match binding.serial() {
            Some(queue) => queue.enqueue(job, &self.scheduler),
            None => self.scheduler.spawn(job),
        };

        if let Err(message) = scheduled {
            self.report(topic, "schedule", DispatcherError::schedule(topic, message));
        }
    }

    fn run_detached(&self, topic: &str, binding: &HandlerBinding, args: &Args) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| binding.callback().call(args)))
            .unwrap_or_else(|payload| {
                Err(ContractError::handler_panicked(panic_message(payload.as_ref())))
            });
        self.metrics.inc_async_completed();

        if let Err(e) = outcome {
            let kind = failure_kind(&e);
            self.report(
                topic,
                kind,
                DispatcherError::invocation(topic, binding.callback().name(), e),
            );
        }
    }

    fn report(&self, topic: &str, kind: &'static str, error: DispatcherError) {
        self.metrics.inc_failure_count();
        observability::record_handler_failure(topic, kind);
        let failure = HandlerFailure {
            topic: topic.to_string(),
            error,
        };
        for observer in &self.observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer.on_failure(&failure))).is_err() {
                warn!(topic, "Failure observer panicked");
            }
        }
    }
}

fn failure_kind(err: &ContractError) -> &'static str {
    match err {
        ContractError::ArgumentMismatch { .. } => "argument_mismatch",
        ContractError::HandlerPanicked { .. } => "panic",
        _ => "handler_error",
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
