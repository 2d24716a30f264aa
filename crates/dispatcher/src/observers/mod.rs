//! Failure observers
//!
//! Asynchronous invocations have no caller to return an error to, so their
//! failures are delivered here. Contains LogObserver and ChannelObserver.

mod channel;
mod log;

pub use self::channel::{ChannelObserver, FailureReport};
pub use self::log::LogObserver;

use crate::error::DispatcherError;

/// A failed asynchronous invocation
#[derive(Debug)]
pub struct HandlerFailure {
    /// Topic the invocation was published on
    pub topic: String,
    /// What went wrong
    pub error: DispatcherError,
}

/// Receives failures of asynchronous invocations
///
/// Called on the worker that ran the handler; implementations must not block
/// for long.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, failure: &HandlerFailure);
}

impl<F> FailureObserver for F
where
    F: Fn(&HandlerFailure) + Send + Sync,
{
    fn on_failure(&self, failure: &HandlerFailure) {
        self(failure)
    }
}
