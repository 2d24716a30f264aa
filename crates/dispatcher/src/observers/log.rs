//! LogObserver - reports failures via tracing

use tracing::error;

use super::{FailureObserver, HandlerFailure};

/// Observer that logs every async failure at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl FailureObserver for LogObserver {
    fn on_failure(&self, failure: &HandlerFailure) {
        error!(
            topic = %failure.topic,
            error = %failure.error,
            "Async handler failed"
        );
    }
}
