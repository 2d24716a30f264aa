//! ChannelObserver - forwards failures to a tokio channel

use tokio::sync::mpsc;
use tracing::warn;

use super::{FailureObserver, HandlerFailure};

/// Observer that forwards a summary of each failure to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<FailureReport>,
}

/// Owned copy of a failure, suitable for sending across tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub topic: String,
    pub message: String,
    pub argument_mismatch: bool,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FailureReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FailureObserver for ChannelObserver {
    fn on_failure(&self, failure: &HandlerFailure) {
        if self.tx.send(FailureReport::from(failure)).is_err() {
            warn!(topic = %failure.topic, "Failure receiver dropped, report discarded");
        }
    }
}

impl From<&HandlerFailure> for FailureReport {
    fn from(failure: &HandlerFailure) -> Self {
        Self {
            topic: failure.topic.clone(),
            message: failure.error.to_string(),
            argument_mismatch: failure.error.is_argument_mismatch(),
        }
    }
}
