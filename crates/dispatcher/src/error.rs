//! Dispatcher error types

use thiserror::Error;

use contracts::ContractError;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Value offered to a subscribe call is not invocable
    #[error("invalid handler for topic '{topic}': {reason}")]
    InvalidHandler { topic: String, reason: String },

    /// Unsubscribe targeted a topic with no bindings
    #[error("topic '{topic}' has no registered handlers")]
    UnknownTopic { topic: String },

    /// A handler invocation failed
    #[error("handler '{handler}' on topic '{topic}' failed: {source}")]
    Invocation {
        topic: String,
        handler: String,
        #[source]
        source: ContractError,
    },

    /// Dispatcher could not be built from its configuration
    #[error("invalid dispatcher configuration: {message}")]
    Config { message: String },

    /// An asynchronous invocation could not be scheduled
    #[error("failed to schedule handler on topic '{topic}': {message}")]
    Schedule { topic: String, message: String },
}

impl DispatcherError {
    /// Create an invocation error
    pub fn invocation(
        topic: impl Into<String>,
        handler: impl Into<String>,
        source: ContractError,
    ) -> Self {
        Self::Invocation {
            topic: topic.into(),
            handler: handler.into(),
            source,
        }
    }

    /// Create a schedule error
    pub fn schedule(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schedule {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Attach a topic to a contract-level subscribe/unsubscribe error
    pub(crate) fn from_contract(topic: &str, err: ContractError) -> Self {
        match err {
            ContractError::InvalidHandler { reason } => Self::InvalidHandler {
                topic: topic.to_string(),
                reason,
            },
            ContractError::UnknownTopic { topic } => Self::UnknownTopic { topic },
            other => Self::invocation(topic, "<unknown>", other),
        }
    }

    /// Whether the failure came from argument checking
    pub fn is_argument_mismatch(&self) -> bool {
        matches!(self, Self::Invocation { source, .. } if source.is_argument_mismatch())
    }
}
