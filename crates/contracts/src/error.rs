//! Layered error definitions
//!
//! Categorized by source: handler / invocation / config

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Handler Errors =====
    /// Value offered as a handler is not invocable
    #[error("invalid handler: {reason}")]
    InvalidHandler { reason: String },

    /// Topic has no registered bindings
    #[error("unknown topic: '{topic}'")]
    UnknownTopic { topic: String },

    // ===== Invocation Errors =====
    /// Published arguments do not fit the handler's parameters
    #[error("argument mismatch: {message}")]
    ArgumentMismatch {
        expected: usize,
        got: usize,
        index: Option<usize>,
        message: String,
    },

    /// Handler body returned an error
    #[error("handler failed: {message}")]
    HandlerFailed { message: String },

    /// Handler body panicked
    #[error("handler panicked: {message}")]
    HandlerPanicked { message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create invalid handler error
    pub fn invalid_handler(reason: impl Into<String>) -> Self {
        Self::InvalidHandler {
            reason: reason.into(),
        }
    }

    /// Create unknown topic error
    pub fn unknown_topic(topic: impl Into<String>) -> Self {
        Self::UnknownTopic {
            topic: topic.into(),
        }
    }

    /// Create an arity mismatch error
    pub fn arity_mismatch(expected: usize, got: usize) -> Self {
        Self::ArgumentMismatch {
            expected,
            got,
            index: None,
            message: format!("expected {expected} argument(s), got {got}"),
        }
    }

    /// Create a per-argument type mismatch error
    pub fn argument_type(
        expected: usize,
        got: usize,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::ArgumentMismatch {
            expected,
            got,
            index: Some(index),
            message: format!("argument {index}: {}", message.into()),
        }
    }

    /// Create handler failure error
    pub fn handler_failed(message: impl Into<String>) -> Self {
        Self::HandlerFailed {
            message: message.into(),
        }
    }

    /// Create handler panic error
    pub fn handler_panicked(message: impl Into<String>) -> Self {
        Self::HandlerPanicked {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised by argument checking rather than the handler body
    pub fn is_argument_mismatch(&self) -> bool {
        matches!(self, Self::ArgumentMismatch { .. })
    }
}
