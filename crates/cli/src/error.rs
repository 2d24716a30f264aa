//! Error types for CLI operations.

use thiserror::Error;

use crate::actions::BUILTIN_ACTIONS;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Subscription names an action that is not built in
    #[error("Unknown action '{action}' for topic '{topic}' (available: {available})")]
    UnknownAction {
        topic: String,
        action: String,
        available: String,
    },

    /// Action parameter has the wrong shape
    #[error("Invalid parameter '{param}' for action '{action}': {message}")]
    InvalidParam {
        action: String,
        param: String,
        message: String,
    },

    /// Asynchronous handlers did not finish in time
    #[error("Timed out after {seconds}s waiting for {in_flight} asynchronous handler(s)")]
    DrainTimeout { seconds: u64, in_flight: usize },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn unknown_action(topic: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnknownAction {
            topic: topic.into(),
            action: action.into(),
            available: BUILTIN_ACTIONS.join(", "),
        }
    }

    pub fn invalid_param(
        action: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParam {
            action: action.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn drain_timeout(seconds: u64, in_flight: usize) -> Self {
        Self::DrainTimeout { seconds, in_flight }
    }
}
