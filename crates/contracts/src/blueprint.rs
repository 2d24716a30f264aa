//! BusBlueprint - Config Loader output
//!
//! Describes a complete bus setup: dispatcher settings, subscriptions with
//! the action each one runs, and the events to publish.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Args, DispatcherConfig};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bus blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Dispatcher settings
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Subscriptions, registered in order
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionConfig>,

    /// Events, published in order
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

impl BusBlueprint {
    /// Distinct topics referenced by subscriptions, in first-seen order
    pub fn subscribed_topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::new();
        for sub in &self.subscriptions {
            if !topics.contains(&sub.topic.as_str()) {
                topics.push(&sub.topic);
            }
        }
        topics
    }
}

/// Binding execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    /// Inline on the publisher's thread
    #[default]
    Sync,
    /// Inline, removed after first invocation
    Once,
    /// On the scheduler
    Async,
    /// On the scheduler, removed after first invocation
    OnceAsync,
}

impl SubscriptionMode {
    /// Whether bindings in this mode run on the scheduler
    pub fn is_async(self) -> bool {
        matches!(self, Self::Async | Self::OnceAsync)
    }

    /// Whether bindings in this mode fire at most once
    pub fn is_once(self) -> bool {
        matches!(self, Self::Once | Self::OnceAsync)
    }
}

/// One subscription entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Topic name
    pub topic: String,

    /// Execution mode
    #[serde(default)]
    pub mode: SubscriptionMode,

    /// Serialize this binding's async executions (async mode only)
    #[serde(default)]
    pub transactional: bool,

    /// Name of the action to run (resolved by the host program)
    pub action: String,

    /// Action-specific parameters
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

/// One event to publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Topic name
    pub topic: String,

    /// Arguments passed to every matching handler
    #[serde(default)]
    pub args: Args,

    /// Number of times to publish this event
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}
