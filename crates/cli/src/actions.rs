//! Built-in actions that configured subscriptions can run.
//!
//! | action  | params                          | behaviour                               |
//! |---------|---------------------------------|-----------------------------------------|
//! | `log`   | `label`                         | emits an `info` event with the args     |
//! | `print` | `prefix`                        | writes the args to stdout               |
//! | `sleep` | `millis` (required), `label`    | blocks for `millis`, then logs          |
//! | `fail`  | `message`                       | returns a handler error                 |
//! | `sum`   |                                 | typed `(f64, f64)`, prints the sum      |

use std::time::Duration;

use contracts::{Args, Callback, ContractError, Handler, SubscriptionConfig};
use serde_json::Value;
use tracing::info;

use crate::error::CliError;

/// Names accepted in `subscriptions[].action`
pub const BUILTIN_ACTIONS: &[&str] = &["log", "print", "sleep", "fail", "sum"];

/// Build the callback for one subscription entry
///
/// # Errors
/// Unknown action names and malformed parameters.
pub fn resolve(sub: &SubscriptionConfig) -> Result<Callback, CliError> {
    let topic = sub.topic.clone();
    match sub.action.as_str() {
        "log" => Ok(Callback::from_handler(LogAction {
            topic,
            label: string_param(sub, "label")?,
        })),
        "print" => Ok(Callback::from_handler(PrintAction {
            prefix: string_param(sub, "prefix")?.unwrap_or_else(|| format!("[{topic}] ")),
        })),
        "sleep" => {
            let millis = u64_param(sub, "millis")?
                .ok_or_else(|| CliError::invalid_param("sleep", "millis", "required"))?;
            Ok(Callback::from_handler(SleepAction {
                topic,
                delay: Duration::from_millis(millis),
                label: string_param(sub, "label")?,
            }))
        }
        "fail" => Ok(Callback::from_handler(FailAction {
            message: string_param(sub, "message")?
                .unwrap_or_else(|| format!("configured failure on '{topic}'")),
        })),
        "sum" => Ok(Callback::new(move |a: f64, b: f64| {
            println!("[{topic}] {a} + {b} = {}", a + b);
        })),
        other => Err(CliError::unknown_action(&sub.topic, other)),
    }
}

fn string_param(sub: &SubscriptionConfig, name: &str) -> Result<Option<String>, CliError> {
    match sub.params.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CliError::invalid_param(
            &sub.action,
            name,
            format!("expected a string, got {other}"),
        )),
    }
}

fn u64_param(sub: &SubscriptionConfig, name: &str) -> Result<Option<u64>, CliError> {
    match sub.params.get(name) {
        None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            CliError::invalid_param(
                &sub.action,
                name,
                format!("expected a non-negative integer, got {value}"),
            )
        }),
    }
}

struct LogAction {
    topic: String,
    label: Option<String>,
}

impl Handler for LogAction {
    fn call(&self, args: &Args) -> Result<(), ContractError> {
        info!(
            topic = %self.topic,
            label = self.label.as_deref().unwrap_or("log"),
            args = %args,
            "Event received"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

struct PrintAction {
    prefix: String,
}

impl Handler for PrintAction {
    fn call(&self, args: &Args) -> Result<(), ContractError> {
        println!("{}{args}", self.prefix);
        Ok(())
    }

    fn name(&self) -> &str {
        "print"
    }
}

struct SleepAction {
    topic: String,
    delay: Duration,
    label: Option<String>,
}

impl Handler for SleepAction {
    fn call(&self, args: &Args) -> Result<(), ContractError> {
        std::thread::sleep(self.delay);
        info!(
            topic = %self.topic,
            label = self.label.as_deref().unwrap_or("sleep"),
            slept_ms = self.delay.as_millis() as u64,
            args = %args,
            "Event processed"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "sleep"
    }
}

struct FailAction {
    message: String,
}

impl Handler for FailAction {
    fn call(&self, _args: &Args) -> Result<(), ContractError> {
        Err(ContractError::handler_failed(&self.message))
    }

    fn name(&self) -> &str {
        "fail"
    }
}
