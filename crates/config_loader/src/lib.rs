//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `BusBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("bus.toml")).unwrap();
//! println!("Subscriptions: {}", blueprint.subscriptions.len());
//! ```

mod parser;
mod validator;

pub use contracts::BusBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Reads a bus blueprint, then runs every validation rule on it. A
/// blueprint returned from here is safe to hand to the CLI runner.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// The format comes from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - Missing or unsupported extension
    /// - File read failure
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BusBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<BusBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Serialize BusBlueprint to TOML string
    pub fn to_toml(blueprint: &BusBlueprint) -> Result<String, ContractError> {
        parser::render(blueprint, ConfigFormat::Toml)
    }

    /// Serialize BusBlueprint to JSON string
    pub fn to_json(blueprint: &BusBlueprint) -> Result<String, ContractError> {
        parser::render(blueprint, ConfigFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SubscriptionMode;

    const MINIMAL_TOML: &str = r#"
[dispatcher]
scheduler = "threads"
thread_name = "bus-worker"

[[subscriptions]]
topic = "topic"
action = "log"

[[subscriptions]]
topic = "topic"
mode = "async"
transactional = true
action = "sleep"
[subscriptions.params]
millis = 5

[[events]]
topic = "topic"
args = [20, 40]
repeat = 2
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.dispatcher.thread_name, "bus-worker");
        assert_eq!(bp.subscriptions[1].mode, SubscriptionMode::Async);
        assert_eq!(bp.subscribed_topics(), vec!["topic"]);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.subscriptions.len(), bp2.subscriptions.len());
        assert_eq!(bp.events[0].args, bp2.events[0].args);
        assert_eq!(bp.dispatcher, bp2.dispatcher);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.events[0].repeat, bp2.events[0].repeat);
        assert_eq!(
            bp.subscriptions[1].params.get("millis"),
            bp2.subscriptions[1].params.get("millis")
        );
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[subscriptions]]
topic = "topic"
mode = "once"
transactional = true
action = "log"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("transactional"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::load_from_path(Path::new("bus.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ConfigLoader::load_from_path(Path::new("/no/such/bus.toml")).unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
