//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::BusBlueprint;

use crate::actions;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    scheduler: String,
    topic_count: usize,
    subscription_count: usize,
    event_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    let blueprint = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => blueprint,
        Err(e) => {
            return ValidationResult {
                valid: false,
                config_path,
                error: Some(e.to_string()),
                warnings: None,
                summary: None,
            }
        }
    };

    // Actions are only known to the CLI, so they are checked here rather than in the loader.
    if let Some(err) = blueprint
        .subscriptions
        .iter()
        .find_map(|sub| actions::resolve(sub).err())
    {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(err.to_string()),
            warnings: None,
            summary: None,
        };
    }

    let warnings = collect_warnings(&blueprint);
    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
        summary: Some(ConfigSummary {
            version: format!("{:?}", blueprint.version),
            scheduler: format!("{:?}", blueprint.dispatcher.scheduler),
            topic_count: blueprint.subscribed_topics().len(),
            subscription_count: blueprint.subscriptions.len(),
            event_count: blueprint.events.len(),
        }),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BusBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.subscriptions.is_empty() {
        warnings.push("No subscriptions configured - every publish is a no-op".to_string());
    }

    let topics = blueprint.subscribed_topics();
    for event in &blueprint.events {
        if !topics.contains(&event.topic.as_str()) {
            warnings.push(format!(
                "Event topic '{}' has no subscribers",
                event.topic
            ));
        }
    }

    for sub in &blueprint.subscriptions {
        if sub.mode.is_once() {
            let publishes: u32 = blueprint
                .events
                .iter()
                .filter(|e| e.topic == sub.topic)
                .map(|e| e.repeat)
                .sum();
            if publishes > 1 {
                warnings.push(format!(
                    "Once subscription '{}' on '{}' fires only on the first of {} publishes",
                    sub.action, sub.topic, publishes
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Scheduler: {}", summary.scheduler);
            println!("  Topics: {}", summary.topic_count);
            println!("  Subscriptions: {}", summary.subscription_count);
            println!("  Events: {}", summary.event_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
