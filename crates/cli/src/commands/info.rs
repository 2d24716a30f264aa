//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::BusBlueprint;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatcher: DispatcherInfo,
    topics: Vec<TopicInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<EventInfo>,
}

#[derive(Serialize)]
struct DispatcherInfo {
    scheduler: String,
    thread_name: String,
    log_failures: bool,
}

#[derive(Serialize)]
struct TopicInfo {
    topic: String,
    subscriptions: Vec<SubscriptionInfo>,
}

#[derive(Serialize)]
struct SubscriptionInfo {
    action: String,
    mode: String,
    transactional: bool,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct EventInfo {
    topic: String,
    args: contracts::Args,
    repeat: u32,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &BusBlueprint, args: &InfoArgs) -> ConfigInfo {
    let topics = blueprint
        .subscribed_topics()
        .into_iter()
        .map(|topic| TopicInfo {
            topic: topic.to_string(),
            subscriptions: blueprint
                .subscriptions
                .iter()
                .filter(|s| s.topic == topic)
                .map(|s| SubscriptionInfo {
                    action: s.action.clone(),
                    mode: format!("{:?}", s.mode),
                    transactional: s.transactional,
                    params: s.params.clone(),
                })
                .collect(),
        })
        .collect();

    let events = if args.events {
        blueprint
            .events
            .iter()
            .map(|e| EventInfo {
                topic: e.topic.clone(),
                args: e.args.clone(),
                repeat: e.repeat,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        dispatcher: DispatcherInfo {
            scheduler: format!("{:?}", blueprint.dispatcher.scheduler),
            thread_name: blueprint.dispatcher.thread_name.clone(),
            log_failures: blueprint.dispatcher.log_failures,
        },
        topics,
        events,
    }
}

fn print_config_info(blueprint: &BusBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Topicbus Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let d = &blueprint.dispatcher;
    println!("⚙️  Dispatcher");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Scheduler: {:?}", d.scheduler);
    println!("   ├─ Worker thread prefix: {}", d.thread_name);
    println!("   └─ Log failures: {}", d.log_failures);

    let topics = blueprint.subscribed_topics();
    println!("\n📨 Topics ({})", topics.len());
    for (i, topic) in topics.iter().enumerate() {
        let is_last = i == topics.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        println!("   {} {}", prefix, topic);

        let subs: Vec<_> = blueprint
            .subscriptions
            .iter()
            .filter(|s| s.topic == *topic)
            .collect();
        for (j, sub) in subs.iter().enumerate() {
            let sub_prefix = if j == subs.len() - 1 { "└─" } else { "├─" };
            let serial = if sub.transactional { ", transactional" } else { "" };
            println!(
                "   {}  {} {} ({:?}{})",
                child_prefix, sub_prefix, sub.action, sub.mode, serial
            );
        }
    }

    if args.events && !blueprint.events.is_empty() {
        println!("\n📤 Events ({})", blueprint.events.len());
        for (i, event) in blueprint.events.iter().enumerate() {
            let prefix = if i == blueprint.events.len() - 1 { "└─" } else { "├─" };
            println!("   {} {}{} x{}", prefix, event.topic, event.args, event.repeat);
        }
    }

    println!();
}
