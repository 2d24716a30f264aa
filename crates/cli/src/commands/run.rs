//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use config_loader::ConfigLoader;
use contracts::{BusBlueprint, Callback, EventConfig, SubscriptionMode};
use dispatcher::{ChannelObserver, Dispatcher, DispatcherError};

use crate::actions;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::stats::RunStats;

/// Execute the `run` command
pub async fn run_bus(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(scheduler) = args.scheduler {
        info!(scheduler = ?scheduler, "Overriding scheduler from CLI");
        blueprint.dispatcher.scheduler = scheduler.into();
    }

    info!(
        scheduler = ?blueprint.dispatcher.scheduler,
        subscriptions = blueprint.subscriptions.len(),
        events = blueprint.events.len(),
        "Configuration loaded"
    );

    // Resolve every action before touching the bus so a typo fails fast.
    let callbacks = blueprint
        .subscriptions
        .iter()
        .map(actions::resolve)
        .collect::<Result<Vec<_>, _>>()?;

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_plan(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let (observer, mut failures) = ChannelObserver::new();
    let bus = Dispatcher::builder()
        .config(blueprint.dispatcher.clone())
        .observer(observer)
        .build()
        .context("Failed to build dispatcher")?;

    register(&bus, &blueprint, callbacks)?;

    let shutdown_signal = setup_shutdown_signal();

    info!("Publishing events...");

    tokio::select! {
        result = drive(bus.clone(), blueprint.events.clone(), args.fail_fast, args.timeout) => {
            let (mut stats, first_error) = result?;
            while failures.try_recv().is_ok() {
                stats.async_failures += 1;
            }
            stats.dispatch = bus.metrics();

            info!(
                events_published = stats.events_published,
                publish_errors = stats.publish_errors,
                async_failures = stats.async_failures,
                duration_secs = stats.duration.as_secs_f64(),
                "Run completed"
            );
            stats.print_summary();

            if let Some(err) = first_error {
                return Err(err).context("Stopped at first failed handler");
            }
        }
        _ = shutdown_signal => {
            warn!(in_flight = bus.in_flight(), "Received shutdown signal, abandoning run");
        }
    }

    info!("Topicbus finished");
    Ok(())
}

/// Register one binding per subscription entry, in configuration order
fn register(bus: &Dispatcher, blueprint: &BusBlueprint, callbacks: Vec<Callback>) -> Result<()> {
    for (sub, callback) in blueprint.subscriptions.iter().zip(callbacks) {
        let topic = sub.topic.as_str();
        match sub.mode {
            SubscriptionMode::Sync => bus.subscribe(topic, callback),
            SubscriptionMode::Once => bus.subscribe_once(topic, callback),
            SubscriptionMode::Async => bus.subscribe_async(topic, callback, sub.transactional),
            SubscriptionMode::OnceAsync => bus.subscribe_once_async(topic, callback),
        }
        .with_context(|| format!("Failed to subscribe '{}' to '{topic}'", sub.action))?;

        debug!(topic, action = %sub.action, mode = ?sub.mode, "Subscription registered");
    }
    Ok(())
}

/// Publish all events, then wait for asynchronous handlers
async fn drive(
    bus: Dispatcher,
    events: Vec<EventConfig>,
    fail_fast: bool,
    timeout_secs: u64,
) -> Result<(RunStats, Option<DispatcherError>)> {
    let start = Instant::now();

    // Synchronous handlers may block, so publishing stays off the async workers.
    let publisher = bus.clone();
    let (mut stats, first_error) =
        tokio::task::spawn_blocking(move || publish_all(&publisher, &events, fail_fast))
            .await
            .context("Publisher task panicked")?;

    if timeout_secs == 0 {
        bus.quiescent().await;
    } else if tokio::time::timeout(Duration::from_secs(timeout_secs), bus.quiescent())
        .await
        .is_err()
    {
        return Err(CliError::drain_timeout(timeout_secs, bus.in_flight()).into());
    }

    stats.duration = start.elapsed();
    Ok((stats, first_error))
}

/// Publish every event `repeat` times, recording per-call latency
///
/// Errors are logged and counted; with `fail_fast` the first one stops
/// publishing and is returned.
fn publish_all(
    bus: &Dispatcher,
    events: &[EventConfig],
    fail_fast: bool,
) -> (RunStats, Option<DispatcherError>) {
    let mut stats = RunStats::default();

    for event in events {
        for round in 0..event.repeat {
            let started = Instant::now();
            let result = bus.publish(&event.topic, event.args.clone());
            stats.record_publish(started.elapsed(), result.is_ok());

            if let Err(e) = result {
                warn!(topic = %event.topic, round, error = %e, "Publish failed");
                if fail_fast {
                    return (stats, Some(e));
                }
            }
        }
    }

    (stats, None)
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print what a run would do, for dry-run mode
fn print_plan(blueprint: &BusBlueprint) {
    println!("\n=== Run Plan ===\n");
    println!("Dispatcher:");
    println!("  Scheduler: {:?}", blueprint.dispatcher.scheduler);
    println!("  Worker thread prefix: {}", blueprint.dispatcher.thread_name);

    println!("\nSubscriptions ({}):", blueprint.subscriptions.len());
    for sub in &blueprint.subscriptions {
        let serial = if sub.transactional { ", transactional" } else { "" };
        println!("  - {} -> {} ({:?}{serial})", sub.topic, sub.action, sub.mode);
    }

    println!("\nEvents ({}):", blueprint.events.len());
    for event in &blueprint.events {
        println!("  - {}{} x{}", event.topic, event.args, event.repeat);
    }

    println!();
}
