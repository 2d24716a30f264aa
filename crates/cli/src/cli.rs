//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Topicbus - in-process topic publish/subscribe runner
#[derive(Parser, Debug)]
#[command(
    name = "topicbus",
    author,
    version,
    about = "Run topic-based publish/subscribe setups from a configuration file",
    long_about = "Loads a bus configuration, registers every subscription with its \n\
                  built-in action, publishes the configured events and waits for all \n\
                  asynchronous handlers to finish before reporting statistics."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TOPICBUS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TOPICBUS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register subscriptions and publish the configured events
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "bus.toml", env = "TOPICBUS_CONFIG")]
    pub config: PathBuf,

    /// Override the scheduler from configuration
    #[arg(long, value_enum, env = "TOPICBUS_SCHEDULER")]
    pub scheduler: Option<SchedulerArg>,

    /// Stop publishing at the first failed synchronous handler
    #[arg(long)]
    pub fail_fast: bool,

    /// Seconds to wait for asynchronous handlers (0 = no timeout)
    #[arg(long, default_value = "0", env = "TOPICBUS_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TOPICBUS_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bus.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bus.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show configured events
    #[arg(long)]
    pub events: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Scheduler override
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SchedulerArg {
    /// Tokio blocking pool when available, OS threads otherwise
    Auto,
    /// Tokio blocking pool
    Runtime,
    /// Named OS threads
    Threads,
}

impl From<SchedulerArg> for contracts::SchedulerKind {
    fn from(arg: SchedulerArg) -> Self {
        match arg {
            SchedulerArg::Auto => Self::Auto,
            SchedulerArg::Runtime => Self::Runtime,
            SchedulerArg::Threads => Self::Threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "topicbus",
            "-v",
            "run",
            "--config",
            "demo.toml",
            "--scheduler",
            "threads",
            "--fail-fast",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("demo.toml"));
                assert!(matches!(args.scheduler, Some(SchedulerArg::Threads)));
                assert!(args.fail_fast);
                assert_eq!(args.timeout, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["topicbus", "-q", "-v", "info"]).is_err());
    }
}
