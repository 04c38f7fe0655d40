//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

use contracts::{ChannelConfig, DuplicatePolicy, RejectionPolicy, WorkerPoolConfig};

/// Fanout - publish-subscribe fan-out channel driver
#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    author,
    version,
    about = "Publish-subscribe fan-out channel driver",
    long_about = "Builds a publish-subscribe channel from flags, subscribes a set of \n\
                  demo handlers and broadcasts messages to them, either in the sending \n\
                  task or on a bounded worker pool."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FANOUT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FANOUT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Broadcast messages through a channel and print a summary
    Run(RunArgs),

    /// Display the validated channel and pool configuration
    Info(InfoArgs),
}

/// Channel and pool settings shared by every command
#[derive(Args, Debug, Clone)]
pub struct ChannelArgs {
    /// Channel name
    #[arg(long = "channel", default_value = "fanout", env = "FANOUT_CHANNEL")]
    pub name: String,

    /// Keep delivering after a handler fails and report failures together
    #[arg(long, env = "FANOUT_IGNORE_FAILURES")]
    pub ignore_failures: bool,

    /// Stamp sequence headers on each handler's copy
    #[arg(long, env = "FANOUT_APPLY_SEQUENCE")]
    pub apply_sequence: bool,

    /// Treat a send with no subscribers as "not delivered" instead of an error
    #[arg(long)]
    pub allow_empty: bool,

    /// Refuse to register the same handler twice
    #[arg(long)]
    pub reject_duplicates: bool,

    /// Worker pool size (0 = run handlers in the sending task)
    #[arg(long, default_value = "0", env = "FANOUT_WORKERS")]
    pub workers: usize,

    /// Worker pool queue capacity
    #[arg(long, default_value = "256", env = "FANOUT_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Reject submissions when the pool queue is full instead of waiting
    #[arg(long)]
    pub reject: bool,
}

impl ChannelArgs {
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            name: self.name.clone(),
            ignore_failures: self.ignore_failures,
            apply_sequence: self.apply_sequence,
            require_subscribers: !self.allow_empty,
            duplicates: if self.reject_duplicates {
                DuplicatePolicy::Reject
            } else {
                DuplicatePolicy::Allow
            },
        }
    }

    /// Pool settings, or `None` for synchronous dispatch
    pub fn pool_config(&self) -> Option<WorkerPoolConfig> {
        if self.workers == 0 {
            return None;
        }
        Some(WorkerPoolConfig {
            name: format!("{}-pool", self.name),
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            rejection_policy: if self.reject {
                RejectionPolicy::Reject
            } else {
                RejectionPolicy::Block
            },
        })
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub channel: ChannelArgs,

    /// Number of demo subscribers
    #[arg(short, long, default_value = "3", env = "FANOUT_SUBSCRIBERS")]
    pub subscribers: usize,

    /// Number of messages to send
    #[arg(short, long, default_value = "10", env = "FANOUT_MESSAGES")]
    pub messages: usize,

    /// Subscriber indexes (0-based) whose handler always fails
    #[arg(long, value_delimiter = ',')]
    pub fail_on: Vec<usize>,

    /// Keep sending after a send returns an error
    #[arg(long)]
    pub keep_going: bool,

    /// Prometheus metrics port (unset = disabled)
    #[arg(long, env = "FANOUT_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Output the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub channel: ChannelArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
