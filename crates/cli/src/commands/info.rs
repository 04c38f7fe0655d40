//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{ChannelConfig, WorkerPoolConfig};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    channel: ChannelConfig,
    execution: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool: Option<WorkerPoolConfig>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let channel = args.channel.channel_config();
    channel.check().context("Invalid channel configuration")?;

    let pool = args.channel.pool_config();
    if let Some(pool) = &pool {
        pool.check().context("Invalid worker pool configuration")?;
    }

    info!(channel = %channel.name, pooled = pool.is_some(), "Configuration is valid");

    let info = ConfigInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        execution: if pool.is_some() { "pooled" } else { "caller" },
        channel,
        pool,
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn print_config_info(info: &ConfigInfo) {
    let channel = &info.channel;

    println!("\n=== Channel Configuration ===\n");
    println!("Channel: {}", channel.name);
    println!("  Execution: {}", info.execution);
    println!("  Ignore failures: {}", channel.ignore_failures);
    println!("  Apply sequence: {}", channel.apply_sequence);
    println!("  Require subscribers: {}", channel.require_subscribers);
    println!("  Duplicates: {:?}", channel.duplicates);

    if let Some(pool) = &info.pool {
        println!("\nWorker pool: {}", pool.name);
        println!("  Workers: {}", pool.workers);
        println!("  Queue capacity: {}", pool.queue_capacity);
        println!("  When full: {:?}", pool.rejection_policy);
    }

    println!();
}
