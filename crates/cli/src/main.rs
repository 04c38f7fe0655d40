//! # Fanout CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 从参数构建发布订阅通道
//! - 运行扇出场景并打印统计
//! - 打印校验后的配置

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_scenario};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let metrics_port = match &cli.command {
        Commands::Run(args) => args.metrics_port,
        Commands::Info(_) => None,
    };
    init_logging(&cli, metrics_port)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Fanout CLI starting");

    let result = match &cli.command {
        Commands::Run(args) => run_scenario(args).await,
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging (and the Prometheus endpoint) from CLI options
fn init_logging(cli: &Cli, metrics_port: Option<u16>) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let log_format = match cli.log_format {
        cli::LogFormat::Json => observability::LogFormat::Json,
        cli::LogFormat::Pretty => observability::LogFormat::Pretty,
        cli::LogFormat::Compact => observability::LogFormat::Compact,
    };

    observability::init_with_config(observability::ObservabilityConfig {
        log_format,
        metrics_port,
        default_log_level: default_log_level.to_string(),
    })
}
