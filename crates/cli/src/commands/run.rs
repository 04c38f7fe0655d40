//! `run` command implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use contracts::{headers, HandlerError, Message, MessageChannel, MessageHandler, SubscribableChannel};
use dispatcher::{
    ChannelMetricsSnapshot, FnHandler, LogHandler, PoolMetricsSnapshot, PublishSubscribeChannel,
    WorkerPool,
};
use observability::{RunningStats, StatsSummary};

use crate::cli::RunArgs;

/// How long to wait for the error router to catch up after the pool drains
const ROUTING_GRACE: Duration = Duration::from_secs(2);

/// Statistics from a scenario run
#[derive(Debug, Serialize)]
struct RunSummary {
    channel: String,
    subscribers: usize,
    pooled: bool,
    sends_ok: u64,
    sends_failed: u64,
    duration_secs: f64,
    send_latency_ms: StatsSummary,
    channel_metrics: ChannelMetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool_metrics: Option<PoolMetricsSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_channel_metrics: Option<ChannelMetricsSnapshot>,
}

/// Execute the `run` command
pub async fn run_scenario(args: &RunArgs) -> Result<()> {
    let channel_config = args.channel.channel_config();
    channel_config
        .check()
        .context("Invalid channel configuration")?;

    let pool = match args.channel.pool_config() {
        Some(config) => Some(Arc::new(
            WorkerPool::spawn(&config).context("Failed to start worker pool")?,
        )),
        None => None,
    };

    // Failures from pooled handlers land on their own channel and get logged
    let errors = match &pool {
        Some(_) => {
            let errors = PublishSubscribeChannel::builder(format!("{}-errors", channel_config.name))
                .require_subscribers(false)
                .build()
                .context("Failed to build error channel")?;
            errors.subscribe(Arc::new(LogHandler::new("failure-log")));
            Some(Arc::new(errors))
        }
        None => None,
    };

    let mut builder = PublishSubscribeChannel::builder(channel_config.name.clone())
        .ignore_failures(channel_config.ignore_failures)
        .apply_sequence(channel_config.apply_sequence)
        .require_subscribers(channel_config.require_subscribers)
        .duplicates(channel_config.duplicates);
    if let (Some(pool), Some(errors)) = (&pool, &errors) {
        builder = builder
            .executor(pool.clone())
            .error_channel(errors.clone());
    }
    let channel = builder.build().context("Failed to build channel")?;

    for index in 0..args.subscribers {
        channel.subscribe(demo_handler(index, args.fail_on.contains(&index)));
    }

    info!(
        channel = %channel.name(),
        subscribers = channel.subscriber_count(),
        messages = args.messages,
        pooled = channel.is_pooled(),
        "Starting scenario"
    );

    let started = Instant::now();
    let mut latency = RunningStats::default();
    let (mut sends_ok, mut sends_failed) = (0u64, 0u64);

    for i in 0..args.messages {
        let message = Message::new(format!("message-{i}"))
            .with_header(headers::CORRELATION_ID, contracts::MessageId::new());

        let send_started = Instant::now();
        let result = channel.send(message).await;
        latency.push(send_started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(_) => sends_ok += 1,
            Err(e) => {
                sends_failed += 1;
                if !args.keep_going {
                    return Err(e).context(format!("Send {i} failed"));
                }
                warn!(message = i, error = %e, "Send failed, continuing");
            }
        }
    }

    if let Some(pool) = &pool {
        pool.shutdown().await;
        wait_for_routing(&channel).await;
    }

    let summary = RunSummary {
        channel: channel.name().to_string(),
        subscribers: channel.subscriber_count(),
        pooled: channel.is_pooled(),
        sends_ok,
        sends_failed,
        duration_secs: started.elapsed().as_secs_f64(),
        send_latency_ms: latency.summary(),
        channel_metrics: channel.metrics().snapshot(),
        pool_metrics: pool.as_ref().map(|p| p.metrics().snapshot()),
        error_channel_metrics: errors.as_ref().map(|e| e.metrics().snapshot()),
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?;
        println!("{}", json);
    } else {
        print_summary(&summary);
    }

    info!("Scenario finished");
    Ok(())
}

/// Subscriber that counts silently, or always fails when `fail` is set
fn demo_handler(index: usize, fail: bool) -> Arc<dyn MessageHandler> {
    let name = format!("subscriber-{index}");
    if fail {
        return Arc::new(FnHandler::new(name, move |message: &Message| {
            Err(HandlerError::failed(format!(
                "subscriber-{index} refused message {}",
                message.id()
            )))
        }));
    }
    Arc::new(FnHandler::new(name, |_: &Message| Ok(())))
}

/// Wait until every pooled failure has been routed or dropped
async fn wait_for_routing(channel: &PublishSubscribeChannel) {
    let deadline = Instant::now() + ROUTING_GRACE;
    let metrics = channel.metrics();
    while metrics.routed_count() + metrics.dropped_count() < metrics.failure_count() {
        if Instant::now() >= deadline {
            warn!(
                failures = metrics.failure_count(),
                routed = metrics.routed_count(),
                dropped = metrics.dropped_count(),
                "Error router did not catch up"
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn print_summary(summary: &RunSummary) {
    let m = &summary.channel_metrics;

    println!("\n=== Fan-out Summary ===\n");
    println!("Channel: {} ({} subscribers)", summary.channel, summary.subscribers);
    println!("  Mode: {}", if summary.pooled { "pooled" } else { "caller" });
    println!("  Duration: {:.3}s", summary.duration_secs);
    println!("  Sends: {} ok, {} failed", summary.sends_ok, summary.sends_failed);
    println!("  Send latency (ms): {}", summary.send_latency_ms);

    println!("\nDeliveries:");
    println!("  Delivered: {}", m.delivered_count);
    println!("  Handler failures: {}", m.failure_count);
    println!("  Sends without subscribers: {}", m.no_subscriber_count);

    if let Some(pool) = &summary.pool_metrics {
        println!("\nWorker pool:");
        println!("  Submitted: {}", pool.submitted_count);
        println!("  Completed: {}", pool.completed_count);
        println!("  Failed: {}", pool.failed_count);
        println!("  Panicked: {}", pool.panicked_count);
        println!("  Rejected: {}", pool.rejected_count);
        println!("\nFailure routing:");
        println!("  Routed: {}", m.routed_count);
        println!("  Dropped: {}", m.dropped_count);
    }

    println!();
}
