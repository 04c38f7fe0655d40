//! Error routing for pooled dispatch
//!
//! Workers never call the failure destination themselves. They push the
//! failure onto the router's bounded queue, and a single routing task turns
//! each failure into a failure message and forwards it. Without a
//! destination the failure is logged and dropped. A full router queue or a
//! destination that does not accept within the send timeout also drops the
//! failure; every failure ends up counted as routed or dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use contracts::{headers, HandlerInvocationError, Message, MessageChannel};

use crate::error::DispatcherError;
use crate::metrics::ChannelMetrics;

/// Where pooled handler failures go
#[derive(Clone)]
pub enum ErrorRouting {
    /// Forward a failure message to this channel
    Channel(Arc<dyn MessageChannel>),
    /// Log the failure and drop it
    LogAndDrop,
}

impl fmt::Debug for ErrorRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(channel) => f.debug_tuple("Channel").field(&channel.name()).finish(),
            Self::LogAndDrop => f.write_str("LogAndDrop"),
        }
    }
}

/// Bounds on how much the router buffers and waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingLimits {
    /// Failures waiting for the routing task (minimum 1)
    pub queue_capacity: usize,
    /// How long one destination send may take before the failure is dropped
    pub send_timeout: Duration,
}

impl Default for RoutingLimits {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            send_timeout: Duration::from_secs(1),
        }
    }
}

/// Handle for routing failures to the routing task
pub struct ErrorRouter {
    channel: String,
    tx: mpsc::Sender<HandlerInvocationError>,
    metrics: Arc<ChannelMetrics>,
}

impl ErrorRouter {
    /// Spawn the routing task on the current runtime with default limits
    ///
    /// The task stops once every handle to this router is dropped.
    pub fn spawn(
        channel: impl Into<String>,
        routing: ErrorRouting,
        metrics: Arc<ChannelMetrics>,
    ) -> Result<Self, DispatcherError> {
        Self::spawn_with_limits(channel, routing, RoutingLimits::default(), metrics)
    }

    /// Spawn the routing task on the current runtime
    pub fn spawn_with_limits(
        channel: impl Into<String>,
        routing: ErrorRouting,
        limits: RoutingLimits,
        metrics: Arc<ChannelMetrics>,
    ) -> Result<Self, DispatcherError> {
        let channel = channel.into();
        let runtime = Handle::try_current()
            .map_err(|_| DispatcherError::no_runtime(format!("{channel} error router")))?;

        let (tx, rx) = mpsc::channel(limits.queue_capacity.max(1));
        let destination = match routing {
            ErrorRouting::Channel(destination) => Some(destination),
            ErrorRouting::LogAndDrop => None,
        };

        runtime.spawn(routing_loop(
            channel.clone(),
            rx,
            destination,
            limits.send_timeout,
            Arc::clone(&metrics),
        ));

        Ok(Self {
            channel,
            tx,
            metrics,
        })
    }

    /// Hand a failure to the routing task; never fails or waits
    ///
    /// Returns false if the failure was dropped (queue full or router stopped).
    pub fn route(&self, failure: HandlerInvocationError) -> bool {
        let (failure, reason) = match self.tx.try_send(failure) {
            Ok(()) => return true,
            Err(mpsc::error::TrySendError::Full(failure)) => (failure, "Error router queue full"),
            Err(mpsc::error::TrySendError::Closed(failure)) => (failure, "Error router stopped"),
        };

        self.metrics.inc_dropped_count();
        observability::record_failure_routed(&self.channel, false);
        error!(
            channel = %self.channel,
            handler = %failure.handler,
            message_id = %failure.message_id(),
            error = %failure.source,
            "{reason}, failure dropped"
        );
        false
    }
}

/// Build the failure message sent to the error destination
///
/// The payload is the `HandlerInvocationError` itself.
pub fn failure_message(failure: HandlerInvocationError) -> Message {
    let failed = &failure.message;
    let correlation_id = failed.headers().correlation_id().unwrap_or(failed.id());
    let failed_message_id = failed.id();
    let channel = failure.channel.clone();
    let handler = failure.handler.clone();

    Message::new(failure)
        .with_header(headers::FAILED_CHANNEL, channel)
        .with_header(headers::FAILED_HANDLER, handler)
        .with_header(headers::FAILED_MESSAGE_ID, failed_message_id)
        .with_header(headers::CORRELATION_ID, correlation_id)
}

#[instrument(
    name = "error_routing_loop",
    skip(rx, destination, send_timeout, metrics),
    fields(channel = %channel)
)]
async fn routing_loop(
    channel: String,
    mut rx: mpsc::Receiver<HandlerInvocationError>,
    destination: Option<Arc<dyn MessageChannel>>,
    send_timeout: Duration,
    metrics: Arc<ChannelMetrics>,
) {
    debug!(channel = %channel, "Error router started");

    while let Some(failure) = rx.recv().await {
        let Some(destination) = &destination else {
            metrics.inc_dropped_count();
            observability::record_failure_routed(&channel, false);
            warn!(
                channel = %channel,
                handler = %failure.handler,
                message_id = %failure.message_id(),
                error = %failure.source,
                "Handler failed, no error destination configured"
            );
            continue;
        };

        let handler = failure.handler.clone();
        let sent = tokio::time::timeout(send_timeout, destination.send(failure_message(failure))).await;
        match sent {
            Ok(Ok(true)) => {
                metrics.inc_routed_count();
                observability::record_failure_routed(&channel, true);
                debug!(
                    channel = %channel,
                    handler = %handler,
                    destination = destination.name(),
                    "Failure routed"
                );
            }
            Ok(Ok(false)) => {
                metrics.inc_dropped_count();
                observability::record_failure_routed(&channel, false);
                warn!(
                    channel = %channel,
                    handler = %handler,
                    destination = destination.name(),
                    "Error destination delivered the failure nowhere"
                );
            }
            Ok(Err(e)) => {
                metrics.inc_dropped_count();
                observability::record_failure_routed(&channel, false);
                error!(
                    channel = %channel,
                    handler = %handler,
                    destination = destination.name(),
                    error = %e,
                    "Failed to route handler failure"
                );
            }
            Err(_) => {
                metrics.inc_dropped_count();
                observability::record_failure_routed(&channel, false);
                error!(
                    channel = %channel,
                    handler = %handler,
                    destination = destination.name(),
                    timeout_ms = send_timeout.as_millis() as u64,
                    "Error destination did not accept in time, failure dropped"
                );
            }
        }
    }

    debug!(channel = %channel, "Error router stopped");
}
