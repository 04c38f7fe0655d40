//! PublishSubscribeChannel - registry + dispatcher behind a single `send`

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use contracts::{
    ChannelConfig, ChannelError, DuplicatePolicy, Message, MessageChannel, MessageHandler,
    SubscribableChannel, TaskExecutor,
};

use crate::dispatcher::{BroadcastDispatcher, DispatchOutcome, Execution};
use crate::error::DispatcherError;
use crate::metrics::ChannelMetrics;
use crate::registry::SubscriberRegistry;
use crate::routing::{ErrorRouter, ErrorRouting, RoutingLimits};

/// Builder for creating a PublishSubscribeChannel
///
/// A pooled channel must be told where failures go, either
/// [`error_channel`](Self::error_channel) or
/// [`log_and_drop_errors`](Self::log_and_drop_errors); `build` refuses to
/// guess.
pub struct ChannelBuilder {
    config: ChannelConfig,
    executor: Option<Arc<dyn TaskExecutor>>,
    error_routing: Option<ErrorRouting>,
    routing_limits: RoutingLimits,
}

impl ChannelBuilder {
    /// Create a builder with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(ChannelConfig::named(name))
    }

    /// Create a builder from an existing configuration
    pub fn from_config(config: ChannelConfig) -> Self {
        Self {
            config,
            executor: None,
            error_routing: None,
            routing_limits: RoutingLimits::default(),
        }
    }

    pub fn ignore_failures(mut self, ignore: bool) -> Self {
        self.config.ignore_failures = ignore;
        self
    }

    pub fn apply_sequence(mut self, apply: bool) -> Self {
        self.config.apply_sequence = apply;
        self
    }

    pub fn require_subscribers(mut self, require: bool) -> Self {
        self.config.require_subscribers = require;
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicates = policy;
        self
    }

    /// Run handlers on `executor` instead of the sender's task
    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Forward pooled handler failures to `channel`
    pub fn error_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.error_routing = Some(ErrorRouting::Channel(channel));
        self
    }

    /// Log pooled handler failures and drop them
    pub fn log_and_drop_errors(mut self) -> Self {
        self.error_routing = Some(ErrorRouting::LogAndDrop);
        self
    }

    pub fn error_routing(mut self, routing: ErrorRouting) -> Self {
        self.error_routing = Some(routing);
        self
    }

    /// Bound the error router's queue and destination send time
    pub fn routing_limits(mut self, limits: RoutingLimits) -> Self {
        self.routing_limits = limits;
        self
    }

    /// Validate and assemble the channel
    ///
    /// Pooled channels spawn their error router, so they must be built
    /// inside a Tokio runtime.
    #[instrument(name = "channel_builder_build", skip(self), fields(channel = %self.config.name))]
    pub fn build(self) -> Result<PublishSubscribeChannel, DispatcherError> {
        self.config.check()?;
        let name = self.config.name.clone();
        let metrics = Arc::new(ChannelMetrics::new());

        let execution = match (self.executor, self.error_routing) {
            (None, routing) => {
                if let Some(routing) = routing {
                    warn!(
                        channel = %name,
                        routing = ?routing,
                        "Error routing only applies to pooled channels, ignored"
                    );
                }
                Execution::Caller
            }
            (Some(executor), Some(routing)) => {
                let router = ErrorRouter::spawn_with_limits(
                    &name,
                    routing,
                    self.routing_limits,
                    Arc::clone(&metrics),
                )?;
                Execution::Pooled {
                    executor,
                    router: Arc::new(router),
                }
            }
            (Some(_), None) => return Err(DispatcherError::missing_error_routing(name)),
        };

        info!(
            channel = %name,
            execution = ?execution,
            ignore_failures = self.config.ignore_failures,
            apply_sequence = self.config.apply_sequence,
            require_subscribers = self.config.require_subscribers,
            "Channel created"
        );

        Ok(PublishSubscribeChannel {
            name,
            registry: SubscriberRegistry::new(self.config.duplicates),
            dispatcher: BroadcastDispatcher::new(&self.config, execution, Arc::clone(&metrics)),
            metrics,
        })
    }
}

/// Channel that sends each message to every subscriber
pub struct PublishSubscribeChannel {
    name: String,
    registry: SubscriberRegistry,
    dispatcher: BroadcastDispatcher,
    metrics: Arc<ChannelMetrics>,
}

impl PublishSubscribeChannel {
    pub fn builder(name: impl Into<String>) -> ChannelBuilder {
        ChannelBuilder::new(name)
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ChannelMetrics> {
        &self.metrics
    }

    pub fn is_pooled(&self) -> bool {
        self.dispatcher.is_pooled()
    }
}

#[async_trait]
impl MessageChannel for PublishSubscribeChannel {
    fn name(&self) -> &str {
        &self.name
    }

    /// In caller mode `Ok(true)` means every handler returned normally. In
    /// pooled mode it only means every invocation was accepted.
    #[instrument(
        name = "pubsub_channel_send",
        skip(self, message),
        fields(channel = %self.name, message_id = %message.id())
    )]
    async fn send(&self, message: Message) -> Result<bool, ChannelError> {
        self.metrics.inc_send_count();
        observability::record_message_sent(&self.name);

        let started = Instant::now();
        let snapshot = self.registry.snapshot();
        let result = self.dispatcher.dispatch(message, &snapshot).await;
        observability::record_send_latency_ms(&self.name, started.elapsed().as_secs_f64() * 1000.0);
        let outcome = result?;

        debug!(channel = %self.name, outcome = ?outcome, "Send complete");
        Ok(!matches!(outcome, DispatchOutcome::NoSubscribers))
    }
}

impl SubscribableChannel for PublishSubscribeChannel {
    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> bool {
        let name = handler.name().to_string();
        let added = self.registry.subscribe(handler);
        if added {
            info!(channel = %self.name, handler = %name, "Handler subscribed");
        }
        added
    }

    fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool {
        let removed = self.registry.unsubscribe(handler);
        if removed {
            info!(channel = %self.name, handler = handler.name(), "Handler unsubscribed");
        }
        removed
    }
}
