//! BroadcastDispatcher - fans one message out to every handler in a snapshot
//!
//! Two execution modes:
//! - **Caller**: handlers run one after another in the sending task, in
//!   snapshot order. Failures come back to the sender, either fail-fast or
//!   aggregated after the full fan-out.
//! - **Pooled**: each invocation is submitted to a `TaskExecutor`. `dispatch`
//!   returns once every task is submitted; failures go to the `ErrorRouter`
//!   and never reach the sender.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, instrument, warn};

use contracts::{
    headers, AggregateDispatchError, ChannelConfig, ChannelError, HandlerError,
    HandlerInvocationError, Message, MessageHandler, Task, TaskExecutor,
};

use crate::metrics::ChannelMetrics;
use crate::pool::panic_message;
use crate::routing::ErrorRouter;

/// Where handler invocations run
#[derive(Clone)]
pub enum Execution {
    /// In the sender's task, in snapshot order
    Caller,
    /// On a worker pool, with failures sent to the router
    Pooled {
        executor: Arc<dyn TaskExecutor>,
        router: Arc<ErrorRouter>,
    },
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Caller => f.write_str("Caller"),
            Self::Pooled { executor, .. } => f
                .debug_struct("Pooled")
                .field("executor", &executor.name())
                .finish(),
        }
    }
}

/// What a successful dispatch did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Snapshot was empty and empty fan-out is tolerated
    NoSubscribers,
    /// Every handler ran in the caller and returned normally
    Delivered(usize),
    /// Every invocation was accepted by the executor
    Submitted(usize),
}

/// Fan-out dispatcher with failure and sequencing policy
pub struct BroadcastDispatcher {
    channel: String,
    ignore_failures: bool,
    apply_sequence: bool,
    require_subscribers: bool,
    execution: Execution,
    metrics: Arc<ChannelMetrics>,
}

impl BroadcastDispatcher {
    pub fn new(config: &ChannelConfig, execution: Execution, metrics: Arc<ChannelMetrics>) -> Self {
        Self {
            channel: config.name.clone(),
            ignore_failures: config.ignore_failures,
            apply_sequence: config.apply_sequence,
            require_subscribers: config.require_subscribers,
            execution,
            metrics,
        }
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.execution, Execution::Pooled { .. })
    }

    /// Deliver `message` to every handler in `handlers`
    ///
    /// # Errors
    /// - `NoSubscribers` when `handlers` is empty and subscribers are required
    /// - `HandlerInvocation` on the first caller-mode failure (fail-fast)
    /// - `AggregateDispatch` after a caller-mode fan-out with ignored failures
    /// - `Submission` when the executor refuses a task
    #[instrument(
        name = "broadcast_dispatch",
        skip(self, message, handlers),
        fields(channel = %self.channel, message_id = %message.id(), handlers = handlers.len())
    )]
    pub async fn dispatch(
        &self,
        message: Message,
        handlers: &[Arc<dyn MessageHandler>],
    ) -> Result<DispatchOutcome, ChannelError> {
        if handlers.is_empty() {
            self.metrics.inc_no_subscriber_count();
            if self.require_subscribers {
                warn!(channel = %self.channel, "Send rejected, no subscribers");
                return Err(ChannelError::no_subscribers(&self.channel));
            }
            debug!(channel = %self.channel, "No subscribers, nothing dispatched");
            return Ok(DispatchOutcome::NoSubscribers);
        }

        let deliveries = self.prepare(message, handlers.len());

        match &self.execution {
            Execution::Caller => self.invoke_in_caller(handlers, deliveries).await,
            Execution::Pooled { executor, router } => {
                self.submit(executor.as_ref(), router, handlers, deliveries)
                    .await
            }
        }
    }

    /// One message per handler, sequence-stamped when requested
    fn prepare(&self, message: Message, count: usize) -> Vec<Message> {
        if !self.apply_sequence || count < 2 {
            return vec![message; count];
        }
        (1..=count)
            .map(|number| sequenced_copy(&message, number, count))
            .collect()
    }

    async fn invoke_in_caller(
        &self,
        handlers: &[Arc<dyn MessageHandler>],
        deliveries: Vec<Message>,
    ) -> Result<DispatchOutcome, ChannelError> {
        let attempted = handlers.len();
        let mut failures = Vec::new();

        for (handler, message) in handlers.iter().zip(deliveries) {
            match handler.handle_message(&message).await {
                Ok(()) => record_invocation(&self.metrics, &self.channel, handler.name(), true),
                Err(source) => {
                    record_invocation(&self.metrics, &self.channel, handler.name(), false);
                    let failure =
                        HandlerInvocationError::new(&self.channel, handler.name(), message, source);

                    if !self.ignore_failures {
                        debug!(
                            channel = %self.channel,
                            handler = handler.name(),
                            "Handler failed, remaining handlers skipped"
                        );
                        return Err(failure.into());
                    }

                    warn!(
                        channel = %self.channel,
                        handler = handler.name(),
                        error = %failure.source,
                        "Handler failed, continuing fan-out"
                    );
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(DispatchOutcome::Delivered(attempted))
        } else {
            Err(AggregateDispatchError {
                channel: self.channel.clone(),
                attempted,
                failures,
            }
            .into())
        }
    }

    async fn submit(
        &self,
        executor: &dyn TaskExecutor,
        router: &Arc<ErrorRouter>,
        handlers: &[Arc<dyn MessageHandler>],
        deliveries: Vec<Message>,
    ) -> Result<DispatchOutcome, ChannelError> {
        for (handler, message) in handlers.iter().zip(deliveries) {
            let task = self.invocation_task(Arc::clone(handler), message, Arc::clone(router));
            executor
                .execute(task)
                .await
                .map_err(|source| ChannelError::submission(&self.channel, handler.name(), source))?;
        }

        debug!(
            channel = %self.channel,
            executor = executor.name(),
            tasks = handlers.len(),
            "All invocations submitted"
        );
        Ok(DispatchOutcome::Submitted(handlers.len()))
    }

    /// Wrap one invocation so no failure or panic escapes unrouted
    fn invocation_task(
        &self,
        handler: Arc<dyn MessageHandler>,
        message: Message,
        router: Arc<ErrorRouter>,
    ) -> Task {
        let channel = self.channel.clone();
        let metrics = Arc::clone(&self.metrics);
        let ignore_failures = self.ignore_failures;

        Box::pin(async move {
            let outcome = AssertUnwindSafe(handler.handle_message(&message))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

            match outcome {
                Ok(()) => {
                    record_invocation(&metrics, &channel, handler.name(), true);
                    Ok(())
                }
                Err(source) => {
                    record_invocation(&metrics, &channel, handler.name(), false);
                    let failure = HandlerInvocationError::new(channel, handler.name(), message, source);
                    if ignore_failures {
                        router.route(failure);
                        Ok(())
                    } else {
                        router.route(failure.clone());
                        Err(failure)
                    }
                }
            }
        })
    }
}

/// Copy of `original` carrying its fan-out position
///
/// The copy gets its own id; `correlationId` points back at the original
/// unless the original already carries one. Sequence headers the original
/// already carries (from an upstream fan-out) are replaced.
pub fn sequenced_copy(original: &Message, number: usize, size: usize) -> Message {
    let mut copy = original.derive();
    let h = copy.headers_mut();
    h.insert(headers::SEQUENCE_NUMBER, number);
    h.insert(headers::SEQUENCE_SIZE, size);
    h.insert_if_absent(headers::CORRELATION_ID, original.id());
    copy
}

fn record_invocation(metrics: &ChannelMetrics, channel: &str, handler: &str, success: bool) {
    if success {
        metrics.inc_delivered_count();
    } else {
        metrics.inc_failure_count();
    }
    observability::record_handler_invocation(channel, handler, success);
}
