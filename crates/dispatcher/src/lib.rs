//! # Dispatcher
//!
//! Publish-subscribe fan-out.
//!
//! Responsible for:
//! - Keeping an ordered, snapshot-isolated set of subscribers
//! - Broadcasting each message to the snapshot, in the caller or on a pool
//! - Routing pooled handler failures to an error destination

pub mod channel;
pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pool;
pub mod registry;
pub mod routing;

pub use channel::{ChannelBuilder, PublishSubscribeChannel};
pub use channels::{NullChannel, QueueChannel};
pub use contracts::{Message, MessageChannel, MessageHandler, SubscribableChannel};
pub use dispatcher::{sequenced_copy, BroadcastDispatcher, DispatchOutcome, Execution};
pub use error::DispatcherError;
pub use handlers::{FnHandler, LogHandler};
pub use metrics::{ChannelMetrics, ChannelMetricsSnapshot, PoolMetrics, PoolMetricsSnapshot};
pub use pool::WorkerPool;
pub use registry::{Snapshot, SubscriberRegistry};
pub use routing::{failure_message, ErrorRouter, ErrorRouting, RoutingLimits};
