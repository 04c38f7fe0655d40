//! Channel traits - publisher and registrant interfaces

use std::sync::Arc;

use async_trait::async_trait;

use crate::{ChannelError, Message, MessageHandler};

/// Anything a message can be sent to
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Channel name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Send a message
    ///
    /// `Ok(true)` means the message was accepted for delivery. `Ok(false)`
    /// means nothing was delivered but the channel tolerates that.
    ///
    /// # Errors
    /// Returns the dispatch failure, if the channel surfaces it to senders
    async fn send(&self, message: Message) -> Result<bool, ChannelError>;
}

/// A channel handlers can subscribe to
pub trait SubscribableChannel: MessageChannel {
    /// Register a handler; returns false if the registry refused it
    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> bool;

    /// Remove a handler; returns false if it was not registered
    fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool;
}
