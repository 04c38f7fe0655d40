//! NullChannel - accepts and discards every message

use async_trait::async_trait;
use tracing::trace;

use contracts::{ChannelError, Message, MessageChannel};

/// Channel that drops everything sent to it
pub struct NullChannel {
    name: String,
}

impl NullChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NullChannel {
    fn default() -> Self {
        Self::new("nullChannel")
    }
}

#[async_trait]
impl MessageChannel for NullChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: Message) -> Result<bool, ChannelError> {
        trace!(channel = %self.name, message_id = %message.id(), "Message discarded");
        Ok(true)
    }
}
