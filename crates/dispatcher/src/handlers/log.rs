//! LogHandler - logs message summary via tracing

use async_trait::async_trait;
use tracing::{info, instrument};

use contracts::{HandlerError, Message, MessageHandler};

/// Handler that logs message summaries for debugging
pub struct LogHandler {
    name: String,
}

impl LogHandler {
    /// Create a new LogHandler with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl MessageHandler for LogHandler {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_handler_handle",
        skip(self, message),
        fields(handler = %self.name, message_id = %message.id())
    )]
    async fn handle_message(&self, message: &Message) -> Result<(), HandlerError> {
        let h = message.headers();
        info!(
            handler = %self.name,
            message_id = %message.id(),
            headers = h.len(),
            has_payload = message.has_payload(),
            sequence_number = ?h.sequence_number(),
            sequence_size = ?h.sequence_size(),
            "Message received"
        );
        Ok(())
    }
}
