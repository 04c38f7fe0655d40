//! MessageHandler trait - subscriber capability
//!
//! A handler accepts a message and either returns normally or fails.

use async_trait::async_trait;

use crate::{HandlerError, Message};

/// Subscriber capability
///
/// Registries hold handlers as `Arc<dyn MessageHandler>`; identity is the
/// allocation, not the name, so two handlers may share a name.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handler name (used for logging/metrics and failure reports)
    fn name(&self) -> &str;

    /// Accept a message
    ///
    /// # Errors
    /// Returns the reason the message could not be handled
    async fn handle_message(&self, message: &Message) -> Result<(), HandlerError>;
}
