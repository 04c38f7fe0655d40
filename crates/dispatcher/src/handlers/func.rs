//! FnHandler - adapts a closure to `MessageHandler`

use async_trait::async_trait;

use contracts::{HandlerError, Message, MessageHandler};

/// Handler backed by a synchronous closure
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_message(&self, message: &Message) -> Result<(), HandlerError> {
        (self.f)(message)
    }
}
