//! QueueChannel - bounded buffer drained by explicit receives
//!
//! `send` waits while the buffer is full.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use contracts::{ChannelError, Message, MessageChannel};

/// Bounded point-to-point channel
pub struct QueueChannel {
    name: String,
    capacity: usize,
    tx: mpsc::Sender<Message>,
    rx: Mutex<mpsc::Receiver<Message>>,
}

impl QueueChannel {
    /// Create a queue holding at most `capacity` messages (minimum 1)
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            name: name.into(),
            capacity,
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Wait for the next message
    pub async fn receive(&self) -> Option<Message> {
        self.rx.lock().await.recv().await
    }

    /// Wait at most `timeout` for the next message
    pub async fn receive_timeout(&self, timeout: Duration) -> Option<Message> {
        tokio::time::timeout(timeout, self.receive())
            .await
            .ok()
            .flatten()
    }

    /// Take a message if one is buffered and no receiver is waiting
    pub fn try_receive(&self) -> Option<Message> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }

    /// Buffered message count
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageChannel for QueueChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: Message) -> Result<bool, ChannelError> {
        let message_id = message.id();
        // the receiver lives as long as self, so this only fails while dropping
        let accepted = self.tx.send(message).await.is_ok();
        debug!(channel = %self.name, message_id = %message_id, accepted, "Message queued");
        Ok(accepted)
    }
}
