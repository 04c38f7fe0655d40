//! Layered error definitions
//!
//! Categorized by source: config / handler / dispatch / executor

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::{Message, MessageId};

/// Shared, cloneable error cause
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ContractError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        Self::config_validation(field, errors.to_string())
    }
}

/// Failure raised by a subscriber's accept call
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The handler refused the message
    #[error("message rejected: {reason}")]
    Rejected { reason: String },

    /// The handler failed while processing
    #[error("handling failed: {reason}")]
    Failed {
        reason: String,
        #[source]
        source: Option<SharedError>,
    },

    /// The handler panicked (pooled execution only)
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary error as the cause
    pub fn from_source<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Failed {
            reason: reason.into(),
            source: Some(Arc::new(source)),
        }
    }
}

/// A handler failure bound to the handler and the message it received
#[derive(Debug, Clone, Error)]
#[error("handler '{handler}' on channel '{channel}' failed for message {}: {source}", .message.id())]
pub struct HandlerInvocationError {
    pub channel: String,
    pub handler: String,
    pub message: Message,
    #[source]
    pub source: HandlerError,
}

impl HandlerInvocationError {
    pub fn new(
        channel: impl Into<String>,
        handler: impl Into<String>,
        message: Message,
        source: HandlerError,
    ) -> Self {
        Self {
            channel: channel.into(),
            handler: handler.into(),
            message,
            source,
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.message.id()
    }
}

/// Failures collected over a full fan-out when failures are ignored
#[derive(Debug, Clone, Error)]
#[error("{} of {attempted} handlers failed on channel '{channel}'", .failures.len())]
pub struct AggregateDispatchError {
    pub channel: String,
    pub attempted: usize,
    pub failures: Vec<HandlerInvocationError>,
}

impl AggregateDispatchError {
    /// Names of the failing handlers, in invocation order
    pub fn failed_handlers(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.handler.as_str()).collect()
    }
}

/// Worker pool admission errors
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    /// Queue full under the reject policy
    #[error("worker pool '{pool}' rejected task: queue full (capacity {capacity})")]
    Rejected { pool: String, capacity: usize },

    /// Pool no longer accepts tasks
    #[error("worker pool '{pool}' is shut down")]
    Shutdown { pool: String },
}

/// Errors surfaced by `MessageChannel::send`
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Send on a channel with no subscribers
    #[error("channel '{channel}' has no subscribers")]
    NoSubscribers { channel: String },

    /// Fail-fast synchronous dispatch hit a failing handler
    #[error(transparent)]
    HandlerInvocation(#[from] HandlerInvocationError),

    /// Synchronous dispatch with failures ignored finished with failures
    #[error(transparent)]
    AggregateDispatch(#[from] AggregateDispatchError),

    /// Pooled dispatch could not submit an invocation
    #[error("channel '{channel}' could not submit handler '{handler}': {source}")]
    Submission {
        channel: String,
        handler: String,
        #[source]
        source: ExecutorError,
    },
}

impl ChannelError {
    pub fn no_subscribers(channel: impl Into<String>) -> Self {
        Self::NoSubscribers {
            channel: channel.into(),
        }
    }

    pub fn submission(
        channel: impl Into<String>,
        handler: impl Into<String>,
        source: ExecutorError,
    ) -> Self {
        Self::Submission {
            channel: channel.into(),
            handler: handler.into(),
            source,
        }
    }
}
