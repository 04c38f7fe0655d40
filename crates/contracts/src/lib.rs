//! # Contracts
//!
//! Interface contracts shared by every messaging crate: the message model,
//! the handler/channel/executor capabilities, the error taxonomy and the
//! configuration types. Business crates depend on this crate, never the
//! other way round.

mod channel;
mod config;
mod error;
mod executor;
mod handler;
mod message;

pub use channel::{MessageChannel, SubscribableChannel};
pub use config::*;
pub use error::*;
pub use executor::{Task, TaskExecutor};
pub use handler::MessageHandler;
pub use message::{headers, HeaderValue, Message, MessageHeaders, MessageId, Payload};
