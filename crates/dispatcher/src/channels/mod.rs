//! Point-to-point channel implementations
//!
//! Contains NullChannel and QueueChannel, both usable as error destinations.

mod null;
mod queue;

pub use self::null::NullChannel;
pub use self::queue::QueueChannel;
