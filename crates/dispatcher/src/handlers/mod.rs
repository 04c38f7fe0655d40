//! Handler implementations
//!
//! Contains LogHandler and FnHandler.

mod func;
mod log;

pub use self::func::FnHandler;
pub use self::log::LogHandler;
