//! Dispatcher error types

use thiserror::Error;

/// Errors raised while assembling channels and pools
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Invalid channel or pool configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// A pooled channel was built without deciding where failures go
    #[error("channel '{channel}' uses a worker pool but no error routing was chosen")]
    MissingErrorRouting { channel: String },

    /// Spawning background tasks requires a Tokio runtime
    #[error("'{component}' must be created inside a Tokio runtime")]
    NoRuntime { component: String },
}

impl DispatcherError {
    pub fn missing_error_routing(channel: impl Into<String>) -> Self {
        Self::MissingErrorRouting {
            channel: channel.into(),
        }
    }

    pub fn no_runtime(component: impl Into<String>) -> Self {
        Self::NoRuntime {
            component: component.into(),
        }
    }
}
