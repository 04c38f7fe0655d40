//! Channel and worker pool configuration contracts

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ContractError;

/// Publish-subscribe channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChannelConfig {
    /// Channel name
    #[validate(length(min = 1))]
    pub name: String,

    /// Keep dispatching after a handler fails
    #[serde(default)]
    pub ignore_failures: bool,

    /// Stamp sequence headers on fan-out copies
    #[serde(default)]
    pub apply_sequence: bool,

    /// Treat a send with no subscribers as an error
    #[serde(default = "default_require_subscribers")]
    pub require_subscribers: bool,

    /// Whether a handler may be registered more than once
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

fn default_require_subscribers() -> bool {
    true
}

impl ChannelConfig {
    /// Default configuration for a named channel
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ignore_failures: false,
            apply_sequence: false,
            require_subscribers: default_require_subscribers(),
            duplicates: DuplicatePolicy::default(),
        }
    }

    /// Validate and map failures to `ContractError`
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(ContractError::from)
    }
}

/// Duplicate registration policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The same handler may be registered several times
    #[default]
    Allow,
    /// A second registration of the same handler is refused
    Reject,
}

/// Bounded worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkerPoolConfig {
    /// Pool name
    #[validate(length(min = 1))]
    pub name: String,

    /// Number of worker tasks
    #[validate(range(min = 1))]
    pub workers: usize,

    /// Pending task queue capacity
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// What `execute` does when the queue is full
    #[serde(default)]
    pub rejection_policy: RejectionPolicy,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: "dispatch-pool".to_string(),
            workers: 4,
            queue_capacity: 256,
            rejection_policy: RejectionPolicy::default(),
        }
    }
}

impl WorkerPoolConfig {
    /// Validate and map failures to `ContractError`
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(ContractError::from)
    }
}

/// Admission policy for a saturated pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Wait for queue space (backpressure on the sender)
    #[default]
    Block,
    /// Fail the submission immediately
    Reject,
}
