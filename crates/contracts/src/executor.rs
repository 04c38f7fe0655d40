//! TaskExecutor trait - worker pool capability
//!
//! The dispatcher only ever submits to an executor. Starting, stopping and
//! sizing it belong to whoever owns it.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::{ExecutorError, HandlerInvocationError};

/// One handler invocation
///
/// An `Err` output is a failure re-raised inside the worker; what happens
/// to it is up to the executor.
pub type Task = BoxFuture<'static, Result<(), HandlerInvocationError>>;

/// Bounded worker pool capability
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Executor name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Submit a task
    ///
    /// May wait for queue space, depending on the executor's admission policy.
    ///
    /// # Errors
    /// Returns an error if the task was not accepted
    async fn execute(&self, task: Task) -> Result<(), ExecutorError>;
}
