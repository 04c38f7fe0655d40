//! WorkerPool - bounded pool of worker tasks implementing `TaskExecutor`
//!
//! Tasks go through one bounded MPMC queue shared by all workers. A full
//! queue either blocks the submitter or rejects the task, per
//! `RejectionPolicy`. Workers survive failing and panicking tasks.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::TrySendError;
use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use contracts::{ExecutorError, RejectionPolicy, Task, TaskExecutor, WorkerPoolConfig};

use crate::error::DispatcherError;
use crate::metrics::PoolMetrics;

/// Fixed-size worker pool
pub struct WorkerPool {
    name: String,
    capacity: usize,
    policy: RejectionPolicy,
    tx: async_channel::Sender<Task>,
    metrics: Arc<PoolMetrics>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Validate the config and spawn the workers on the current runtime
    #[instrument(
        name = "worker_pool_spawn",
        skip(config),
        fields(pool = %config.name, workers = config.workers)
    )]
    pub fn spawn(config: &WorkerPoolConfig) -> Result<Self, DispatcherError> {
        config.check()?;
        let runtime =
            Handle::try_current().map_err(|_| DispatcherError::no_runtime(&config.name))?;

        let (tx, rx) = async_channel::bounded(config.queue_capacity);
        let metrics = Arc::new(PoolMetrics::new());

        let workers = (0..config.workers)
            .map(|worker_id| {
                let rx = rx.clone();
                let metrics = Arc::clone(&metrics);
                let name = config.name.clone();
                runtime.spawn(pool_worker(worker_id, rx, metrics, name))
            })
            .collect();

        info!(
            pool = %config.name,
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            policy = ?config.rejection_policy,
            "Worker pool started"
        );

        Ok(Self {
            name: config.name.clone(),
            capacity: config.queue_capacity,
            policy: config.rejection_policy,
            tx,
            metrics,
            workers: Mutex::new(workers),
        })
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }

    pub fn is_shut_down(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stop accepting tasks, drain the queue and wait for the workers
    #[instrument(name = "worker_pool_shutdown", skip(self), fields(pool = %self.name))]
    pub async fn shutdown(&self) {
        self.tx.close();

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if let Err(e) = worker.await {
                error!(pool = %self.name, error = ?e, "Pool worker terminated abnormally");
            }
        }
        debug!(pool = %self.name, "Worker pool shutdown complete");
    }

    fn shutdown_error(&self) -> ExecutorError {
        ExecutorError::Shutdown {
            pool: self.name.clone(),
        }
    }
}

#[async_trait]
impl TaskExecutor for WorkerPool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        let result = match self.policy {
            RejectionPolicy::Block => self.tx.send(task).await.map_err(|_| self.shutdown_error()),
            RejectionPolicy::Reject => self.tx.try_send(task).map_err(|e| match e {
                TrySendError::Full(_) => ExecutorError::Rejected {
                    pool: self.name.clone(),
                    capacity: self.capacity,
                },
                TrySendError::Closed(_) => self.shutdown_error(),
            }),
        };

        match &result {
            Ok(()) => {
                self.metrics.inc_submitted_count();
                self.metrics.set_queue_len(self.tx.len());
            }
            Err(ExecutorError::Rejected { .. }) => {
                self.metrics.inc_rejected_count();
                observability::record_task_rejected(&self.name);
                warn!(pool = %self.name, capacity = self.capacity, "Queue full, task rejected");
            }
            Err(ExecutorError::Shutdown { .. }) => {
                warn!(pool = %self.name, "Task submitted after shutdown");
            }
        }
        result
    }
}

/// Worker task that runs queued tasks until the queue closes and drains
#[instrument(name = "pool_worker_loop", skip(rx, metrics), fields(pool = %pool, worker = worker_id))]
async fn pool_worker(
    worker_id: usize,
    rx: async_channel::Receiver<Task>,
    metrics: Arc<PoolMetrics>,
    pool: String,
) {
    debug!(pool = %pool, worker = worker_id, "Pool worker started");

    while let Ok(task) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => metrics.inc_completed_count(),
            Ok(Err(failure)) => {
                metrics.inc_failed_count();
                error!(
                    pool = %pool,
                    worker = worker_id,
                    channel = %failure.channel,
                    handler = %failure.handler,
                    message_id = %failure.message_id(),
                    error = %failure.source,
                    "Handler failure re-raised in worker"
                );
            }
            Err(panic) => {
                metrics.inc_panicked_count();
                error!(
                    pool = %pool,
                    worker = worker_id,
                    panic = %panic_message(&*panic),
                    "Task panicked"
                );
            }
        }
    }

    debug!(pool = %pool, worker = worker_id, "Pool worker stopped");
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
