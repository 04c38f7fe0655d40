//! Channel and pool metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Metrics for a single channel
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Messages passed to `send`
    send_count: AtomicU64,
    /// Handler invocations that returned normally
    delivered_count: AtomicU64,
    /// Handler invocations that failed
    failure_count: AtomicU64,
    /// Sends that found no subscribers
    no_subscriber_count: AtomicU64,
    /// Failures forwarded to an error destination
    routed_count: AtomicU64,
    /// Failures dropped because no destination took them
    dropped_count: AtomicU64,
}

impl ChannelMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get send count
    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::Relaxed)
    }

    /// Increment send count
    pub fn inc_send_count(&self) {
        self.send_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get delivered count
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Increment delivered count
    pub fn inc_delivered_count(&self) {
        self.delivered_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get no-subscriber count
    pub fn no_subscriber_count(&self) -> u64 {
        self.no_subscriber_count.load(Ordering::Relaxed)
    }

    /// Increment no-subscriber count
    pub fn inc_no_subscriber_count(&self) {
        self.no_subscriber_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get routed count
    pub fn routed_count(&self) -> u64 {
        self.routed_count.load(Ordering::Relaxed)
    }

    /// Increment routed count
    pub fn inc_routed_count(&self) {
        self.routed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get dropped count
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Increment dropped count
    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> ChannelMetricsSnapshot {
        ChannelMetricsSnapshot {
            send_count: self.send_count(),
            delivered_count: self.delivered_count(),
            failure_count: self.failure_count(),
            no_subscriber_count: self.no_subscriber_count(),
            routed_count: self.routed_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of channel metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMetricsSnapshot {
    pub send_count: u64,
    pub delivered_count: u64,
    pub failure_count: u64,
    pub no_subscriber_count: u64,
    pub routed_count: u64,
    pub dropped_count: u64,
}

/// Metrics for a worker pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Tasks waiting in the queue
    queue_len: AtomicUsize,
    submitted_count: AtomicU64,
    completed_count: AtomicU64,
    /// Tasks that re-raised a failure
    failed_count: AtomicU64,
    panicked_count: AtomicU64,
    rejected_count: AtomicU64,
}

impl PoolMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get submitted count
    pub fn submitted_count(&self) -> u64 {
        self.submitted_count.load(Ordering::Relaxed)
    }

    /// Increment submitted count
    pub fn inc_submitted_count(&self) {
        self.submitted_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get completed count
    pub fn completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    /// Increment completed count
    pub fn inc_completed_count(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failed count
    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    /// Increment failed count
    pub fn inc_failed_count(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get panicked count
    pub fn panicked_count(&self) -> u64 {
        self.panicked_count.load(Ordering::Relaxed)
    }

    /// Increment panicked count
    pub fn inc_panicked_count(&self) {
        self.panicked_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get rejected count
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    /// Increment rejected count
    pub fn inc_rejected_count(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            queue_len: self.queue_len(),
            submitted_count: self.submitted_count(),
            completed_count: self.completed_count(),
            failed_count: self.failed_count(),
            panicked_count: self.panicked_count(),
            rejected_count: self.rejected_count(),
        }
    }
}

/// Snapshot of pool metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolMetricsSnapshot {
    pub queue_len: usize,
    pub submitted_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub panicked_count: u64,
    pub rejected_count: u64,
}
