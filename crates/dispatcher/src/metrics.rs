//! Worker metrics for renderer and persistence queues

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for one isolated worker
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Items handled successfully
    processed_count: AtomicU64,
    /// Items whose handling failed
    failure_count: AtomicU64,
    /// Items dropped because the queue was full
    dropped_count: AtomicU64,
    /// View-bounds updates sent (renderers only)
    bounds_updates: AtomicU64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count.load(Ordering::Relaxed)
    }

    pub fn inc_processed_count(&self) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bounds_updates(&self) -> u64 {
        self.bounds_updates.load(Ordering::Relaxed)
    }

    pub fn inc_bounds_updates(&self) {
        self.bounds_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            processed_count: self.processed_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            bounds_updates: self.bounds_updates(),
        }
    }
}

/// Snapshot of worker metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub processed_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub bounds_updates: u64,
}
