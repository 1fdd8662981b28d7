use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion counters, updated without locking.
#[derive(Debug, Default)]
pub struct IngestStats {
    raw_received: AtomicU64,
    raw_persisted: AtomicU64,
    raw_shape_rejected: AtomicU64,
    processed_received: AtomicU64,
    processed_rejected: AtomicU64,
    aggregates_published: AtomicU64,
    forwards_attempted: AtomicU64,
    forwards_failed: AtomicU64,
    storage_failures: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub raw_received: u64,
    pub raw_persisted: u64,
    pub raw_shape_rejected: u64,
    pub processed_received: u64,
    pub processed_rejected: u64,
    pub aggregates_published: u64,
    pub forwards_attempted: u64,
    pub forwards_failed: u64,
    pub storage_failures: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_raw_received(&self) {
        self.raw_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_raw_persisted(&self) {
        self.raw_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_raw_shape_rejected(&self) {
        self.raw_shape_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed_received(&self) {
        self.processed_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed_rejected(&self) {
        self.processed_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_aggregate_published(&self) {
        self.aggregates_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forward_attempted(&self) {
        self.forwards_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forward_failed(&self) {
        self.forwards_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            raw_received: self.raw_received.load(Ordering::Relaxed),
            raw_persisted: self.raw_persisted.load(Ordering::Relaxed),
            raw_shape_rejected: self.raw_shape_rejected.load(Ordering::Relaxed),
            processed_received: self.processed_received.load(Ordering::Relaxed),
            processed_rejected: self.processed_rejected.load(Ordering::Relaxed),
            aggregates_published: self.aggregates_published.load(Ordering::Relaxed),
            forwards_attempted: self.forwards_attempted.load(Ordering::Relaxed),
            forwards_failed: self.forwards_failed.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
        }
    }
}
