//! Run metrics (atomic counters shared by feeder, workers and sink)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    urls_fed: AtomicU64,
    fetch_ok: AtomicU64,
    fetch_failed: AtomicU64,
    requests_skipped: AtomicU64,
    rows_persisted: AtomicU64,
    insert_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_fed(&self) {
        self.urls_fed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "urls_fed", "Metric incremented");
    }

    pub fn fetch_ok(&self) {
        self.fetch_ok.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "fetch_ok", "Metric incremented");
    }

    pub fn fetch_failed(&self) {
        self.fetch_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "fetch_failed", "Metric incremented");
    }

    pub fn request_skipped(&self) {
        self.requests_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "requests_skipped", "Metric incremented");
    }

    pub fn row_persisted(&self) {
        self.rows_persisted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "rows_persisted", "Metric incremented");
    }

    pub fn insert_failed(&self) {
        self.insert_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "insert_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            urls_fed: self.urls_fed.load(Ordering::Relaxed),
            fetch_ok: self.fetch_ok.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            requests_skipped: self.requests_skipped.load(Ordering::Relaxed),
            rows_persisted: self.rows_persisted.load(Ordering::Relaxed),
            insert_failed: self.insert_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub urls_fed: u64,
    pub fetch_ok: u64,
    pub fetch_failed: u64,
    pub requests_skipped: u64,
    pub rows_persisted: u64,
    pub insert_failed: u64,
}
