//! Result sink - the single serial consumer of the result queue
//!
//! Runs on a blocking thread that owns the store, so there is exactly one
//! writer. Results are persisted and logged strictly in arrival order. The
//! sink stops once the result queue is closed and drained, drops the store
//! and hands back a `SinkReport` through its join handle.

use async_channel::Receiver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::models::ScrapeResult;
use crate::observability::Metrics;
use crate::storage::ResultStore;

/// What the sink did over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SinkReport {
    pub completed: u64,
    pub persisted: u64,
    pub failed_inserts: u64,
}

/// Start the sink. Must be called before any worker can publish.
pub fn spawn<S: ResultStore>(
    store: S,
    results: Receiver<ScrapeResult>,
    metrics: Arc<Metrics>,
) -> JoinHandle<SinkReport> {
    tokio::task::spawn_blocking(move || drain(store, results, &metrics))
}

/// Consume results until the queue is closed and empty
pub fn drain<S: ResultStore>(
    mut store: S,
    results: Receiver<ScrapeResult>,
    metrics: &Metrics,
) -> SinkReport {
    let mut report = SinkReport::default();

    while let Ok(result) = results.recv_blocking() {
        report.completed += 1;

        match store.insert(&result) {
            Ok(()) => {
                report.persisted += 1;
                metrics.row_persisted();
            }
            Err(e) => {
                report.failed_inserts += 1;
                metrics.insert_failed();
                error!(url = %result.requested_url, error = %e, "Failed to insert result");
            }
        }

        let status = result.status_code.unwrap_or_default();
        if result.is_success() {
            info!(
                completed = report.completed,
                url = %result.requested_url,
                status,
                duration_ms = result.duration_ms,
                "Completed result"
            );
        } else {
            info!(
                completed = report.completed,
                url = %result.requested_url,
                status,
                error = %result.error,
                duration_ms = result.duration_ms,
                "Completed result"
            );
        }
    }

    drop(store);
    debug!(?report, "Result sink drained");
    report
}
