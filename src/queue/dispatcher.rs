use async_channel::{Receiver, Sender};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::models::{FetchOptions, ScrapeResult};
use crate::observability::Metrics;
use crate::worker::{ScrapeTransport, Worker};

/// Work queue capacity. One slot keeps the feeder at most one URL ahead of
/// the pool, so admission is bounded by the worker count.
const WORK_QUEUE_CAPACITY: usize = 1;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Work queue closed, URL not delivered: {0}")]
    QueueClosed(String),
}

/// Outcome of a drained worker pool
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchReport {
    pub workers: usize,
    pub submitted: usize,
    pub published: usize,
    pub panicked: usize,
}

/// Dispatcher owns the worker pool and the work queue
///
/// Architecture:
/// 1. `spawn` starts every worker before any URL is sent
/// 2. `submit` pushes URLs onto one shared MPMC queue; whichever worker is
///    free takes the next one
/// 3. Back-pressure: `submit` waits while the queue is full
/// 4. `finish` closes the work queue, waits for every worker to exit, and
///    only then closes the result queue
pub struct Dispatcher {
    work_tx: Sender<String>,
    results: Sender<ScrapeResult>,
    workers: JoinSet<usize>,
    worker_count: usize,
    submitted: usize,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    /// Spawn `worker_count` workers sharing one work queue and `results`
    pub fn spawn(
        worker_count: usize,
        transport: Arc<dyn ScrapeTransport>,
        options: FetchOptions,
        results: Sender<ScrapeResult>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, DispatchError> {
        if worker_count == 0 {
            return Err(DispatchError::NoWorkers);
        }

        let (work_tx, work_rx): (Sender<String>, Receiver<String>) =
            async_channel::bounded(WORK_QUEUE_CAPACITY);
        let mut workers = JoinSet::new();

        for worker_id in 0..worker_count {
            let worker = Worker::new(worker_id, transport.clone(), options.clone(), metrics.clone());
            workers.spawn(worker.run(work_rx.clone(), results.clone()));
            debug!(worker_id, "Spawned worker");
        }

        info!(workers = worker_count, "Workers spun up");

        Ok(Self {
            work_tx,
            results,
            workers,
            worker_count,
            submitted: 0,
            metrics,
        })
    }

    /// Feed one URL to the pool, waiting while every worker is busy
    pub async fn submit(&mut self, url: String) -> Result<(), DispatchError> {
        self.work_tx
            .send(url)
            .await
            .map_err(|e| DispatchError::QueueClosed(e.into_inner()))?;
        self.metrics.url_fed();
        self.submitted += 1;
        Ok(())
    }

    /// URLs accepted so far
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn num_workers(&self) -> usize {
        self.worker_count
    }

    /// Close the work queue, wait for all workers (barrier), then close the
    /// result queue so the sink can drain and stop.
    pub async fn finish(mut self) -> DispatchReport {
        self.work_tx.close();
        info!(submitted = self.submitted, "All URLs sent to workers");

        let mut published = 0;
        let mut panicked = 0;
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(count) => published += count,
                Err(e) => {
                    panicked += 1;
                    error!(error = %e, "Worker task failed");
                }
            }
        }
        debug!(published, "All workers exited");

        self.results.close();

        DispatchReport {
            workers: self.worker_count,
            submitted: self.submitted,
            published,
            panicked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchRequest;
    use crate::worker::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Transport that tracks how many fetches are in flight at once
    #[derive(Default)]
    struct CountingTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScrapeTransport for CountingTransport {
        async fn fetch(&self, request: &FetchRequest) -> Result<ScrapeResult, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(20)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ScrapeResult {
                requested_url: request.target.clone(),
                status_code: Some(200),
                ..Default::default()
            })
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://site{}.test/", i)).collect()
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let (result_tx, _result_rx) = async_channel::unbounded();
        let result = Dispatcher::spawn(
            0,
            Arc::new(CountingTransport::default()),
            FetchOptions::default(),
            result_tx,
            Arc::new(Metrics::new()),
        );
        assert!(matches!(result, Err(DispatchError::NoWorkers)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_worker_count() {
        let transport = Arc::new(CountingTransport::default());
        let (result_tx, result_rx) = async_channel::bounded(3);

        let mut dispatcher = Dispatcher::spawn(
            3,
            transport.clone(),
            FetchOptions::default(),
            result_tx,
            Arc::new(Metrics::new()),
        )
        .unwrap();

        let drain = tokio::spawn(async move {
            let mut received = 0;
            while result_rx.recv().await.is_ok() {
                received += 1;
            }
            received
        });

        for url in urls(20) {
            dispatcher.submit(url).await.unwrap();
        }
        let report = dispatcher.finish().await;

        assert_eq!(drain.await.unwrap(), 20);
        assert_eq!(report.submitted, 20);
        assert_eq!(report.published, 20);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 20);

        let max = transport.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "max in flight was {}", max);
        assert!(max >= 2, "pool never ran concurrently (max {})", max);
    }

    #[tokio::test]
    async fn test_result_queue_closes_only_after_workers_exit() {
        let (result_tx, result_rx) = async_channel::unbounded();
        let mut dispatcher = Dispatcher::spawn(
            2,
            Arc::new(CountingTransport::default()),
            FetchOptions::default(),
            result_tx,
            Arc::new(Metrics::new()),
        )
        .unwrap();

        for url in urls(5) {
            dispatcher.submit(url).await.unwrap();
        }
        assert!(!result_rx.is_closed());

        let report = dispatcher.finish().await;
        assert!(result_rx.is_closed());
        assert_eq!(report.panicked, 0);

        // Every result published before the close is still delivered
        let mut received = Vec::new();
        while let Ok(result) = result_rx.recv().await {
            received.push(result.requested_url);
        }
        received.sort();
        let mut expected = urls(5);
        expected.sort();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_submit_counts_metrics() {
        let metrics = Arc::new(Metrics::new());
        let (result_tx, _result_rx) = async_channel::unbounded();
        let mut dispatcher = Dispatcher::spawn(
            1,
            Arc::new(CountingTransport::default()),
            FetchOptions::default(),
            result_tx,
            metrics.clone(),
        )
        .unwrap();

        dispatcher.submit("https://a.test/".to_string()).await.unwrap();
        assert_eq!(dispatcher.submitted(), 1);
        assert_eq!(dispatcher.num_workers(), 1);
        dispatcher.finish().await;

        assert_eq!(metrics.snapshot().urls_fed, 1);
        assert_eq!(metrics.snapshot().fetch_ok, 1);
    }
}
