//! Worker loop - owns the request -> result lifecycle for one URL at a time

use async_channel::{Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::http::{FetchError, ScrapeTransport};
use crate::models::{FetchOptions, FetchRequest, ScrapeResult};
use crate::observability::Metrics;

/// A single pool member. Workers share nothing but the two queues, the
/// transport and the metrics handle.
pub struct Worker {
    id: usize,
    transport: Arc<dyn ScrapeTransport>,
    options: FetchOptions,
    metrics: Arc<Metrics>,
}

impl Worker {
    pub fn new(
        id: usize,
        transport: Arc<dyn ScrapeTransport>,
        options: FetchOptions,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            id,
            transport,
            options,
            metrics,
        }
    }

    /// Pull URLs until the work queue is closed and drained.
    ///
    /// Per-request failures become failure results; they never end the loop.
    /// Returns the number of results published.
    pub async fn run(self, urls: Receiver<String>, results: Sender<ScrapeResult>) -> usize {
        debug!(worker_id = self.id, "Worker started");
        let mut published = 0;

        while let Ok(url) = urls.recv().await {
            let result = self.process(url).await;

            if results.send(result).await.is_err() {
                warn!(worker_id = self.id, "Result queue closed, worker stopping");
                break;
            }
            published += 1;
        }

        debug!(worker_id = self.id, published, "Worker finished");
        published
    }

    /// Fetch one URL and turn the outcome into a result
    pub async fn process(&self, url: String) -> ScrapeResult {
        let request = FetchRequest::new(url, self.options.clone());

        let start = Instant::now();
        let outcome = self.transport.fetch(&request).await;
        let elapsed_ms = elapsed_millis(start);

        match outcome {
            Ok(mut result) => {
                if result.is_success() {
                    self.metrics.fetch_ok();
                } else {
                    self.metrics.fetch_failed();
                    info!(
                        worker_id = self.id,
                        url = %request.target,
                        error = %result.error,
                        "Scraper reported an error"
                    );
                }
                result.requested_url = request.target;
                result.duration_ms = elapsed_ms;
                result
            }
            Err(FetchError::InvalidRequest(reason)) => {
                self.metrics.request_skipped();
                warn!(
                    worker_id = self.id,
                    url = %request.target,
                    reason = %reason,
                    "Could not build scraper request, skipping fetch"
                );
                ScrapeResult::failure(request.target, format!("invalid request: {}", reason))
            }
            Err(e) => {
                self.metrics.fetch_failed();
                info!(
                    worker_id = self.id,
                    url = %request.target,
                    error = %e,
                    "Failed to get result"
                );
                let mut result = failure_from_error(&request.target, e);
                result.duration_ms = elapsed_ms;
                result
            }
        }
    }
}

/// Milliseconds since `start`, rounded up. A fetch that reached the
/// transport never reports zero.
fn elapsed_millis(start: Instant) -> i64 {
    let millis = start.elapsed().as_micros().div_ceil(1000).max(1);
    i64::try_from(millis).unwrap_or(i64::MAX)
}

/// Failure result for a transport/decode error, keeping whatever the scraper
/// did report.
fn failure_from_error(target: &str, error: FetchError) -> ScrapeResult {
    let message = error.to_string();
    match error {
        FetchError::Status {
            status,
            reason,
            payload,
        } => {
            let mut result = payload.map(|p| *p).unwrap_or_default();
            result.requested_url = target.to_string();
            if result.status_code.is_none() {
                result.status_code = Some(i64::from(status));
            }
            if result.status_text.is_empty() {
                result.status_text = reason;
            }
            if result.error.is_empty() {
                result.error = message;
            }
            result
        }
        _ => ScrapeResult::failure(target, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Transport that answers from a fixed script keyed by target URL
    struct ScriptedTransport;

    #[async_trait]
    impl ScrapeTransport for ScriptedTransport {
        async fn fetch(&self, request: &FetchRequest) -> Result<ScrapeResult, FetchError> {
            if request.target == "https://instant.test/" {
                return Ok(ScrapeResult {
                    status_code: Some(200),
                    ..Default::default()
                });
            }

            tokio::time::sleep(Duration::from_millis(5)).await;
            match request.target.as_str() {
                "https://soft-fail.test/" => Ok(ScrapeResult {
                    status_code: Some(200),
                    error: "Error: net::ERR_NAME_NOT_RESOLVED".to_string(),
                    ..Default::default()
                }),
                "https://ok.test/" => Ok(ScrapeResult {
                    requested_url: "https://echoed-differently.test/".to_string(),
                    status_code: Some(200),
                    status_text: "OK".to_string(),
                    ..Default::default()
                }),
                "https://500.test/" => Err(FetchError::Status {
                    status: 500,
                    reason: "Internal Server Error".to_string(),
                    payload: None,
                }),
                "https://down.test/" => Err(FetchError::RequestFailed("connection refused".to_string())),
                other => Err(FetchError::InvalidRequest(format!("{}: bad", other))),
            }
        }
    }

    fn worker() -> (Worker, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        let worker = Worker::new(0, Arc::new(ScriptedTransport), FetchOptions::default(), metrics.clone());
        (worker, metrics)
    }

    #[tokio::test]
    async fn test_success_uses_submitted_url_and_measures_time() {
        let (worker, metrics) = worker();
        let result = worker.process("https://ok.test/".to_string()).await;

        assert!(result.is_success());
        assert_eq!(result.requested_url, "https://ok.test/");
        assert!(result.duration_ms >= 5);
        assert_eq!(metrics.snapshot().fetch_ok, 1);
    }

    #[tokio::test]
    async fn test_instant_reply_still_has_positive_duration() {
        let (worker, _metrics) = worker();
        let result = worker.process("https://instant.test/".to_string()).await;

        assert!(result.is_success());
        assert!(result.duration_ms >= 1, "duration was {}", result.duration_ms);
    }

    #[test]
    fn test_elapsed_millis_rounds_up() {
        assert!(elapsed_millis(Instant::now()) >= 1);

        if let Some(earlier) = Instant::now().checked_sub(Duration::from_micros(1500)) {
            assert!(elapsed_millis(earlier) >= 2);
        }
    }

    #[tokio::test]
    async fn test_error_in_ok_payload_counts_as_failure() {
        let (worker, metrics) = worker();
        let result = worker.process("https://soft-fail.test/".to_string()).await;

        assert!(!result.is_success());
        assert_eq!(result.status_code, Some(200));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fetch_ok, 0);
        assert_eq!(snapshot.fetch_failed, 1);
    }

    #[tokio::test]
    async fn test_http_error_becomes_failure_result() {
        let (worker, metrics) = worker();
        let result = worker.process("https://500.test/".to_string()).await;

        assert!(!result.is_success());
        assert_eq!(result.status_code, Some(500));
        assert_eq!(result.status_text, "Internal Server Error");
        assert!(result.duration_ms > 0);
        assert_eq!(metrics.snapshot().fetch_failed, 1);
    }

    #[tokio::test]
    async fn test_invalid_request_is_skipped() {
        let (worker, metrics) = worker();
        let result = worker.process("garbage".to_string()).await;

        assert!(result.error.starts_with("invalid request"));
        assert_eq!(result.duration_ms, 0);
        assert_eq!(metrics.snapshot().requests_skipped, 1);
    }

    #[tokio::test]
    async fn test_worker_continues_after_failures() {
        let (worker, _metrics) = worker();
        let (url_tx, url_rx) = async_channel::bounded(1);
        let (result_tx, result_rx) = async_channel::unbounded();

        let handle = tokio::spawn(worker.run(url_rx, result_tx));

        for url in ["https://down.test/", "https://500.test/", "https://ok.test/"] {
            url_tx.send(url.to_string()).await.unwrap();
        }
        drop(url_tx);

        assert_eq!(handle.await.unwrap(), 3);

        let mut urls = Vec::new();
        while let Ok(result) = result_rx.recv().await {
            urls.push(result.requested_url);
        }
        assert_eq!(urls, vec!["https://down.test/", "https://500.test/", "https://ok.test/"]);
    }

    #[test]
    fn test_failure_from_status_keeps_payload_fields() {
        let payload = ScrapeResult {
            status_code: Some(-1),
            error: "navigation timeout".to_string(),
            body: "partial".to_string(),
            ..Default::default()
        };
        let result = failure_from_error(
            "https://a.test/",
            FetchError::Status {
                status: 500,
                reason: "Internal Server Error".to_string(),
                payload: Some(Box::new(payload)),
            },
        );

        assert_eq!(result.requested_url, "https://a.test/");
        assert_eq!(result.status_code, Some(-1));
        assert_eq!(result.error, "navigation timeout");
        assert_eq!(result.body, "partial");
    }
}
