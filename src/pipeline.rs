//! Run orchestration
//!
//! Wires line source output, dispatcher, workers and sink together and
//! performs the ordered shutdown:
//!
//! `Idle -> Feeding -> DrainingWorkers -> DrainingSink -> Done`
//!
//! The sink is only awaited after every worker has exited, so no result can
//! be published after the sink reports completion.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::FetchOptions;
use crate::observability::{Metrics, MetricsSnapshot};
use crate::queue::{DispatchError, DispatchReport, Dispatcher};
use crate::sink::{self, SinkReport};
use crate::storage::ResultStore;
use crate::worker::ScrapeTransport;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Result sink failed: {0}")]
    Sink(#[from] tokio::task::JoinError),
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Idle,
    Feeding,
    DrainingWorkers,
    DrainingSink,
    Done,
}

impl RunPhase {
    /// The only legal successor; phases cannot be skipped
    pub fn next(self) -> Self {
        match self {
            RunPhase::Idle => RunPhase::Feeding,
            RunPhase::Feeding => RunPhase::DrainingWorkers,
            RunPhase::DrainingWorkers => RunPhase::DrainingSink,
            RunPhase::DrainingSink | RunPhase::Done => RunPhase::Done,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Feeding => "feeding",
            RunPhase::DrainingWorkers => "draining workers",
            RunPhase::DrainingSink => "draining sink",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything known about a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub urls_fed: usize,
    pub phases: Vec<RunPhase>,
    pub dispatch: DispatchReport,
    pub sink: SinkReport,
    pub metrics: MetricsSnapshot,
}

/// Pool settings for one run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub fetch: FetchOptions,
}

/// One load-generation run against a scraper transport
pub struct Pipeline {
    transport: Arc<dyn ScrapeTransport>,
    options: PipelineOptions,
    metrics: Arc<Metrics>,
    phases: Vec<RunPhase>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn ScrapeTransport>, options: PipelineOptions) -> Self {
        Self {
            transport,
            options,
            metrics: Arc::new(Metrics::new()),
            phases: vec![RunPhase::Idle],
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    fn phase(&self) -> RunPhase {
        self.phases.last().copied().unwrap_or(RunPhase::Idle)
    }

    fn advance(&mut self) {
        let from = self.phase();
        let to = from.next();
        debug!(%from, %to, "Phase transition");
        self.phases.push(to);
    }

    /// Feed every URL through the pool and persist every result into `store`.
    /// The store is dropped by the sink once the result queue is drained.
    pub async fn run<I, S>(mut self, urls: I, store: S) -> Result<RunSummary, PipelineError>
    where
        I: IntoIterator<Item = String>,
        S: ResultStore,
    {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        info!(%run_id, workers = self.options.workers, "Starting run");

        // Sink first, so it is consuming before any worker can publish
        let (result_tx, result_rx) = async_channel::bounded(self.options.workers.max(1));
        let sink_handle = sink::spawn(store, result_rx, self.metrics.clone());

        let mut dispatcher = match Dispatcher::spawn(
            self.options.workers,
            self.transport.clone(),
            self.options.fetch.clone(),
            result_tx,
            self.metrics.clone(),
        ) {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                // The sender went down with the failed spawn; let the sink exit
                let _ = sink_handle.await;
                return Err(e.into());
            }
        };

        self.advance();
        for (index, url) in urls.into_iter().enumerate() {
            let shown = url.clone();
            if let Err(e) = dispatcher.submit(url).await {
                warn!(error = %e, "Stopped feeding");
                break;
            }
            info!(started = index + 1, url = %shown, "Started result");
        }
        let urls_fed = dispatcher.submitted();

        self.advance();
        let dispatch = dispatcher.finish().await;

        self.advance();
        let sink = sink_handle.await?;

        self.advance();
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            urls_fed,
            phases: self.phases,
            dispatch,
            sink,
            metrics: self.metrics.snapshot(),
        };

        info!(
            %run_id,
            urls_fed = summary.urls_fed,
            persisted = summary.sink.persisted,
            failed_inserts = summary.sink.failed_inserts,
            "Done"
        );
        Ok(summary)
    }
}
