//! Startup wiring: storage, input and scraper client from configuration
//!
//! Any failure here aborts before a single URL is fed.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{Config, ValidationError};
use crate::pipeline::{Pipeline, PipelineError, PipelineOptions, RunSummary};
use crate::source::{LineSource, SourceError};
use crate::storage::{SqliteStore, StorageError};
use crate::worker::{FetchError, ScraperClient};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("Input unavailable: {0}")]
    Source(#[from] SourceError),

    #[error("Scraper client unavailable: {0}")]
    Client(#[from] FetchError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// URLs this configuration would feed, without contacting the scraper
pub fn select_urls(config: &Config) -> Result<Vec<String>, HarnessError> {
    let mut source = LineSource::open(&config.input.path)?;
    let urls = source.select(config.selection_mode(), config.pipeline.max_urls)?;
    info!(
        path = %config.input.path.display(),
        mode = ?config.selection_mode(),
        selected = urls.len(),
        "Selected URLs"
    );
    Ok(urls)
}

/// Full run: reset storage, select URLs, drive them through the pool
pub async fn run(config: &Config) -> Result<RunSummary, HarnessError> {
    config.validate()?;

    let store = SqliteStore::open(&config.storage.path)?;
    store.reset()?;

    let urls = select_urls(config)?;

    let client = ScraperClient::new(&config.scraper.base_url, config.http_config())?;
    info!(scraper = %client.base_url(), "Scraper client ready");

    let pipeline = Pipeline::new(
        Arc::new(client),
        PipelineOptions {
            workers: config.pipeline.workers,
            fetch: config.fetch_options(),
        },
    );

    Ok(pipeline.run(urls, store).await?)
}
