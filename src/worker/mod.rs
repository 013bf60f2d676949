//! Scrape workers
//!
//! Each worker pulls URLs from the shared work queue, calls the scraper
//! through a `ScrapeTransport` and publishes one `ScrapeResult` per URL.

pub mod http;
pub mod runner;

pub use http::{FetchError, HttpConfig, ScrapeTransport, ScraperClient};
pub use runner::Worker;
