//! Configuration management for scrapebench
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary)
//!
//! # Environment Variables
//!
//! Any key can be overridden with `SCRAPEBENCH__<section>__<key>`, e.g.
//! `SCRAPEBENCH__PIPELINE__WORKERS=20` or
//! `SCRAPEBENCH__SCRAPER__REQUEST_TIMEOUT=2m`.
//!
//! # Configuration File
//!
//! Loaded from `config/scrapebench.toml` unless `SCRAPEBENCH_CONFIG` or
//! `--config` points elsewhere. A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, InputConfig, PipelineConfig, ScraperConfig, StorageConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

use crate::models::FetchOptions;
use crate::source::SelectionMode;
use crate::worker::HttpConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from file + environment. `path` overrides the
    /// default file location. Validation is left to the caller so that CLI
    /// overrides can be applied first.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Ok(sources::load(path)?)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// HTTP client settings for the shared scraper client
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: self.scraper.connect_timeout.as_duration(),
            request_timeout: self.scraper.request_timeout.as_duration(),
            user_agent: self.scraper.user_agent.clone(),
        }
    }

    /// Flags every worker forwards to the scraper
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            proxy: self
                .scraper
                .proxy
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            cookies: self.scraper.cookies,
        }
    }

    pub fn selection_mode(&self) -> SelectionMode {
        if self.pipeline.random {
            SelectionMode::Random
        } else {
            SelectionMode::Sequential
        }
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
