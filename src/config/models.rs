use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Scraper service connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Proxy address forwarded to the scraper (not used by this client)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Ask the scraper to return cookies
    #[serde(default)]
    pub cookies: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            proxy: None,
            cookies: false,
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(5 * 60)
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_user_agent() -> String {
    concat!("scrapebench/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Worker pool and URL selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Number of URLs to feed; 0 feeds every entry
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,
    /// Sample entries at random instead of taking the first `max_urls`
    #[serde(default)]
    pub random: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_urls: default_max_urls(),
            random: false,
        }
    }
}

fn default_workers() -> usize {
    5
}

fn default_max_urls() -> usize {
    10
}

/// URL list location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
        }
    }
}

fn default_input_path() -> PathBuf {
    PathBuf::from("url.txt")
}

/// Result database location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("results.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.scraper.base_url, "http://localhost:8000");
        assert_eq!(config.scraper.request_timeout.as_millis(), 5 * 60 * 1000);
        assert!(config.scraper.proxy.is_none());
        assert!(!config.scraper.cookies);
        assert_eq!(config.pipeline.workers, 5);
        assert_eq!(config.pipeline.max_urls, 10);
        assert!(!config.pipeline.random);
        assert_eq!(config.input.path, PathBuf::from("url.txt"));
        assert_eq!(config.storage.path, PathBuf::from("results.db"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[pipeline]
workers = 2
        "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.pipeline.max_urls, 10);
        assert_eq!(config.scraper.base_url, "http://localhost:8000");
    }
}
