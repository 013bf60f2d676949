//! HTTP client for the scraper service

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{FetchRequest, ScrapeResult};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Scraper returned HTTP {status}")]
    Status {
        status: u16,
        reason: String,
        /// Scraper payload, when the error response still carried one
        payload: Option<Box<ScrapeResult>>,
    },

    #[error("Failed to decode scraper response: {0}")]
    Decode(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Construction errors mean the scraper was never contacted
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, FetchError::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Something that turns a fetch request into a scraper payload
#[async_trait]
pub trait ScrapeTransport: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<ScrapeResult>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5 * 60),
            user_agent: concat!("scrapebench/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Shared scraper client. Cheap to share behind an `Arc`; the inner
/// `reqwest::Client` pools connections across workers.
pub struct ScraperClient {
    client: Client,
    base_url: Url,
}

impl ScraperClient {
    /// Create a new scraper client
    pub fn new(base_url: &str, config: HttpConfig) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::Client(format!("Invalid scraper address {}: {}", base_url, e)))?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/fetch?url=..[&proxy=..][&cookies=true]`
    pub fn request_url(&self, request: &FetchRequest) -> Result<Url> {
        build_request_url(&self.base_url, request)
    }
}

/// Assemble the scraper URL for a request, rejecting targets that could
/// only produce a meaningless fetch.
pub fn build_request_url(base: &Url, request: &FetchRequest) -> Result<Url> {
    let target = request.target.trim();
    if target.is_empty() {
        return Err(FetchError::InvalidRequest("empty target URL".to_string()));
    }

    let parsed = Url::parse(target)
        .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", target, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidRequest(format!(
            "{}: unsupported scheme '{}'",
            target,
            parsed.scheme()
        )));
    }

    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| FetchError::InvalidRequest(format!("scraper address cannot be a base: {}", base)))?;
        segments.pop_if_empty().push("fetch");
    }

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("url", target);
        if let Some(proxy) = request.options.proxy.as_deref() {
            let proxy = proxy.trim();
            if !proxy.is_empty() {
                query.append_pair("proxy", proxy);
            }
        }
        if request.options.cookies {
            query.append_pair("cookies", "true");
        }
    }

    Ok(url)
}

#[async_trait]
impl ScrapeTransport for ScraperClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<ScrapeResult> {
        let url = self.request_url(request)?;
        debug!(target = %request.target, %url, "Requesting scrape");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::RequestFailed(format!("Failed to read body: {}", e))
                }
            })?;

        decode_response(status, &bytes)
    }
}

/// Decode a scraper reply. Non-2xx is an error even when the body decodes;
/// the decoded payload then travels with the error.
pub fn decode_response(status: StatusCode, bytes: &[u8]) -> Result<ScrapeResult> {
    let decoded = serde_json::from_slice::<ScrapeResult>(bytes);

    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            payload: decoded.ok().map(Box::new),
        });
    }

    decoded.map_err(|e| FetchError::Decode(e.to_string()))
}
