use super::models::Config;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Invalid scraper address '{address}': {reason}")]
    InvalidScraperAddress { address: String, reason: String },

    #[error("Invalid proxy address '{address}': {reason}")]
    InvalidProxyAddress { address: String, reason: String },

    #[error("Timeout must be positive: {field}")]
    ZeroTimeout { field: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_pipeline(config)?;
    validate_scraper(config)?;
    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<(), ValidationError> {
    if config.pipeline.workers == 0 {
        return Err(ValidationError::NoWorkers);
    }
    Ok(())
}

/// Scraper address must be an absolute http(s) URL; proxy, when given, must parse
fn validate_scraper(config: &Config) -> Result<(), ValidationError> {
    let scraper = &config.scraper;

    let base = Url::parse(&scraper.base_url).map_err(|e| ValidationError::InvalidScraperAddress {
        address: scraper.base_url.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
        return Err(ValidationError::InvalidScraperAddress {
            address: scraper.base_url.clone(),
            reason: format!("unsupported scheme '{}'", base.scheme()),
        });
    }

    if let Some(proxy) = scraper.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        Url::parse(proxy.trim()).map_err(|e| ValidationError::InvalidProxyAddress {
            address: proxy.to_string(),
            reason: e.to_string(),
        })?;
    }

    if scraper.request_timeout.as_millis() == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout".to_string(),
        });
    }
    if scraper.connect_timeout.as_millis() == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_workers() {
        let mut config = Config::default();
        config.pipeline.workers = 0;

        assert!(matches!(validate(&config), Err(ValidationError::NoWorkers)));
    }

    #[test]
    fn test_invalid_scraper_address() {
        let mut config = Config::default();
        config.scraper.base_url = "localhost".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidScraperAddress { .. })
        ));

        config.scraper.base_url = "mailto:ops@example.test".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidScraperAddress { .. })
        ));
    }

    #[test]
    fn test_invalid_proxy_address() {
        let mut config = Config::default();
        config.scraper.proxy = Some("not a proxy".to_string());

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidProxyAddress { .. })
        ));
    }

    #[test]
    fn test_blank_proxy_is_ignored() {
        let mut config = Config::default();
        config.scraper.proxy = Some(String::new());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.scraper.request_timeout = HumanDuration(0);

        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroTimeout { .. })
        ));
    }
}
