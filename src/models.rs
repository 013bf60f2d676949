//! Request/result types flowing through the pipeline

use serde::Deserialize;

/// Per-run fetch flags forwarded to the scraper
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub proxy: Option<String>,
    pub cookies: bool,
}

/// One URL to fetch through the scraper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub target: String,
    pub options: FetchOptions,
}

impl FetchRequest {
    pub fn new(target: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            target: target.into(),
            options,
        }
    }
}

/// Outcome of a single request, one per dispatched URL
///
/// `error` is empty on success. Field names follow the scraper's JSON payload;
/// every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapeResult {
    pub requested_url: String,
    pub resolved_url: String,
    pub body: String,
    pub status_code: Option<i64>,
    pub status_text: String,
    #[serde(deserialize_with = "cookies_as_text")]
    pub cookies: Option<String>,
    pub error: String,
    #[serde(skip)]
    pub duration_ms: i64,
}

impl ScrapeResult {
    /// Failure result for a URL that produced no usable scraper payload
    pub fn failure(requested_url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            requested_url: requested_url.into(),
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// The scraper sends cookies either as a string or as a JSON array of cookie objects.
fn cookies_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_partial_payload() {
        let json = r#"{"status_code":200,"status_text":"OK","requested_url":"https://a.test/"}"#;
        let result: ScrapeResult = serde_json::from_str(json).unwrap();

        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.status_text, "OK");
        assert_eq!(result.requested_url, "https://a.test/");
        assert!(result.body.is_empty());
        assert!(result.cookies.is_none());
        assert!(result.is_success());
    }

    #[test]
    fn test_decode_cookie_array_as_json_text() {
        let json = r#"{"cookies":[{"name":"sid","value":"abc"}],"error":""}"#;
        let result: ScrapeResult = serde_json::from_str(json).unwrap();

        assert_eq!(
            result.cookies.as_deref(),
            Some(r#"[{"name":"sid","value":"abc"}]"#)
        );
    }

    #[test]
    fn test_decode_cookie_string_verbatim() {
        let json = r#"{"cookies":"sid=abc"}"#;
        let result: ScrapeResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.cookies.as_deref(), Some("sid=abc"));
    }

    #[test]
    fn test_failure_constructor() {
        let result = ScrapeResult::failure("https://a.test/", "boom");
        assert!(!result.is_success());
        assert_eq!(result.status_code, None);
        assert_eq!(result.duration_ms, 0);
    }
}
