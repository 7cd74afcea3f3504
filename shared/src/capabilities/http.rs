use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;

/// Declared on every POST. A "simple" content type keeps browsers from sending
/// a CORS preflight, which the spreadsheet endpoint cannot answer; the body is
/// still JSON.
pub const PREFLIGHT_FREE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

pub const DEFAULT_API_URL: &str = "https://script.google.com/macros/s/DEPLOYMENT_ID/exec";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EndpointError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Base URL of the inventory web app. Every request is addressed to this URL
/// with an `action` discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    base: Url,
}

impl ApiEndpoint {
    pub fn new(url: &str) -> Result<Self, EndpointError> {
        let invalid = |reason: &str| EndpointError::InvalidUrl {
            url: truncate_url(url),
            reason: reason.to_string(),
        };

        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(invalid("URL cannot be empty"));
        }
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(invalid("URL exceeds maximum length"));
        }

        let base = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;

        let scheme = base.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(invalid("only 'http' and 'https' are allowed"));
        }
        if base.host_str().is_none() {
            return Err(invalid("URL must have a host"));
        }
        if !base.username().is_empty() || base.password().is_some() {
            return Err(invalid("credentials in URL are not allowed"));
        }

        Ok(Self { base })
    }

    /// Endpoint used until the shell supplies a configuration.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(DEFAULT_API_URL).expect("default API url is valid")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    /// GET URL for a read action. Existing query parameters on the base URL
    /// are preserved.
    #[must_use]
    pub fn query_url(&self, action: &str, params: &[(&str, &str)]) -> String {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url.into()
    }

    /// POST URL. Mutating actions carry their discriminator in the body.
    #[must_use]
    pub fn post_url(&self) -> String {
        self.base.to_string()
    }
}

fn truncate_url(url: &str) -> String {
    if url.len() <= 100 {
        url.to_string()
    } else {
        let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &url[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_endpoint() {
        let endpoint = ApiEndpoint::new("https://script.google.com/macros/s/abc/exec").unwrap();
        assert_eq!(endpoint.post_url(), "https://script.google.com/macros/s/abc/exec");
    }

    #[test]
    fn rejects_bad_urls() {
        for url in [
            "",
            "   ",
            "not a url",
            "ftp://example.com/exec",
            "https://user:pw@example.com/exec",
        ] {
            assert!(ApiEndpoint::new(url).is_err(), "{url:?}");
        }
    }

    #[test]
    fn query_url_encodes_parameters() {
        let endpoint = ApiEndpoint::new("https://example.com/exec").unwrap();
        assert_eq!(
            endpoint.query_url("areaItems", &[("area", "Sound & Lights")]),
            "https://example.com/exec?action=areaItems&area=Sound+%26+Lights"
        );
    }

    #[test]
    fn query_url_keeps_existing_query() {
        let endpoint = ApiEndpoint::new("https://example.com/exec?v=2").unwrap();
        assert_eq!(
            endpoint.query_url("areas", &[]),
            "https://example.com/exec?v=2&action=areas"
        );
    }

    #[test]
    fn fallback_endpoint_is_valid() {
        assert_eq!(ApiEndpoint::fallback().as_str(), DEFAULT_API_URL);
    }

    #[test]
    fn long_urls_are_truncated_in_errors() {
        let url = format!("ftp://{}", "a".repeat(300));
        let Err(EndpointError::InvalidUrl { url: shown, .. }) = ApiEndpoint::new(&url) else {
            panic!("expected invalid url");
        };
        assert!(shown.len() <= 103);
    }
}
