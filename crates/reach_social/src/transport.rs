//! Outbound HTTP, behind a trait so tests can script the upstream.

use async_trait::async_trait;
use reach_error::{PlatformError, PlatformErrorKind};
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// One outbound GET.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct UpstreamRequest {
    /// Base URL without query string
    url: String,
    /// Query parameters, appended in order
    #[getter(skip)]
    query: Vec<(String, String)>,
    /// Extra request headers
    headers: Vec<(String, String)>,
}

impl UpstreamRequest {
    /// GET `url` with no parameters.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Query parameters in the order they were added.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    /// Set a header, replacing any earlier value with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Value of a header, if set.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// URL with the query string encoded.
    ///
    /// # Errors
    ///
    /// Returns a `Parse` error if the base URL is not a valid absolute URL.
    pub fn full_url(&self) -> Result<reqwest::Url, PlatformError> {
        reqwest::Url::parse_with_params(&self.url, &self.query).map_err(|e| {
            PlatformError::new(PlatformErrorKind::Parse(format!("{}: {}", self.url, e)))
        })
    }
}

/// What came back from one outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// HTTP status
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded body
    pub body: String,
}

impl UpstreamResponse {
    /// Response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the outside world.
///
/// Implementations report connection-level failures as `Err`; any HTTP
/// status, including 4xx and 5xx, is an `Ok` response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET.
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, PlatformError>;
}

/// Production transport on a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns a `Network` error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| PlatformError::new(PlatformErrorKind::Network(e.to_string())))?;
        Ok(Self { client, timeout })
    }

    /// Wrap an existing client whose timeout is already `timeout`.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn classify(&self, e: reqwest::Error) -> PlatformError {
        if e.is_timeout() {
            PlatformError::new(PlatformErrorKind::Timeout(self.timeout.as_millis() as u64))
        } else {
            PlatformError::new(PlatformErrorKind::Network(e.to_string()))
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(url = %request.url()))]
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, PlatformError> {
        let url = request.full_url()?;
        let mut builder = self.client.get(url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        debug!(status, body_len = body.len(), "Upstream responded");
        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_encodes_query() {
        let request = UpstreamRequest::get("https://www.googleapis.com/youtube/v3/channels")
            .query("forHandle", "@creator one")
            .query("part", "id");
        let url = request.full_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/youtube/v3/channels?forHandle=%40creator+one&part=id"
        );
        assert_eq!(request.query_params()[1], ("part".to_string(), "id".to_string()));
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let request = UpstreamRequest::get("https://example.com")
            .header("User-Agent", "a")
            .header("user-agent", "b");
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header_value("USER-AGENT"), Some("b"));
    }

    #[test]
    fn relative_url_is_a_parse_error() {
        let err = UpstreamRequest::get("/api/user").full_url().unwrap_err();
        assert!(err.kind.is_malformed());
    }
}
