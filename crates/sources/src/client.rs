//! Blocking HTTP client shared by every fetcher.
//!
//! No Tokio runtime, no retries. Each request has a bounded timeout; transport
//! failures, non-2xx statuses and timeouts are all network errors.

use std::time::Duration;

pub const USER_AGENT: &str = concat!("communecheck/", env!("CARGO_PKG_VERSION"));

/// Longest response body excerpt kept in error messages.
const ERROR_BODY_EXCERPT: usize = 200;

/// Error type for fetch operations.
#[derive(Debug)]
pub enum FetchError {
    /// Transport error (DNS, connect, TLS, reset)
    Network(String),
    /// Non-success HTTP status with a body excerpt
    Http(u16, String),
    /// Request exceeded the configured timeout
    Timeout(String),
    /// Response body is not in the expected shape
    Parse(String),
}

impl FetchError {
    /// True for errors where the upstream could not be reached or refused.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http(..) | Self::Timeout(_))
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            FetchError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            FetchError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// HTTP client bound to one upstream, used for error messages.
pub struct FetchClient {
    pub(crate) http: reqwest::blocking::Client,
    source_name: String,
}

impl FetchClient {
    pub fn new(source_name: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Send one request and return the body text.
    ///
    /// `build_request` receives the underlying client and returns a fully
    /// configured `RequestBuilder`. A leading UTF-8 BOM is stripped.
    pub fn send_text(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, FetchError> {
        let response = build_request(&self.http)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Http(
                status.as_u16(),
                format!("{} returned {}: {}", self.source_name, status, excerpt(&body)),
            ));
        }

        let text = response.text().map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                FetchError::Parse(format!(
                    "failed to read {} response body: {}",
                    self.source_name, e,
                ))
            }
        })?;

        Ok(text.trim_start_matches('\u{feff}').to_string())
    }

    /// Like `send_text`, but parses the body as JSON.
    pub fn send_json(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, FetchError> {
        let text = self.send_text(build_request)?;
        serde_json::from_str(&text).map_err(|e| {
            FetchError::Parse(format!(
                "failed to parse {} JSON response: {} (body: {})",
                self.source_name,
                e,
                excerpt(&text),
            ))
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(format!("{} did not respond in time: {}", self.source_name, e))
        } else {
            FetchError::Network(format!("{} request failed: {}", self.source_name, e))
        }
    }
}

fn excerpt(body: &str) -> &str {
    let trimmed = body.trim();
    let mut end = trimmed.len().min(ERROR_BODY_EXCERPT);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}
