//! Client configuration from environment variables.

use std::time::Duration;

use reqwest::Url;

use crate::error::ClientError;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP origin of the board server, without trailing slash.
    pub base_url: String,
    /// Session token presented as bearer header and websocket `?token=`.
    pub token: String,
    /// Bound on every HTTP request; expiry is treated as a failure.
    pub request_timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.into(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    /// Read `BOARD_BASE_URL`, `BOARD_TOKEN`, and `REQUEST_TIMEOUT_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same keys as [`ClientConfig::from_env`], read through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("BOARD_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let token = lookup("BOARD_TOKEN").unwrap_or_default();
        let timeout_ms = lookup("REQUEST_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        Self { request_timeout: Duration::from_millis(timeout_ms), ..Self::new(base_url, token) }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Websocket endpoint derived from the HTTP origin, token query-encoded.
    ///
    /// # Errors
    ///
    /// [`ClientError::Connection`] if the base URL does not parse.
    pub fn ws_url(&self) -> Result<String, ClientError> {
        let origin = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        let mut url = Url::parse(&format!("{origin}/ws"))
            .map_err(|e| ClientError::Connection(format!("bad base url {}: {e}", self.base_url)))?;
        url.query_pairs_mut().append_pair("token", &self.token);
        Ok(url.into())
    }
}
