//! Client error type.
//!
//! ERROR HANDLING
//! ==============
//! Board request failures are never surfaced to the user directly; the
//! board mirror re-fetches instead. Chat deletion failures are surfaced.
//! Realtime sends on a closed connection are dropped, not raised.

use frames::{CodecError, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("server responded {0}")]
    Status(u16),
    #[error("connection error: {0}")]
    Connection(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(err)
        }
    }
}

impl ErrorCode for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Http(_) => "E_HTTP",
            Self::Timeout => "E_TIMEOUT",
            Self::Status(404) => "E_NOT_FOUND",
            Self::Status(409) => "E_CONFLICT",
            Self::Status(403) => "E_PERMISSION",
            Self::Status(_) => "E_STATUS",
            Self::Connection(_) => "E_CONNECTION",
            Self::Codec(e) => e.error_code(),
        }
    }
}

impl ClientError {
    /// The server refused because the actor lacks permission.
    #[must_use]
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Status(403))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_error_codes() {
        assert_eq!(ClientError::Status(403).error_code(), "E_PERMISSION");
        assert_eq!(ClientError::Status(409).error_code(), "E_CONFLICT");
        assert_eq!(ClientError::Status(500).error_code(), "E_STATUS");
        assert_eq!(ClientError::Timeout.error_code(), "E_TIMEOUT");
        assert!(ClientError::Status(403).is_permission());
        assert!(!ClientError::Status(404).is_permission());
    }
}
