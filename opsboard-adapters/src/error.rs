//! Error types for adapters.

use std::time::Duration;

use opsboard_sync::FetchError;
use thiserror::Error;

/// Errors that can occur when reading from a data source.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The source is rate limiting us.
    #[error("Rate limited by source")]
    RateLimited {
        /// Value of the `Retry-After` header, when present.
        retry_after: Option<Duration>,
    },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Local file could not be read.
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// The adapter was configured incompletely.
    #[error("Invalid adapter configuration: {0}")]
    Config(String),
}

#[cfg(feature = "sheets")]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<AdapterError> for FetchError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::RateLimited { retry_after } => FetchError::QuotaExceeded { retry_after },
            AdapterError::Timeout => FetchError::Timeout,
            AdapterError::Parse(msg) => FetchError::Parse(msg),
            AdapterError::Connection(msg) => FetchError::Connection(msg),
            e @ AdapterError::Io { .. } => FetchError::Connection(e.to_string()),
            e @ (AdapterError::Http(_) | AdapterError::Auth(_) | AdapterError::Config(_)) => {
                FetchError::Http(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_maps_to_quota() {
        let err: FetchError = AdapterError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        }
        .into();
        assert_eq!(
            err,
            FetchError::QuotaExceeded {
                retry_after: Some(Duration::from_secs(7))
            }
        );
    }

    #[test]
    fn auth_is_a_generic_failure() {
        let err: FetchError = AdapterError::Auth("bad key".into()).into();
        assert_eq!(
            err,
            FetchError::Http("Authentication failed: bad key".to_string())
        );
    }

    #[test]
    fn io_keeps_path_in_message() {
        let err: FetchError = AdapterError::Io {
            path: "/tmp/board.json".into(),
            message: "not found".into(),
        }
        .into();
        assert!(err.to_string().contains("/tmp/board.json"));
    }
}
