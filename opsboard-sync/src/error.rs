//! Error types for the synchronization engine.

use std::time::Duration;

use thiserror::Error;

/// Errors a [`Fetcher`](crate::Fetcher) can report for one fetch attempt.
///
/// These never escape [`DataCache::get_data`](crate::DataCache::get_data);
/// they drive backoff and the [`SyncStatus`](opsboard_types::SyncStatus) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source rejected the request because the quota is exhausted.
    #[error("Quota exceeded{}", retry_hint(.retry_after))]
    QuotaExceeded {
        /// Server-provided hint for when to try again.
        retry_after: Option<Duration>,
    },

    /// Non-success response other than a rate limit.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The decoded header lacks columns the engine depends on.
    #[error("Schema mismatch: missing columns {}", .0.join(", "))]
    Schema(Vec<String>),

    /// The fetch task panicked or was torn down before reporting.
    #[error("Fetch task failed: {0}")]
    Aborted(String),

    /// The fetch was aborted because its scheduler stopped.
    #[error("Fetch cancelled")]
    Cancelled,
}

/// How a failure feeds the backoff controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport or server failure; counted, multiplier unchanged.
    Generic,
    /// Rate limited; multiplier doubles.
    QuotaExceeded,
    /// Malformed payload; last-known-good is kept and backoff is untouched.
    Malformed,
    /// Aborted by shutdown; not a failure of the source.
    Cancelled,
}

impl FetchError {
    /// Classify this error for backoff purposes.
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::QuotaExceeded { .. } => FailureKind::QuotaExceeded,
            FetchError::Http(_)
            | FetchError::Connection(_)
            | FetchError::Timeout
            | FetchError::Aborted(_) => FailureKind::Generic,
            FetchError::Parse(_) | FetchError::Schema(_) => FailureKind::Malformed,
            FetchError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// The retry hint carried by a quota error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::QuotaExceeded { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Failures the engine escalates to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Nothing has ever been obtained: no cache, no backup, and the fetch failed.
    #[error("No data available: {}", describe(.last_error))]
    NoData {
        /// The failure of the most recent fetch, if one was attempted.
        last_error: Option<FetchError>,
    },
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

fn describe(error: &Option<FetchError>) -> String {
    match error {
        Some(e) => e.to_string(),
        None => "nothing fetched yet".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            FetchError::QuotaExceeded { retry_after: None }.kind(),
            FailureKind::QuotaExceeded
        );
        assert_eq!(FetchError::Timeout.kind(), FailureKind::Generic);
        assert_eq!(FetchError::Http("500".into()).kind(), FailureKind::Generic);
        assert_eq!(FetchError::Parse("eof".into()).kind(), FailureKind::Malformed);
        assert_eq!(
            FetchError::Schema(vec!["id".into()]).kind(),
            FailureKind::Malformed
        );
        assert_eq!(FetchError::Aborted("panic".into()).kind(), FailureKind::Generic);
        assert_eq!(FetchError::Cancelled.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn display_includes_retry_hint() {
        let err = FetchError::QuotaExceeded {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.to_string(), "Quota exceeded (retry after 30s)");
        assert_eq!(
            FetchError::QuotaExceeded { retry_after: None }.to_string(),
            "Quota exceeded"
        );
    }

    #[test]
    fn no_data_describes_cause() {
        let err = SyncError::NoData {
            last_error: Some(FetchError::Timeout),
        };
        assert_eq!(err.to_string(), "No data available: Request timed out");
    }

    #[test]
    fn schema_lists_columns() {
        let err = FetchError::Schema(vec!["id".into(), "status".into()]);
        assert_eq!(err.to_string(), "Schema mismatch: missing columns id, status");
    }
}
