//! Decoding of `{ "values": [[...]] }` payloads.

use std::time::Duration;

use opsboard_types::{Dataset, ValueRange};
use serde::Deserialize;

use crate::AdapterError;

/// Error envelope returned by the values API instead of a range.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Decode a response body into a [`Dataset`].
///
/// A body carrying an `error` object is classified like an error status, so
/// a quota error delivered with a success status still backs off. A body
/// without `values` decodes to an empty dataset.
pub fn decode_body(body: &str) -> Result<Dataset, AdapterError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

    if value.get("error").is_some() {
        let envelope: ErrorEnvelope =
            serde_json::from_value(value).map_err(|e| AdapterError::Parse(e.to_string()))?;
        let api = envelope.error;
        return Err(classify_status(api.code, &format!("{} {}", api.status, api.message), None));
    }

    let range: ValueRange =
        serde_json::from_value(value).map_err(|e| AdapterError::Parse(e.to_string()))?;
    Ok(range.into_dataset())
}

/// Map a non-success status and its body to an [`AdapterError`].
///
/// 429, or a 403 whose body names a rate limit or exhausted quota, is a
/// rate limit; other 401/403 responses are authentication failures.
pub fn classify_status(status: u16, body: &str, retry_after: Option<Duration>) -> AdapterError {
    let lowered = body.to_ascii_lowercase();
    let mentions_quota = ["ratelimitexceeded", "resource_exhausted", "quota", "rate limit"]
        .iter()
        .any(|needle| lowered.contains(needle));

    match status {
        429 => AdapterError::RateLimited { retry_after },
        403 if mentions_quota => AdapterError::RateLimited { retry_after },
        401 | 403 => AdapterError::Auth(format!("API returned status {}", status)),
        _ if mentions_quota => AdapterError::RateLimited { retry_after },
        _ => AdapterError::Http(format!("API returned status {}", status)),
    }
}

/// Parse a `Retry-After` header given in seconds. HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_values_matrix() {
        let body = r#"{
            "range": "Tickets!A1:C3",
            "majorDimension": "ROWS",
            "values": [
                ["id", "status", "updated_at"],
                ["T-1", "open", "2024-05-01"],
                ["T-2"]
            ]
        }"#;
        let dataset = decode_body(body).unwrap();
        assert_eq!(dataset.header, vec!["id", "status", "updated_at"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[1].get("status"), "");
    }

    #[test]
    fn missing_values_is_empty() {
        let dataset = decode_body(r#"{"range": "Tickets!A1:C1"}"#).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.header.is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(decode_body("<html>"), Err(AdapterError::Parse(_))));
    }

    #[test]
    fn quota_error_payload_is_rate_limit() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded for quota metric 'Read requests'", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            decode_body(body),
            Err(AdapterError::RateLimited { retry_after: None })
        ));
    }

    #[test]
    fn status_classification() {
        let hint = Some(Duration::from_secs(30));
        assert!(matches!(
            classify_status(429, "", hint),
            AdapterError::RateLimited { retry_after: Some(d) } if d.as_secs() == 30
        ));
        assert!(matches!(
            classify_status(403, "rateLimitExceeded", None),
            AdapterError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(403, "The caller does not have permission", None),
            AdapterError::Auth(_)
        ));
        assert!(matches!(classify_status(500, "", None), AdapterError::Http(_)));
    }

    #[test]
    fn retry_after_seconds_only() {
        assert_eq!(parse_retry_after(" 12 "), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
