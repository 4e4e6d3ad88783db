//! Persisted last-known-good dataset.

use crate::{Dataset, SchemaVersion};

/// The backup blob written after every successful fetch.
///
/// One record exists per data source key; it is overwritten on success and
/// read back only when both the memory cache and the network are unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackupRecord {
    /// Layout version of this record.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: SchemaVersion,

    /// The dataset as it was last fetched.
    pub data: Dataset,

    /// Unix timestamp in milliseconds of the fetch that produced `data`.
    #[cfg_attr(feature = "serde", serde(rename = "timestamp"))]
    pub timestamp_ms: u64,
}

impl BackupRecord {
    /// Wrap a dataset stamped with the current wall-clock time.
    pub fn new(data: Dataset) -> Self {
        Self::with_timestamp(data, current_timestamp_ms())
    }

    /// Wrap a dataset with an explicit timestamp.
    pub fn with_timestamp(data: Dataset, timestamp_ms: u64) -> Self {
        Self {
            version: SchemaVersion::current(),
            data,
            timestamp_ms,
        }
    }

    /// Age of the backup relative to `now_ms`, saturating at zero for
    /// timestamps from the future (clock skew between writers).
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }
}

/// Current timestamp in milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
