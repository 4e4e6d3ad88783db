//! Sync-health signal exposed to the dashboard.

use std::fmt;

/// Health of the synchronization loop for one data source.
///
/// The engine never surfaces recoverable failures as errors; this status is
/// how severity reaches the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SyncStatus {
    /// The last fetch succeeded and the data is within its freshness target.
    Synced,
    /// A fetch is in flight.
    #[default]
    Syncing,
    /// Serving stale data: the last fetch failed or is being held back by backoff.
    Delayed,
    /// The last fetch failed and there is no usable data to fall back to.
    Error,
    /// Polling is suspended (view hidden, or backoff hard stop).
    Paused,
}

impl SyncStatus {
    /// Short label for status badges.
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Delayed => "delayed",
            SyncStatus::Error => "error",
            SyncStatus::Paused => "paused",
        }
    }

    /// Returns true when the displayed data can be trusted as current.
    pub fn is_healthy(&self) -> bool {
        matches!(self, SyncStatus::Synced | SyncStatus::Syncing)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_states_are_not_healthy() {
        assert!(SyncStatus::Synced.is_healthy());
        assert!(SyncStatus::Syncing.is_healthy());
        assert!(!SyncStatus::Delayed.is_healthy());
        assert!(!SyncStatus::Error.is_healthy());
        assert!(!SyncStatus::Paused.is_healthy());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::Delayed).unwrap(),
            "\"delayed\""
        );
    }
}
