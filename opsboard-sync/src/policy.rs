//! Freshness and polling policies, and the per-source engine configuration.
//!
//! One [`SyncConfig`] parametrizes the whole engine for one data source:
//! the support-ticket board and the reply-queue board are presets of the
//! same configuration rather than separate implementations.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use opsboard_types::{Dataset, FingerprintFields, Record};
use tokio::time::Instant;

use crate::backoff::BackoffConfig;
use crate::signals::PollingContext;

/// How long a cached dataset may be served without a new fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    /// TTL under normal conditions (default: 30s).
    pub base: Duration,
    /// TTL while the dataset holds pending items (default: 15s).
    pub pending: Duration,
    /// TTL while the source is failing or rate limited (default: 5 minutes).
    pub degraded: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(30),
            pending: Duration::from_secs(15),
            degraded: Duration::from_secs(300),
        }
    }
}

impl TtlPolicy {
    /// The TTL that applies to the current state. Degradation wins over
    /// pending items so a failing source is not hammered.
    pub fn ttl(&self, has_pending: bool, degraded: bool) -> Duration {
        if degraded {
            self.degraded
        } else if has_pending {
            self.pending
        } else {
            self.base
        }
    }
}

/// Adaptive poll interval selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Interval while the dataset has pending items (default: 15s).
    pub pending: Duration,
    /// Interval while the user was recently active (default: 30s).
    pub active: Duration,
    /// Interval when idle or hidden (default: 2 minutes).
    pub idle: Duration,
    /// How long after the last activity the user still counts as active (default: 2 minutes).
    pub activity_window: Duration,
    /// Upper bound on any computed interval (default: 10 minutes).
    pub max_interval: Duration,
    /// Consecutive failures after which cycles are skipped until the
    /// backoff window elapses (default: 6).
    pub hard_stop_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            pending: Duration::from_secs(15),
            active: Duration::from_secs(30),
            idle: Duration::from_secs(120),
            activity_window: Duration::from_secs(120),
            max_interval: Duration::from_secs(600),
            hard_stop_failures: 6,
        }
    }
}

impl PollPolicy {
    /// Compute the next poll interval.
    ///
    /// While degraded the backoff delay is added on top of the base choice,
    /// so a rate-limited cycle always schedules further out than a healthy one.
    pub fn interval(
        &self,
        ctx: &PollingContext,
        has_pending: bool,
        backoff_delay: Duration,
        now: Instant,
    ) -> Duration {
        let base = if !ctx.is_visible {
            self.idle
        } else if has_pending {
            self.pending
        } else if ctx.recently_active(now, self.activity_window) {
            self.active
        } else {
            self.idle
        };

        let interval = if ctx.is_degraded {
            base.saturating_add(backoff_delay)
        } else {
            base
        };
        interval.min(self.max_interval)
    }
}

/// Predicate deciding whether a record is in an active / pending state
/// that deserves tighter polling.
#[derive(Clone, Default)]
pub enum PendingRule {
    /// No record is ever pending.
    #[default]
    Never,
    /// Pending when `field` equals one of `values` (case-insensitive).
    StatusIn {
        field: String,
        values: Vec<String>,
    },
    /// Arbitrary predicate.
    Custom(Arc<dyn Fn(&Record) -> bool + Send + Sync>),
}

impl PendingRule {
    /// Pending when `field` holds one of `values`.
    pub fn status_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PendingRule::StatusIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Pending according to a custom predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        PendingRule::Custom(Arc::new(predicate))
    }

    /// Does this record count as pending?
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            PendingRule::Never => false,
            PendingRule::StatusIn { field, values } => {
                let value = record.get(field).trim();
                values.iter().any(|v| v.eq_ignore_ascii_case(value))
            }
            PendingRule::Custom(predicate) => predicate(record),
        }
    }

    /// Does any record in the dataset count as pending?
    pub fn any_pending(&self, dataset: &Dataset) -> bool {
        dataset.iter().any(|r| self.matches(r))
    }
}

impl fmt::Debug for PendingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingRule::Never => f.write_str("Never"),
            PendingRule::StatusIn { field, values } => f
                .debug_struct("StatusIn")
                .field("field", field)
                .field("values", values)
                .finish(),
            PendingRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Engine configuration for one data source.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Stable key naming the source; used for the fallback store.
    pub key: String,
    /// Cache freshness policy.
    pub ttl: TtlPolicy,
    /// Poll interval policy.
    pub poll: PollPolicy,
    /// Backoff configuration.
    pub backoff: BackoffConfig,
    /// Columns the change fingerprint projects onto.
    pub fingerprint: FingerprintFields,
    /// Which records count as pending.
    pub pending: PendingRule,
    /// Upper bound on a single fetch (default: 8s).
    pub fetch_timeout: Duration,
}

impl SyncConfig {
    /// A configuration with defaults for everything but the key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: TtlPolicy::default(),
            poll: PollPolicy::default(),
            backoff: BackoffConfig::default(),
            fingerprint: FingerprintFields::default(),
            pending: PendingRule::Never,
            fetch_timeout: Duration::from_secs(8),
        }
    }

    /// Preset for the support-ticket board.
    pub fn support_tickets() -> Self {
        Self {
            pending: PendingRule::status_in("status", ["pending", "in_progress", "escalated"]),
            ..Self::new("support-tickets")
        }
    }

    /// Preset for the reply-queue board.
    ///
    /// Replies go stale faster than tickets, so pending items poll tighter.
    pub fn reply_queue() -> Self {
        Self {
            ttl: TtlPolicy {
                pending: Duration::from_secs(10),
                ..TtlPolicy::default()
            },
            poll: PollPolicy {
                pending: Duration::from_secs(10),
                ..PollPolicy::default()
            },
            pending: PendingRule::status_in("status", ["pending_review", "awaiting_reply", "draft"]),
            ..Self::new("reply-queue")
        }
    }

    /// Columns every fetched header must contain.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self.fingerprint.columns().to_vec();
        columns.dedup();
        columns
    }
}
