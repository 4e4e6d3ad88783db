//! Exponential backoff for rate-limited and failing sources.
//!
//! The controller is a plain state machine: callers pass the current
//! [`Instant`] in, so the growth and reset rules are testable without timers.
//!
//! ```text
//! delay = min(base_delay * multiplier, max_delay)
//! multiplier: 1 -> 2 -> 4 -> ... -> max_multiplier   (quota failures only)
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::error::FailureKind;

/// Configuration for exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay at multiplier 1 (default: 10s).
    pub base_delay: Duration,
    /// Ceiling for the multiplier (default: 32).
    pub max_multiplier: u32,
    /// Absolute cap on the computed delay (default: 5 minutes).
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            max_multiplier: 32,
            max_delay: Duration::from_secs(300),
        }
    }
}

/// Failure streak bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackoffState {
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// When the most recent failure was recorded.
    pub last_failure_at: Option<Instant>,
}

/// Tracks consecutive failures and computes the retry delay.
#[derive(Debug, Clone)]
pub struct BackoffController {
    config: BackoffConfig,
    state: BackoffState,
    multiplier: u32,
    retry_after: Option<Duration>,
}

impl BackoffController {
    /// Create a controller at baseline.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            state: BackoffState::default(),
            multiplier: 1,
            retry_after: None,
        }
    }

    /// Reset to baseline after a successful fetch.
    pub fn on_success(&mut self) {
        self.state = BackoffState::default();
        self.multiplier = 1;
        self.retry_after = None;
    }

    /// Record a failed fetch.
    ///
    /// Quota failures double the multiplier up to the ceiling; generic
    /// failures only extend the streak. Malformed and cancelled fetches say
    /// nothing about the source's capacity and are ignored.
    pub fn on_failure(&mut self, kind: FailureKind, now: Instant) {
        match kind {
            FailureKind::QuotaExceeded => {
                self.multiplier = self
                    .multiplier
                    .saturating_mul(2)
                    .min(self.config.max_multiplier.max(1));
            }
            FailureKind::Generic => {}
            FailureKind::Malformed | FailureKind::Cancelled => return,
        }
        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        self.state.last_failure_at = Some(now);
    }

    /// Raise the delay for the current streak to at least `hint`.
    ///
    /// Hints only ever grow within a streak and are cleared on success.
    pub fn apply_retry_after(&mut self, hint: Option<Duration>) {
        if let Some(hint) = hint {
            self.retry_after = Some(self.retry_after.map_or(hint, |d| d.max(hint)));
        }
    }

    /// The delay to wait after the latest failure.
    pub fn current_delay(&self) -> Duration {
        let computed = self
            .config
            .base_delay
            .saturating_mul(self.multiplier)
            .min(self.config.max_delay);
        match self.retry_after {
            Some(hint) => computed.max(hint.min(self.config.max_delay)),
            None => computed,
        }
    }

    /// Returns true while a failure streak is open.
    pub fn is_active(&self) -> bool {
        self.state.consecutive_failures > 0
    }

    /// Returns true if a retry at `now` would fall inside the backoff window.
    pub fn is_waiting(&self, now: Instant) -> bool {
        self.remaining(now).is_some()
    }

    /// Time left in the backoff window, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if !self.is_active() {
            return None;
        }
        let last = self.state.last_failure_at?;
        let elapsed = now.saturating_duration_since(last);
        self.current_delay().checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    /// Current multiplier (1 at baseline).
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Snapshot of the failure streak.
    pub fn state(&self) -> BackoffState {
        self.state
    }

    /// The configuration in use.
    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

impl Default for BackoffController {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_failures_double_until_cap() {
        let mut backoff = BackoffController::default();
        let now = Instant::now();
        assert_eq!(backoff.current_delay(), Duration::from_secs(10));

        let mut delays = Vec::new();
        for _ in 0..8 {
            backoff.on_failure(FailureKind::QuotaExceeded, now);
            delays.push(backoff.current_delay().as_secs());
        }

        // 10s * 2^k, capped at 300s
        assert_eq!(delays, vec![20, 40, 80, 160, 300, 300, 300, 300]);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(backoff.multiplier(), 32);
        assert_eq!(backoff.state().consecutive_failures, 8);
    }

    #[test]
    fn multiplier_ceiling_applies_below_absolute_cap() {
        let mut backoff = BackoffController::new(BackoffConfig {
            base_delay: Duration::from_secs(1),
            max_multiplier: 4,
            max_delay: Duration::from_secs(300),
        });
        let now = Instant::now();
        for _ in 0..6 {
            backoff.on_failure(FailureKind::QuotaExceeded, now);
        }
        assert_eq!(backoff.current_delay(), Duration::from_secs(4));
    }

    #[test]
    fn success_resets_to_baseline() {
        let mut backoff = BackoffController::default();
        let now = Instant::now();
        backoff.on_failure(FailureKind::QuotaExceeded, now);
        backoff.on_failure(FailureKind::QuotaExceeded, now);
        assert!(backoff.is_active());

        backoff.on_success();
        assert!(!backoff.is_active());
        assert_eq!(backoff.multiplier(), 1);
        assert_eq!(backoff.current_delay(), Duration::from_secs(10));
        assert_eq!(backoff.state(), BackoffState::default());
    }

    #[test]
    fn generic_failures_extend_streak_without_growth() {
        let mut backoff = BackoffController::default();
        let now = Instant::now();
        backoff.on_failure(FailureKind::Generic, now);
        backoff.on_failure(FailureKind::Generic, now);

        assert_eq!(backoff.state().consecutive_failures, 2);
        assert_eq!(backoff.current_delay(), Duration::from_secs(10));
        assert_eq!(backoff.state().last_failure_at, Some(now));
    }

    #[test]
    fn malformed_and_cancelled_are_ignored() {
        let mut backoff = BackoffController::default();
        let now = Instant::now();
        backoff.on_failure(FailureKind::Malformed, now);
        backoff.on_failure(FailureKind::Cancelled, now);
        assert!(!backoff.is_active());
    }

    #[test]
    fn waiting_window_elapses() {
        let mut backoff = BackoffController::default();
        let start = Instant::now();
        backoff.on_failure(FailureKind::QuotaExceeded, start);

        assert!(backoff.is_waiting(start));
        assert_eq!(backoff.remaining(start), Some(Duration::from_secs(20)));
        assert!(backoff.is_waiting(start + Duration::from_secs(19)));
        assert!(!backoff.is_waiting(start + Duration::from_secs(20)));
    }

    #[test]
    fn retry_after_raises_delay_within_cap() {
        let mut backoff = BackoffController::default();
        let now = Instant::now();
        backoff.on_failure(FailureKind::QuotaExceeded, now);
        backoff.apply_retry_after(Some(Duration::from_secs(90)));
        assert_eq!(backoff.current_delay(), Duration::from_secs(90));

        backoff.apply_retry_after(Some(Duration::from_secs(3600)));
        assert_eq!(backoff.current_delay(), Duration::from_secs(300));

        backoff.on_success();
        assert_eq!(backoff.current_delay(), Duration::from_secs(10));
    }
}
