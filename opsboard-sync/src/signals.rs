//! Visibility and user-activity signals pushed in by the host.
//!
//! The host (a terminal UI, a test) owns a [`SignalSource`] and reports
//! focus changes and input events; schedulers subscribe to it and adapt
//! their cadence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Snapshot of the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    /// Whether the dashboard is currently visible to the user.
    pub visible: bool,
    /// Last recorded (debounced) user activity.
    pub last_activity_at: Instant,
}

/// Kinds of user activity the host can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Key,
    Click,
    Scroll,
    PointerMove,
}

/// Inputs to the poll interval computation, captured at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingContext {
    pub is_visible: bool,
    pub last_activity_at: Instant,
    pub is_degraded: bool,
}

impl PollingContext {
    /// Build a context from a signal snapshot and the degradation flag.
    pub fn new(signals: Signals, is_degraded: bool) -> Self {
        Self {
            is_visible: signals.visible,
            last_activity_at: signals.last_activity_at,
            is_degraded,
        }
    }

    /// Was there user activity within `window` of `now`?
    pub fn recently_active(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_activity_at) < window
    }
}

/// Publisher of host signals.
///
/// Cloning is cheap; all clones publish to the same subscribers. Activity
/// reports closer together than the debounce window are coalesced so a
/// burst of pointer moves wakes schedulers at most once per window.
#[derive(Debug, Clone)]
pub struct SignalSource {
    tx: Arc<watch::Sender<Signals>>,
    debounce: Duration,
}

impl SignalSource {
    /// Default activity debounce window.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

    /// Start visible, with activity recorded now.
    pub fn new() -> Self {
        Self::with_debounce(Self::DEFAULT_DEBOUNCE)
    }

    /// Start visible with a custom debounce window.
    pub fn with_debounce(debounce: Duration) -> Self {
        let (tx, _) = watch::channel(Signals {
            visible: true,
            last_activity_at: Instant::now(),
        });
        Self {
            tx: Arc::new(tx),
            debounce,
        }
    }

    /// Current snapshot.
    pub fn current(&self) -> Signals {
        *self.tx.borrow()
    }

    /// Report a visibility change. Repeated reports of the same state are ignored.
    pub fn set_visible(&self, visible: bool) {
        self.tx.send_if_modified(|s| {
            if s.visible == visible {
                return false;
            }
            s.visible = visible;
            tracing::debug!(visible, "Visibility changed");
            true
        });
    }

    /// Report user activity.
    ///
    /// Returns true if the report was published, false if it fell inside
    /// the debounce window of the previous one.
    pub fn record_activity(&self, kind: ActivityKind) -> bool {
        let now = Instant::now();
        let debounce = self.debounce;
        self.tx.send_if_modified(|s| {
            if now.saturating_duration_since(s.last_activity_at) < debounce {
                return false;
            }
            s.last_activity_at = now;
            tracing::trace!(?kind, "Activity recorded");
            true
        })
    }

    /// Subscribe to signal changes.
    pub fn subscribe(&self) -> watch::Receiver<Signals> {
        self.tx.subscribe()
    }

    /// Number of live subscribers (schedulers currently listening).
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SignalSource {
    fn default() -> Self {
        Self::new()
    }
}
