//! Adaptive poll loop driving a [`DataCache`].
//!
//! The scheduler owns the timer, the change detector and the consumer
//! callback. Every cycle it asks the cache for data, fires the callback only
//! on a real change and recomputes its interval from the host signals and
//! the cache's backoff state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use opsboard_types::{Dataset, SyncStatus};
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{CacheRead, DataCache};
use crate::delta::DeltaDetector;
use crate::error::SyncError;
use crate::fetch::Fetcher;
use crate::signals::{PollingContext, SignalSource};

/// Callback invoked with each dataset that differs from the previous one.
pub type UpdateCallback = Arc<dyn Fn(Arc<Dataset>) + Send + Sync>;

/// What the scheduler is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Not running.
    #[default]
    Idle,
    /// A cycle is waiting on the cache.
    Fetching,
    /// Waiting for the next deadline.
    Waiting,
}

/// Result of one poll cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The cycle was gated off (hidden, or hard-stopped by backoff).
    Skipped,
    /// The cache was consulted.
    Completed {
        read: CacheRead,
        /// Whether the consumer callback fired.
        changed: bool,
    },
}

/// Puts the phase back however the cycle ends.
///
/// A `stop` that lands mid-cycle has already written `Idle`; that wins.
struct PhaseGuard<'a> {
    phase: &'a Mutex<Phase>,
    previous: Phase,
}

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a Mutex<Phase>) -> Self {
        let previous = std::mem::replace(&mut *phase.lock(), Phase::Fetching);
        Self { phase, previous }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        let mut phase = self.phase.lock();
        if *phase == Phase::Fetching {
            *phase = self.previous;
        }
    }
}

struct Shared<F> {
    cache: DataCache<F>,
    signals: SignalSource,
    on_update: Option<UpdateCallback>,
    detector: tokio::sync::Mutex<DeltaDetector>,
    phase: Mutex<Phase>,
    reschedule: Notify,
}

struct Running {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Polls a [`DataCache`] on an adaptive interval.
///
/// # Example
///
/// ```rust,no_run
/// use opsboard_sync::{DataCache, Fetcher, FetchError, PollScheduler, SignalSource, SyncConfig};
/// use opsboard_types::Dataset;
/// use std::future::Future;
///
/// struct Static;
///
/// impl Fetcher for Static {
///     fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
///         async { Ok(Dataset::empty()) }
///     }
///     fn description(&self) -> &str {
///         "static"
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let cache = DataCache::new(Static, SyncConfig::support_tickets());
///     let scheduler = PollScheduler::builder(cache)
///         .signals(SignalSource::new())
///         .on_update(|dataset| println!("{} records", dataset.len()))
///         .build();
///
///     scheduler.start();
///     let latest = scheduler.force_update().await;
///     scheduler.stop();
///     println!("{:?}", latest.map(|d| d.len()));
/// }
/// ```
pub struct PollScheduler<F> {
    shared: Arc<Shared<F>>,
    running: Mutex<Option<Running>>,
}

impl<F: Fetcher> fmt::Debug for PollScheduler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollScheduler")
            .field("cache", &self.shared.cache)
            .field("phase", &*self.shared.phase.lock())
            .field("running", &self.is_running())
            .finish()
    }
}

impl<F: Fetcher> PollScheduler<F> {
    /// Create a builder around `cache`.
    pub fn builder(cache: DataCache<F>) -> PollSchedulerBuilder<F> {
        PollSchedulerBuilder {
            cache,
            signals: None,
            on_update: None,
        }
    }

    /// Start the poll loop. The first cycle runs immediately.
    ///
    /// Returns false if the loop was already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            return false;
        }
        let cancel = CancellationToken::new();
        let shared = self.shared.clone();
        let handle = tokio::spawn(shared.run(cancel.clone()));
        *running = Some(Running { handle, cancel });
        info!(key = %self.shared.cache.config().key, "Poll scheduler started");
        true
    }

    /// Stop the poll loop, cancel the pending timer and abort any fetch in flight.
    ///
    /// Returns false if the loop was not running.
    pub fn stop(&self) -> bool {
        let Some(running) = self.running.lock().take() else {
            return false;
        };
        running.cancel.cancel();
        running.handle.abort();
        self.shared.cache.abort_in_flight();
        self.shared.cache.pause();
        *self.shared.phase.lock() = Phase::Idle;
        info!(key = %self.shared.cache.config().key, "Poll scheduler stopped");
        true
    }

    /// Returns true while the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Refresh now, bypassing interval and backoff gating.
    ///
    /// The next scheduled poll is counted from the end of this refresh.
    /// Fails only when no data at all could be obtained.
    pub async fn force_update(&self) -> Result<Arc<Dataset>, SyncError> {
        let outcome = self.shared.cycle(true).await;
        if self.is_running() {
            self.shared.reschedule.notify_one();
        }
        match outcome {
            CycleOutcome::Completed { read, .. } if read.has_data() => Ok(read.dataset),
            CycleOutcome::Completed { read, .. } => Err(SyncError::NoData {
                last_error: read.error,
            }),
            CycleOutcome::Skipped => Err(SyncError::NoData { last_error: None }),
        }
    }

    /// Run one gated cycle now, as the timer would.
    pub async fn poll_once(&self) -> CycleOutcome {
        self.shared.cycle(false).await
    }

    /// Whether a cycle at this instant would be allowed to fetch.
    pub fn should_poll(&self) -> bool {
        self.shared.should_poll(Instant::now())
    }

    /// The interval the next cycle would be scheduled with.
    pub fn current_interval(&self) -> Duration {
        self.shared.interval(Instant::now())
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.shared.phase.lock()
    }

    /// Current sync status.
    pub fn status(&self) -> SyncStatus {
        self.shared.cache.status()
    }

    /// Subscribe to sync status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.shared.cache.subscribe_status()
    }

    /// The cache this scheduler drives.
    pub fn cache(&self) -> &DataCache<F> {
        &self.shared.cache
    }

    /// The signal source this scheduler listens to.
    pub fn signals(&self) -> &SignalSource {
        &self.shared.signals
    }
}

impl<F> Drop for PollScheduler<F> {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
            running.handle.abort();
        }
    }
}

impl<F: Fetcher> Shared<F> {
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut signals = self.signals.subscribe();
        let mut was_visible = signals.borrow_and_update().visible;
        let mut deadline = Instant::now();
        *self.phase.lock() = Phase::Waiting;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(deadline) => {
                    self.cycle(false).await;
                    deadline = Instant::now() + self.interval(Instant::now());
                }
                _ = self.reschedule.notified() => {
                    deadline = Instant::now() + self.interval(Instant::now());
                }
                changed = signals.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *signals.borrow_and_update();
                    let now = Instant::now();
                    if current.visible && !was_visible {
                        debug!(key = %self.cache.config().key, "Became visible, polling now");
                        deadline = now;
                    } else if current.visible {
                        deadline = deadline.min(now + self.interval(now));
                    }
                    was_visible = current.visible;
                }
            }
        }
    }

    async fn cycle(&self, force: bool) -> CycleOutcome {
        let mut detector = self.detector.lock().await;
        let now = Instant::now();

        if !force && !self.should_poll(now) {
            debug!(key = %self.cache.config().key, "Poll skipped");
            self.cache.pause();
            return CycleOutcome::Skipped;
        }

        let read = {
            let _phase = PhaseGuard::enter(&self.phase);
            self.cache.get_data(force).await
        };

        let changed = read.has_data() && detector.has_changed(&read.dataset);
        if changed {
            if let Some(callback) = &self.on_update {
                callback(read.dataset.clone());
            }
        }

        debug!(
            key = %self.cache.config().key,
            origin = ?read.origin,
            records = read.dataset.len(),
            changed,
            force,
            "Poll cycle complete"
        );
        CycleOutcome::Completed { read, changed }
    }

    fn should_poll(&self, now: Instant) -> bool {
        if !self.signals.current().visible {
            return false;
        }
        let hard_stop = self.cache.config().poll.hard_stop_failures;
        let failures = self.cache.backoff_state().consecutive_failures;
        !(failures >= hard_stop && self.cache.backoff_remaining(now).is_some())
    }

    fn interval(&self, now: Instant) -> Duration {
        let ctx = PollingContext::new(self.signals.current(), self.cache.is_degraded());
        self.cache.config().poll.interval(
            &ctx,
            self.cache.has_pending(),
            self.cache.backoff_delay(),
            now,
        )
    }
}

/// Builder for [`PollScheduler`].
pub struct PollSchedulerBuilder<F> {
    cache: DataCache<F>,
    signals: Option<SignalSource>,
    on_update: Option<UpdateCallback>,
}

impl<F: Fetcher> PollSchedulerBuilder<F> {
    /// Listen to this signal source. Defaults to an always-visible source.
    pub fn signals(mut self, signals: SignalSource) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Invoke `callback` whenever the dataset changes.
    pub fn on_update<C>(mut self, callback: C) -> Self
    where
        C: Fn(Arc<Dataset>) + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(callback));
        self
    }

    /// Build the scheduler. It does not poll until [`PollScheduler::start`].
    pub fn build(self) -> PollScheduler<F> {
        let fields = self.cache.config().fingerprint.clone();
        PollScheduler {
            shared: Arc::new(Shared {
                cache: self.cache,
                signals: self.signals.unwrap_or_default(),
                on_update: self.on_update,
                detector: tokio::sync::Mutex::new(DeltaDetector::new(fields)),
                phase: Mutex::new(Phase::Idle),
                reschedule: Notify::new(),
            }),
            running: Mutex::new(None),
        }
    }
}
