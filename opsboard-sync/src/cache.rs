//! Single-flight, TTL-governed cache in front of a [`Fetcher`].
//!
//! The cache owns the current entry and the backoff controller for one data
//! source. Reads never fail: they resolve to the best dataset available and
//! say where it came from.
//!
//! ```text
//! get_data(force)
//!   fresh network entry (and !force) ........ Cached, no I/O
//!   fetch in flight ......................... join it
//!   backoff window open (and !force) ........ Stale / Backup / Empty, no I/O
//!   otherwise ............................... spawn fetch, await result
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opsboard_types::{current_timestamp_ms, BackupRecord, Dataset, SyncStatus};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::{BackoffController, BackoffState};
use crate::error::{FailureKind, FetchError};
use crate::fetch::Fetcher;
use crate::policy::SyncConfig;
use crate::store::FallbackStore;

/// Where the dataset returned by [`DataCache::get_data`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrigin {
    /// In-memory entry still within its TTL.
    Cached,
    /// Fetched by this read (or by the in-flight fetch it joined).
    Network,
    /// Last known-good entry served because the network is unavailable.
    Stale,
    /// Recovered from the persistent fallback store.
    Backup,
    /// Nothing available at all.
    Empty,
}

impl ReadOrigin {
    /// Returns true if the data is current as far as the cache knows.
    pub fn is_fresh(&self) -> bool {
        matches!(self, ReadOrigin::Cached | ReadOrigin::Network)
    }
}

/// Result of a cache read.
#[derive(Debug, Clone)]
pub struct CacheRead {
    /// The dataset (empty when `origin` is [`ReadOrigin::Empty`]).
    pub dataset: Arc<Dataset>,
    /// Where the dataset came from.
    pub origin: ReadOrigin,
    /// When the served entry was fetched, on the engine clock.
    pub fetched_at: Option<Instant>,
    /// Wall-clock time in milliseconds of the fetch that produced the data.
    pub timestamp_ms: Option<u64>,
    /// The failure that forced a fallback, if any.
    pub error: Option<FetchError>,
}

impl CacheRead {
    fn empty(error: Option<FetchError>) -> Self {
        Self {
            dataset: Arc::new(Dataset::empty()),
            origin: ReadOrigin::Empty,
            fetched_at: None,
            timestamp_ms: None,
            error,
        }
    }

    /// Returns true unless nothing at all could be served.
    pub fn has_data(&self) -> bool {
        self.origin != ReadOrigin::Empty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntrySource {
    Network,
    Backup,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    dataset: Arc<Dataset>,
    fetched_at: Instant,
    timestamp_ms: u64,
    has_pending: bool,
    source: EntrySource,
}

impl CacheEntry {
    fn read(&self, origin: ReadOrigin, error: Option<FetchError>) -> CacheRead {
        CacheRead {
            dataset: self.dataset.clone(),
            origin,
            fetched_at: Some(self.fetched_at),
            timestamp_ms: Some(self.timestamp_ms),
            error,
        }
    }

    fn fallback_origin(&self) -> ReadOrigin {
        match self.source {
            EntrySource::Network => ReadOrigin::Stale,
            EntrySource::Backup => ReadOrigin::Backup,
        }
    }
}

#[derive(Debug)]
struct CacheState {
    entry: Option<CacheEntry>,
    backoff: BackoffController,
    in_flight: Option<broadcast::Sender<CacheRead>>,
    last_error: Option<FetchError>,
    cancel: CancellationToken,
}

/// Counters for cache behavior.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    fetches: AtomicU64,
    joins: AtomicU64,
    failures: AtomicU64,
    fallbacks: AtomicU64,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Reads answered from a fresh entry.
    pub hits: u64,
    /// Outbound fetches started.
    pub fetches: u64,
    /// Reads that joined an already running fetch.
    pub joins: u64,
    /// Fetches that failed.
    pub failures: u64,
    /// Reads answered with stale, backup or empty data.
    pub fallbacks: u64,
}

struct Inner<F> {
    fetcher: F,
    config: SyncConfig,
    store: Option<Arc<dyn FallbackStore>>,
    state: Mutex<CacheState>,
    status: watch::Sender<SyncStatus>,
    counters: Counters,
}

/// TTL cache with single-flight fetching, backoff and stale fallback.
///
/// Cloning is cheap; clones share the same entry and in-flight fetch.
pub struct DataCache<F> {
    inner: Arc<Inner<F>>,
}

impl<F> Clone for DataCache<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F: Fetcher> std::fmt::Debug for DataCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("key", &self.inner.config.key)
            .field("source", &self.inner.fetcher.description())
            .field("status", &*self.inner.status.borrow())
            .finish()
    }
}

impl<F: Fetcher> DataCache<F> {
    /// Create a cache with the given configuration and no fallback store.
    pub fn new(fetcher: F, config: SyncConfig) -> Self {
        Self::builder(fetcher).config(config).build()
    }

    /// Create a builder for a cache around `fetcher`.
    pub fn builder(fetcher: F) -> DataCacheBuilder<F> {
        DataCacheBuilder {
            fetcher,
            config: None,
            store: None,
        }
    }

    /// Read the best available dataset.
    ///
    /// With `force_refresh` the TTL check and the backoff gate are skipped,
    /// but a fetch already in flight is still joined rather than duplicated.
    pub async fn get_data(&self, force_refresh: bool) -> CacheRead {
        let now = Instant::now();
        let plan = {
            let mut state = self.inner.state.lock();

            if !force_refresh {
                if let Some(entry) = self.inner.fresh_entry(&state, now) {
                    self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                    // A pause or hidden skip may have left the status behind.
                    if state.in_flight.is_none() {
                        let degraded = state.backoff.is_active() || state.last_error.is_some();
                        self.inner.set_status(if degraded {
                            SyncStatus::Delayed
                        } else {
                            SyncStatus::Synced
                        });
                    }
                    return entry.read(ReadOrigin::Cached, None);
                }
            }

            let joined = state.in_flight.as_ref().map(|tx| tx.subscribe());
            if let Some(rx) = joined {
                self.inner.counters.joins.fetch_add(1, Ordering::Relaxed);
                debug!(key = %self.inner.config.key, "Joining in-flight fetch");
                Ok((rx, None))
            } else if !force_refresh && state.backoff.is_waiting(now) {
                let remaining = state.backoff.remaining(now).unwrap_or_default();
                debug!(
                    key = %self.inner.config.key,
                    remaining_ms = remaining.as_millis() as u64,
                    "Backoff window open, skipping fetch"
                );
                Err(state.last_error.clone())
            } else {
                let (tx, rx) = broadcast::channel(1);
                state.in_flight = Some(tx);
                Ok((rx, Some(state.cancel.clone())))
            }
        };

        let (mut rx, token) = match plan {
            Ok(flight) => flight,
            Err(last_error) => return self.inner.fallback(last_error).await,
        };

        if let Some(token) = token {
            self.inner.counters.fetches.fetch_add(1, Ordering::Relaxed);
            tokio::spawn(self.inner.clone().run_fetch(token));
        }

        match rx.recv().await {
            Ok(read) => read,
            // The fetch task was torn down without publishing.
            Err(_) => self.inner.fallback(Some(FetchError::Cancelled)).await,
        }
    }

    /// The current entry without any I/O, if one exists.
    pub fn peek(&self) -> Option<CacheRead> {
        let state = self.inner.state.lock();
        let now = Instant::now();
        let entry = state.entry.as_ref()?;
        let origin = if self.inner.fresh_entry(&state, now).is_some() {
            ReadOrigin::Cached
        } else {
            entry.fallback_origin()
        };
        Some(entry.read(origin, state.last_error.clone()))
    }

    /// Cancel any in-flight fetch. Later reads start new fetches normally.
    pub fn abort_in_flight(&self) {
        let mut state = self.inner.state.lock();
        if state.in_flight.is_some() {
            debug!(key = %self.inner.config.key, "Aborting in-flight fetch");
        }
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
    }

    /// Mark polling as suspended.
    pub fn pause(&self) {
        self.inner.set_status(SyncStatus::Paused);
    }

    /// Current sync status.
    pub fn status(&self) -> SyncStatus {
        *self.inner.status.borrow()
    }

    /// Subscribe to sync status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Snapshot of the failure streak.
    pub fn backoff_state(&self) -> BackoffState {
        self.inner.state.lock().backoff.state()
    }

    /// Current backoff delay.
    pub fn backoff_delay(&self) -> Duration {
        self.inner.state.lock().backoff.current_delay()
    }

    /// Time left in the backoff window at `now`, if it is open.
    pub fn backoff_remaining(&self, now: Instant) -> Option<Duration> {
        self.inner.state.lock().backoff.remaining(now)
    }

    /// Returns true while the source is failing or rate limited.
    pub fn is_degraded(&self) -> bool {
        self.inner.state.lock().backoff.is_active()
    }

    /// Returns true if the current entry holds pending records.
    pub fn has_pending(&self) -> bool {
        self.inner
            .state
            .lock()
            .entry
            .as_ref()
            .is_some_and(|e| e.has_pending)
    }

    /// The failure of the most recent fetch, cleared on success.
    pub fn last_error(&self) -> Option<FetchError> {
        self.inner.state.lock().last_error.clone()
    }

    /// Counters since creation.
    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            fetches: c.fetches.load(Ordering::Relaxed),
            joins: c.joins.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            fallbacks: c.fallbacks.load(Ordering::Relaxed),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Description of the underlying source.
    pub fn source_description(&self) -> &str {
        self.inner.fetcher.description()
    }
}

/// Owns the right to publish the in-flight result.
///
/// Dropped without publishing, it clears the in-flight slot so waiters see
/// a closed channel and later reads start a new fetch.
struct Flight<'a> {
    state: &'a Mutex<CacheState>,
    published: bool,
}

impl<'a> Flight<'a> {
    fn new(state: &'a Mutex<CacheState>) -> Self {
        Self {
            state,
            published: false,
        }
    }

    fn publish(mut self, read: CacheRead) {
        self.published = true;
        let tx = self.state.lock().in_flight.take();
        if let Some(tx) = tx {
            // No receivers means every waiter gave up; nothing to do.
            let _ = tx.send(read);
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.state.lock().in_flight = None;
        }
    }
}

impl<F: Fetcher> Inner<F> {
    fn fresh_entry<'a>(&self, state: &'a CacheState, now: Instant) -> Option<&'a CacheEntry> {
        let entry = state.entry.as_ref()?;
        if entry.source != EntrySource::Network {
            return None;
        }
        let ttl = self
            .config
            .ttl
            .ttl(entry.has_pending, state.backoff.is_active());
        (now.saturating_duration_since(entry.fetched_at) < ttl).then_some(entry)
    }

    async fn run_fetch(self: Arc<Self>, token: CancellationToken) {
        let flight = Flight::new(&self.state);
        self.set_status(SyncStatus::Syncing);
        debug!(key = %self.config.key, source = self.fetcher.description(), "Fetching");

        // The attempt runs as its own task so a panicking fetcher surfaces
        // as a JoinError here instead of leaving waiters hanging.
        let attempt = tokio::spawn(self.clone().attempt(token));
        let result = match attempt.await {
            Ok(result) => result,
            Err(e) => {
                warn!(key = %self.config.key, error = %e, "Fetch task failed");
                Err(FetchError::Aborted(e.to_string()))
            }
        };

        let read = match result.and_then(|d| self.validate(d)) {
            Ok(dataset) => self.on_success(dataset).await,
            Err(err) => self.on_failure(err).await,
        };
        flight.publish(read);
    }

    async fn attempt(self: Arc<Self>, token: CancellationToken) -> Result<Dataset, FetchError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FetchError::Cancelled),
            r = tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch()) => {
                r.unwrap_or(Err(FetchError::Timeout))
            }
        }
    }

    fn validate(&self, dataset: Dataset) -> Result<Dataset, FetchError> {
        // A source with no values at all is a legitimately empty dataset.
        if dataset.header.is_empty() {
            return Ok(dataset);
        }
        let required = self.config.required_columns();
        let missing = dataset.missing_columns(&required);
        if !missing.is_empty() {
            return Err(FetchError::Schema(
                missing.into_iter().map(String::from).collect(),
            ));
        }
        Ok(dataset)
    }

    async fn on_success(&self, dataset: Dataset) -> CacheRead {
        let now = Instant::now();
        let timestamp_ms = current_timestamp_ms();
        let has_pending = self.config.pending.any_pending(&dataset);
        let dataset = Arc::new(dataset);

        {
            let mut state = self.state.lock();
            if let Some(previous) = &state.entry {
                if !previous.dataset.header.is_empty() && previous.dataset.header != dataset.header
                {
                    warn!(
                        key = %self.config.key,
                        previous = ?previous.dataset.header,
                        current = ?dataset.header,
                        "Source header changed"
                    );
                }
            }
            state.entry = Some(CacheEntry {
                dataset: dataset.clone(),
                fetched_at: now,
                timestamp_ms,
                has_pending,
                source: EntrySource::Network,
            });
            if state.backoff.is_active() {
                info!(key = %self.config.key, "Source recovered, backoff reset");
            }
            state.backoff.on_success();
            state.last_error = None;
        }
        self.set_status(SyncStatus::Synced);

        if self.store.is_some() {
            let record = BackupRecord::with_timestamp((*dataset).clone(), timestamp_ms);
            self.persist_backup(record).await;
        }

        debug!(
            key = %self.config.key,
            records = dataset.len(),
            has_pending,
            "Fetch succeeded"
        );
        CacheRead {
            dataset,
            origin: ReadOrigin::Network,
            fetched_at: Some(now),
            timestamp_ms: Some(timestamp_ms),
            error: None,
        }
    }

    async fn on_failure(&self, err: FetchError) -> CacheRead {
        let now = Instant::now();
        let kind = err.kind();
        {
            let mut state = self.state.lock();
            state.backoff.on_failure(kind, now);
            if kind == FailureKind::QuotaExceeded {
                state.backoff.apply_retry_after(err.retry_after());
            }
            if kind != FailureKind::Cancelled {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                let backoff = state.backoff.state();
                warn!(
                    key = %self.config.key,
                    error = %err,
                    consecutive_failures = backoff.consecutive_failures,
                    delay_s = state.backoff.current_delay().as_secs(),
                    "Fetch failed"
                );
                state.last_error = Some(err.clone());
            } else {
                debug!(key = %self.config.key, "Fetch cancelled");
            }
        }
        if kind == FailureKind::Malformed {
            return self.malformed(err);
        }
        self.fallback(Some(err)).await
    }

    /// A payload that fails to decode counts as an empty dataset for this
    /// cycle only. The current entry is left untouched.
    fn malformed(&self, err: FetchError) -> CacheRead {
        let has_entry = self.state.lock().entry.is_some();
        self.set_status(if has_entry {
            SyncStatus::Delayed
        } else {
            SyncStatus::Error
        });
        CacheRead::empty(Some(err))
    }

    /// Serve the last known-good entry, then the persisted backup, then nothing.
    async fn fallback(&self, error: Option<FetchError>) -> CacheRead {
        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        let cancelled = matches!(error, Some(FetchError::Cancelled));

        let stale = {
            let state = self.state.lock();
            state
                .entry
                .as_ref()
                .map(|e| e.read(e.fallback_origin(), error.clone()))
        };
        if let Some(read) = stale {
            if !cancelled {
                self.set_status(SyncStatus::Delayed);
            }
            return read;
        }

        let recalled = self.recall_backup().await;
        let read = {
            let mut state = self.state.lock();
            if state.entry.is_none() {
                if let Some(record) = recalled {
                    let age = Duration::from_millis(record.age_ms(current_timestamp_ms()));
                    let now = Instant::now();
                    info!(
                        key = %self.config.key,
                        records = record.data.len(),
                        age_s = age.as_secs(),
                        "Serving persisted backup"
                    );
                    state.entry = Some(CacheEntry {
                        has_pending: self.config.pending.any_pending(&record.data),
                        dataset: Arc::new(record.data),
                        fetched_at: now.checked_sub(age).unwrap_or(now),
                        timestamp_ms: record.timestamp_ms,
                        source: EntrySource::Backup,
                    });
                }
            }

            match &state.entry {
                Some(entry) => entry.read(entry.fallback_origin(), error),
                None => CacheRead::empty(error),
            }
        };

        if !cancelled {
            self.set_status(if read.has_data() {
                SyncStatus::Delayed
            } else {
                SyncStatus::Error
            });
        }
        read
    }

    /// Blocking store I/O runs on the blocking pool.
    async fn persist_backup(&self, record: BackupRecord) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let key = self.config.key.clone();
        match tokio::task::spawn_blocking(move || store.persist(&key, &record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key = %self.config.key, error = %e, "Failed to persist backup"),
            Err(e) => warn!(key = %self.config.key, error = %e, "Backup write task failed"),
        }
    }

    async fn recall_backup(&self) -> Option<BackupRecord> {
        let store = self.store.clone()?;
        let key = self.config.key.clone();
        match tokio::task::spawn_blocking(move || store.recall(&key)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!(key = %self.config.key, error = %e, "Failed to read backup");
                None
            }
            Err(e) => {
                warn!(key = %self.config.key, error = %e, "Backup read task failed");
                None
            }
        }
    }

    fn set_status(&self, status: SyncStatus) {
        let key = &self.config.key;
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            if status == SyncStatus::Syncing || *current == SyncStatus::Syncing {
                debug!(key = %key, from = %current, to = %status, "Sync status changed");
            } else {
                info!(key = %key, from = %current, to = %status, "Sync status changed");
            }
            *current = status;
            true
        });
    }
}

/// Builder for [`DataCache`].
pub struct DataCacheBuilder<F> {
    fetcher: F,
    config: Option<SyncConfig>,
    store: Option<Arc<dyn FallbackStore>>,
}

impl<F: Fetcher> DataCacheBuilder<F> {
    /// Set the engine configuration.
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Persist every successful fetch to `store` and fall back to it.
    pub fn store(mut self, store: Arc<dyn FallbackStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the cache. Without a configuration, `SyncConfig::new("default")` is used.
    pub fn build(self) -> DataCache<F> {
        let config = self.config.unwrap_or_else(|| SyncConfig::new("default"));
        let (status, _) = watch::channel(SyncStatus::Syncing);
        DataCache {
            inner: Arc::new(Inner {
                fetcher: self.fetcher,
                state: Mutex::new(CacheState {
                    entry: None,
                    backoff: BackoffController::new(config.backoff.clone()),
                    in_flight: None,
                    last_error: None,
                    cancel: CancellationToken::new(),
                }),
                config,
                store: self.store,
                status,
                counters: Counters::default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Scripted {
        steps: Mutex<VecDeque<Result<Dataset, FetchError>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(steps: Vec<Result<Dataset, FetchError>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for Scripted {
        fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .steps
                .lock()
                .pop_front()
                .unwrap_or(Err(FetchError::Http("script exhausted".into())));
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                step
            }
        }

        fn description(&self) -> &str {
            "scripted"
        }
    }

    fn tickets(status: &str) -> Dataset {
        Dataset::builder()
            .header(["id", "status", "updated_at"])
            .row(["1", status, "2024-05-01"])
            .row(["2", "open", "2024-05-02"])
            .build()
    }

    fn cache(steps: Vec<Result<Dataset, FetchError>>) -> (DataCache<Arc<Scripted>>, Arc<Scripted>) {
        let fetcher = Arc::new(Scripted::new(steps));
        let cache = DataCache::new(fetcher.clone(), SyncConfig::new("test"));
        (cache, fetcher)
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_served_without_io() {
        let (cache, fetcher) = cache(vec![Ok(tickets("open"))]);

        let first = cache.get_data(false).await;
        assert_eq!(first.origin, ReadOrigin::Network);

        tokio::time::advance(Duration::from_secs(10)).await;
        let second = cache.get_data(false).await;
        assert_eq!(second.origin, ReadOrigin::Cached);
        assert!(Arc::ptr_eq(&first.dataset, &second.dataset));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.status(), SyncStatus::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_refetches() {
        let (cache, fetcher) = cache(vec![Ok(tickets("open")), Ok(tickets("closed"))]);
        cache.get_data(false).await;

        tokio::time::advance(Duration::from_secs(31)).await;
        let read = cache.get_data(false).await;
        assert_eq!(read.origin, ReadOrigin::Network);
        assert_eq!(read.dataset.records[0].get("status"), "closed");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_records_shorten_ttl() {
        let pending = Dataset::builder()
            .header(["id", "status", "updated_at"])
            .row(["1", "pending", "2024-05-01"])
            .build();
        let fetcher = Arc::new(Scripted::new(vec![Ok(pending.clone()), Ok(pending)]));
        let cache = DataCache::new(fetcher.clone(), SyncConfig::support_tickets());

        cache.get_data(false).await;
        assert!(cache.has_pending());
        tokio::time::advance(Duration::from_secs(16)).await;
        assert_eq!(cache.get_data(false).await.origin, ReadOrigin::Network);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn force_bypasses_ttl() {
        let (cache, fetcher) = cache(vec![Ok(tickets("open")), Ok(tickets("open"))]);
        cache.get_data(false).await;
        assert_eq!(cache.get_data(true).await.origin, ReadOrigin::Network);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_serves_stale_and_delays() {
        let (cache, _) = cache(vec![
            Ok(tickets("open")),
            Err(FetchError::QuotaExceeded { retry_after: None }),
        ]);
        cache.get_data(false).await;

        let read = cache.get_data(true).await;
        assert_eq!(read.origin, ReadOrigin::Stale);
        assert_eq!(read.dataset.len(), 2);
        assert!(read.error.is_some());
        assert_eq!(cache.status(), SyncStatus::Delayed);
        assert!(cache.is_degraded());
        assert_eq!(cache.backoff_delay(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_window_skips_network() {
        let (cache, fetcher) = cache(vec![Err(FetchError::Timeout), Ok(tickets("open"))]);

        let read = cache.get_data(false).await;
        assert_eq!(read.origin, ReadOrigin::Empty);
        assert_eq!(cache.status(), SyncStatus::Error);

        // Inside the 10s window: no network.
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get_data(false).await.origin, ReadOrigin::Empty);
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get_data(false).await.origin, ReadOrigin::Network);
        assert_eq!(fetcher.calls(), 2);
        assert!(!cache.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn schema_failure_serves_empty_cycle_and_keeps_entry() {
        let broken = Dataset::builder()
            .header(["id", "state"])
            .row(["1", "open"])
            .build();
        let (cache, _) = cache(vec![Ok(tickets("open")), Ok(broken)]);
        cache.get_data(false).await;

        let read = cache.get_data(true).await;
        assert_eq!(read.origin, ReadOrigin::Empty);
        assert!(read.dataset.is_empty());
        assert!(matches!(read.error, Some(FetchError::Schema(_))));
        assert_eq!(cache.status(), SyncStatus::Delayed);
        assert!(!cache.is_degraded());

        // The last known-good entry survives the bad cycle.
        let kept = cache.peek().unwrap();
        assert_eq!(kept.dataset.len(), 2);
        assert_eq!(kept.origin, ReadOrigin::Cached);
    }

    #[tokio::test(start_paused = true)]
    async fn parse_failure_without_entry_is_an_error() {
        let (cache, _) = cache(vec![Err(FetchError::Parse("expected value".into()))]);

        let read = cache.get_data(false).await;
        assert_eq!(read.origin, ReadOrigin::Empty);
        assert_eq!(cache.status(), SyncStatus::Error);
        assert!(cache.peek().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cached_read_refreshes_status_after_pause() {
        let (cache, fetcher) = cache(vec![Ok(tickets("open"))]);
        cache.get_data(false).await;
        cache.pause();
        assert_eq!(cache.status(), SyncStatus::Paused);

        let read = cache.get_data(false).await;
        assert_eq!(read.origin, ReadOrigin::Cached);
        assert_eq!(cache.status(), SyncStatus::Synced);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cached_read_while_degraded_reports_delayed() {
        let (cache, _) = cache(vec![Ok(tickets("open")), Err(FetchError::Timeout)]);
        cache.get_data(false).await;
        cache.get_data(true).await;
        cache.pause();

        // Still inside the TTL: served from memory, but the source is failing.
        let read = cache.get_data(false).await;
        assert_eq!(read.origin, ReadOrigin::Cached);
        assert_eq!(cache.status(), SyncStatus::Delayed);
    }

    struct Panicking {
        calls: AtomicUsize,
    }

    impl Fetcher for Panicking {
        fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    panic!("fetcher blew up");
                }
                Ok(tickets("open"))
            }
        }

        fn description(&self) -> &str {
            "panicking"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_fetch_does_not_wedge_the_cache() {
        let cache = DataCache::new(
            Panicking {
                calls: AtomicUsize::new(0),
            },
            SyncConfig::new("panic"),
        );

        let read = tokio::time::timeout(Duration::from_secs(60), cache.get_data(false))
            .await
            .expect("first read must resolve");
        assert_eq!(read.origin, ReadOrigin::Empty);
        assert!(matches!(read.error, Some(FetchError::Aborted(_))));
        assert_eq!(cache.status(), SyncStatus::Error);

        let read = tokio::time::timeout(Duration::from_secs(60), cache.get_data(true))
            .await
            .expect("forced read must resolve");
        assert_eq!(read.origin, ReadOrigin::Network);
        assert_eq!(read.dataset.len(), 2);
        assert_eq!(cache.status(), SyncStatus::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_a_generic_failure() {
        let fetcher = Arc::new(Scripted {
            delay: Duration::from_secs(60),
            ..Scripted::new(vec![Ok(tickets("open"))])
        });
        let cache = DataCache::new(fetcher, SyncConfig::new("slow"));

        let read = cache.get_data(false).await;
        assert_eq!(read.error, Some(FetchError::Timeout));
        assert_eq!(cache.backoff_state().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backup_is_persisted_and_recalled() {
        let store: Arc<dyn FallbackStore> = Arc::new(MemoryStore::new());

        let warm = DataCache::builder(Scripted::new(vec![Ok(tickets("open"))]))
            .config(SyncConfig::new("tickets"))
            .store(store.clone())
            .build();
        warm.get_data(false).await;

        let cold = DataCache::builder(Scripted::new(vec![Err(FetchError::Connection(
            "offline".into(),
        ))]))
        .config(SyncConfig::new("tickets"))
        .store(store)
        .build();
        let read = cold.get_data(false).await;
        assert_eq!(read.origin, ReadOrigin::Backup);
        assert_eq!(read.dataset.len(), 2);
        assert_eq!(cold.status(), SyncStatus::Delayed);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_cancels_without_counting_failure() {
        let fetcher = Arc::new(Scripted {
            delay: Duration::from_secs(5),
            ..Scripted::new(vec![Ok(tickets("open"))])
        });
        let cache = DataCache::new(fetcher, SyncConfig::new("abort"));

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_data(false).await })
        };
        while cache.stats().fetches == 0 {
            tokio::task::yield_now().await;
        }
        cache.abort_in_flight();

        let read = reader.await.unwrap();
        assert_eq!(read.error, Some(FetchError::Cancelled));
        assert!(!cache.is_degraded());
        assert!(cache.last_error().is_none());
    }
}
