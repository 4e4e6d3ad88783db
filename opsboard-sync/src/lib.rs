//! # opsboard-sync
//!
//! Quota-aware polling engine for dashboards backed by rate-limited tabular
//! sources such as a spreadsheet API.
//!
//! The engine keeps an operations view current without exhausting the
//! source's request quota:
//!
//! - [`DataCache`] serves a fresh entry without I/O, collapses concurrent
//!   reads into one outbound fetch, and falls back to the last known-good
//!   dataset (in memory, then from a [`FallbackStore`]) when the source fails.
//! - [`BackoffController`] grows the retry delay exponentially on quota errors
//!   and resets after one success.
//! - [`DeltaDetector`] fingerprints identity and status columns so cosmetic
//!   churn never re-renders the board.
//! - [`PollScheduler`] adapts its interval to pending work, user activity and
//!   visibility (reported through a [`SignalSource`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opsboard_sync::{DataCache, FileStore, PollScheduler, SignalSource, SyncConfig};
//! # use opsboard_sync::{Fetcher, FetchError};
//! # use opsboard_types::Dataset;
//! # use std::future::Future;
//! # struct Sheet;
//! # impl Fetcher for Sheet {
//! #     fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
//! #         async { Ok(Dataset::empty()) }
//! #     }
//! #     fn description(&self) -> &str { "sheet" }
//! # }
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = DataCache::builder(Sheet)
//!         .config(SyncConfig::support_tickets())
//!         .store(Arc::new(FileStore::new("/var/cache/opsboard")))
//!         .build();
//!
//!     let signals = SignalSource::new();
//!     let scheduler = PollScheduler::builder(cache)
//!         .signals(signals.clone())
//!         .on_update(|dataset| println!("board changed: {} records", dataset.len()))
//!         .build();
//!
//!     scheduler.start();
//!     signals.set_visible(false); // cycles are skipped while hidden
//! }
//! ```

mod backoff;
mod cache;
mod delta;
mod error;
mod fetch;
mod policy;
mod scheduler;
mod signals;
mod store;

pub use backoff::{BackoffConfig, BackoffController, BackoffState};
pub use cache::{CacheRead, CacheStats, DataCache, DataCacheBuilder, ReadOrigin};
pub use delta::DeltaDetector;
pub use error::{FailureKind, FetchError, SyncError};
pub use fetch::Fetcher;
pub use policy::{PendingRule, PollPolicy, SyncConfig, TtlPolicy};
pub use scheduler::{CycleOutcome, Phase, PollScheduler, PollSchedulerBuilder, UpdateCallback};
pub use signals::{ActivityKind, PollingContext, SignalSource, Signals};
pub use store::{FallbackStore, FileStore, MemoryStore, StoreError};

// Re-export the data model for convenience
pub use opsboard_types;
