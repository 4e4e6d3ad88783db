//! # opsboard-adapters
//!
//! Ready-made [`Fetcher`](opsboard_sync::Fetcher) implementations for the
//! opsboard engine.
//!
//! ## Supported Sources
//!
//! - **Spreadsheet values API** (`sheets` feature, on by default) - reads one
//!   range over HTTP with an API key or bearer token, and reports 429 and
//!   quota error payloads as rate limits so the engine backs off
//! - **JSON file** - reads the same `{ "values": [[...]] }` payload from disk
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opsboard_adapters::JsonFileSource;
//! use opsboard_sync::{DataCache, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = DataCache::new(JsonFileSource::new("board.json"), SyncConfig::reply_queue());
//!     let read = cache.get_data(false).await;
//!     println!("{:?}: {} records", read.origin, read.dataset.len());
//! }
//! ```

pub mod error;
pub mod file;
pub mod payload;

#[cfg(feature = "sheets")]
pub mod sheets;

pub use error::AdapterError;
pub use file::JsonFileSource;

#[cfg(feature = "sheets")]
pub use sheets::SheetsSource;
