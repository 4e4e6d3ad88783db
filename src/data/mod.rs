//! Board data model and display helpers.
//!
//! ## Submodules
//!
//! - [`board`]: Priority-ordered [`Board`] built from the engine's dataset
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "30s", "2m")
//!
//! ## Data Flow
//!
//! ```text
//! Dataset (from PollScheduler on_update / DataCache::peek)
//!        │
//!        ▼
//! Board::build(dataset, PriorityRules)
//!        │
//!        ├──▶ BoardRow (record + Priority), most urgent first
//!        │
//!        └──▶ BucketCounts (header bar), BoardExport (--export)
//! ```

pub mod board;
pub mod duration;

pub use board::{Board, BoardExport, BoardRow, BucketCounts};
