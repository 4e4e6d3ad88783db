// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # opsboard
//!
//! A terminal dashboard for work queues kept in a rate-limited spreadsheet
//! (support tickets, reply queues). The heavy lifting lives in the
//! `opsboard-sync` engine; this crate wires it to a source, a config file
//! and a ratatui front end.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         opsboard                             │
//! │  ┌─────────┐   ┌───────────────┐   ┌───────┐   ┌──────────┐  │
//! │  │ config  │──▶│ PollScheduler │──▶│  app  │──▶│    ui    │  │
//! │  │ (layers)│   │  + DataCache  │   │(state)│   │(ratatui) │  │
//! │  └─────────┘   └───────┬───────┘   └───┬───┘   └──────────┘  │
//! │                        │               │                     │
//! │                        ▼               ▼                     │
//! │                  ┌──────────┐    SignalSource                │
//! │                  │  source  │◀── SheetsSource | JsonFileSource│
//! │                  └──────────┘                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: [`BoardConfig`] layered from TOML, `OPSBOARD_*` env and CLI flags
//! - **[`source`]**: the configured [`Source`], a [`Fetcher`](opsboard_sync::Fetcher)
//! - **[`data`]**: the priority-ordered [`Board`] and duration helpers
//! - **[`app`]**: UI state; forwards activity and focus to the engine's signals
//! - **[`ui`]**: board table, detail overlay, header and status bar
//!
//! ## Usage
//!
//! ```bash
//! # Read a local export
//! opsboard --file board.json
//!
//! # Poll a spreadsheet range with settings from opsboard.toml
//! opsboard --profile replies
//!
//! # One forced refresh written as JSON
//! opsboard --file board.json --export board-export.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use opsboard::{App, Board, BoardConfig};
//! use opsboard_sync::SignalSource;
//! use opsboard_types::Dataset;
//!
//! let config = BoardConfig::from_toml(r#"profile = "replies""#).unwrap();
//! let dataset = Dataset::from_values(vec![
//!     vec!["id".into(), "status".into(), "updated_at".into()],
//!     vec!["R-1".into(), "awaiting_reply".into(), "2024-05-01".into()],
//! ]);
//!
//! let board = Board::build(&dataset, &config.priority_rules());
//! assert_eq!(board.counts().needs_action, 1);
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, BoardUpdate, SyncSnapshot};
pub use config::{BoardConfig, Profile, SourceConfig};
pub use data::{Board, BoardExport, BoardRow, BucketCounts};
pub use source::Source;
