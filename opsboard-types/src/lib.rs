//! # opsboard-types
//!
//! Core data model for opsboard. This crate defines the shapes that flow
//! between the tabular source, the synchronization engine and the dashboard:
//! decoded datasets, change fingerprints, sync health and persisted backups.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: the model works without any serialization framework
//! - **Optional serialization**: enable the `serde` feature to (de)serialize
//!   wire payloads and backup records
//! - **Positional decoding**: a header row plus data rows becomes a list of
//!   field-name keyed records
//! - **Deterministic change detection**: fingerprints ignore record order and
//!   cosmetic columns
//!
//! ## Example
//!
//! ```rust
//! use opsboard_types::{Dataset, Fingerprint, FingerprintFields};
//!
//! let dataset = Dataset::from_values(vec![
//!     vec!["id".into(), "status".into(), "updated_at".into()],
//!     vec!["T-1".into(), "open".into(), "2024-05-01T10:00:00Z".into()],
//!     vec!["T-2".into(), "escalated".into()],
//! ]);
//!
//! assert_eq!(dataset.len(), 2);
//! // Short rows are padded with empty strings
//! assert_eq!(dataset.records()[1].get("updated_at"), "");
//!
//! let fields = FingerprintFields::default();
//! let fingerprint = Fingerprint::of(&dataset, &fields);
//! assert!(!fingerprint.is_empty());
//! ```
//!
//! ## Schema Version
//!
//! The current backup schema version is **1**. The version is stored in
//! persisted backups so a newer build can refuse to trust an older layout.

mod backup;
mod dataset;
mod fingerprint;
mod priority;
mod status;
mod version;

pub use backup::*;
pub use dataset::*;
pub use fingerprint::*;
pub use priority::*;
pub use status::*;
pub use version::*;

/// Current backup schema version.
///
/// Increment this when making breaking changes to the persisted backup layout.
pub const SCHEMA_VERSION: u32 = 1;
