//! Terminal UI rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`board`]: Priority-ordered table of records
//! - [`detail`]: Modal overlay showing every field of the selected record
//! - [`common`]: Shared components (header, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ Board (board::render)                │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - common::render_help
//! ```

pub mod board;
pub mod common;
pub mod detail;
pub mod theme;

pub use theme::Theme;
