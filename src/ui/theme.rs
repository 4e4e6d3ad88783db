//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use opsboard_types::{Priority, SyncStatus};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for delayed sync and needs-action rows.
    pub warning: Color,
    /// Color for sync errors and escalated rows.
    pub critical: Color,
    /// Color for a healthy sync.
    pub healthy: Color,
    /// Color for paused polling.
    pub muted: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            muted: Color::Gray,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            muted: Color::DarkGray,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a sync status badge
    pub fn sync_style(&self, status: SyncStatus) -> Style {
        match status {
            SyncStatus::Synced => Style::default().fg(self.healthy),
            SyncStatus::Syncing => Style::default().fg(self.highlight),
            SyncStatus::Delayed => Style::default().fg(self.warning),
            SyncStatus::Error => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
            SyncStatus::Paused => Style::default().fg(self.muted),
        }
    }

    /// Get style for a row priority
    pub fn priority_style(&self, priority: Priority) -> Style {
        match priority {
            Priority::Escalated => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
            Priority::NeedsAction => Style::default().fg(self.warning),
            Priority::Normal => Style::default(),
        }
    }
}
