//! Application state and navigation logic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use opsboard_sync::{ActivityKind, SignalSource};
use opsboard_types::{Dataset, PriorityRules, SyncStatus};

use crate::data::{Board, BoardRow};
use crate::ui::Theme;

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Messages delivered to the UI thread from the engine's tasks.
#[derive(Debug, Clone)]
pub enum BoardUpdate {
    /// The dataset changed.
    Dataset(Arc<Dataset>),
    /// A user-requested sync finished.
    SyncFinished(Result<usize, String>),
}

/// Sync health as last sampled from the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    /// Age of the data currently held by the cache.
    pub data_age: Option<Duration>,
    /// Most recent fetch failure, if the last fetch failed.
    pub last_error: Option<String>,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    // Board data
    pub board: Option<Board>,
    pub sync: SyncSnapshot,
    rules: PriorityRules,
    source_description: String,

    // Engine signals
    signals: SignalSource,
    sync_requested: bool,
    pub sync_in_progress: bool,

    // Navigation state
    pub selected_index: usize,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App, detecting the theme from the terminal background.
    pub fn new(source_description: impl Into<String>, rules: PriorityRules, signals: SignalSource) -> Self {
        Self::with_theme(source_description, rules, signals, Theme::auto_detect())
    }

    /// Create a new App with an explicit theme.
    pub fn with_theme(
        source_description: impl Into<String>,
        rules: PriorityRules,
        signals: SignalSource,
        theme: Theme,
    ) -> Self {
        Self {
            running: true,
            show_help: false,
            show_detail_overlay: false,
            board: None,
            sync: SyncSnapshot::default(),
            rules,
            source_description: source_description.into(),
            signals,
            sync_requested: false,
            sync_in_progress: false,
            selected_index: 0,
            filter_text: String::new(),
            filter_active: false,
            theme,
            status_message: None,
        }
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        &self.source_description
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    /// Apply a message from the engine.
    pub fn apply_update(&mut self, update: BoardUpdate) {
        match update {
            BoardUpdate::Dataset(dataset) => self.set_dataset(&dataset),
            BoardUpdate::SyncFinished(result) => {
                self.sync_in_progress = false;
                match result {
                    Ok(count) => self.set_status_message(format!("Synced {} records", count)),
                    Err(e) => self.set_status_message(format!("Sync failed: {}", e)),
                }
            }
        }
    }

    /// Rebuild the board from a new dataset, keeping the selection in range.
    pub fn set_dataset(&mut self, dataset: &Dataset) {
        self.board = Some(Board::build(dataset, &self.rules));
        self.clamp_selection();
    }

    /// Record the latest engine health.
    pub fn set_sync(&mut self, sync: SyncSnapshot) {
        self.sync = sync;
    }

    /// Ask the host to run a Sync Now. Ignored while one is already running.
    pub fn request_sync(&mut self) {
        if self.sync_in_progress {
            self.set_status_message("Sync already in progress".to_string());
            return;
        }
        self.sync_requested = true;
    }

    /// Take a pending Sync Now request, marking the sync as in progress.
    pub fn take_sync_request(&mut self) -> bool {
        if std::mem::take(&mut self.sync_requested) {
            self.sync_in_progress = true;
            true
        } else {
            false
        }
    }

    /// Feed a user interaction to the poll scheduler.
    pub fn record_activity(&self, kind: ActivityKind) {
        self.signals.record_activity(kind);
    }

    /// Report the terminal gaining or losing focus.
    pub fn set_visible(&self, visible: bool) {
        self.signals.set_visible(visible);
    }

    /// Rows after applying the filter, in display order.
    pub fn visible_rows(&self) -> Vec<&BoardRow> {
        match self.board {
            Some(ref board) => board.filtered(&self.filter_text),
            None => Vec::new(),
        }
    }

    /// The row under the cursor.
    pub fn selected_row(&self) -> Option<&BoardRow> {
        self.visible_rows().get(self.selected_index).copied()
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible_rows().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        self.selected_index = self.visible_rows().len().saturating_sub(1);
    }

    /// Select a visual row if it exists.
    pub fn select_row(&mut self, index: usize) {
        if index < self.visible_rows().len() {
            self.selected_index = index;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_rows().len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
    }

    /// Open the detail overlay for the selected record.
    pub fn enter_detail(&mut self) {
        if self.selected_row().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Navigate back: close the overlay first, then clear the filter.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
        } else if !self.filter_text.is_empty() {
            self.clear_filter();
        }
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
        self.clamp_selection();
    }

    /// Append a character to the filter text.
    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.selected_index = 0;
    }

    /// Remove the last character from the filter text.
    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
        self.clamp_selection();
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::builder()
            .header(["id", "status", "updated_at"])
            .row(["T-1", "open", "2024-05-01T08:00:00Z"])
            .row(["T-2", "escalated", "2024-05-01T07:00:00Z"])
            .row(["T-3", "pending", "2024-05-01T09:00:00Z"])
            .build()
    }

    fn app() -> App {
        let mut app = App::with_theme(
            "file: board.json",
            PriorityRules::default(),
            SignalSource::new(),
            Theme::dark(),
        );
        app.set_dataset(&dataset());
        app
    }

    #[test]
    fn navigation_is_clamped() {
        let mut app = app();
        app.select_prev();
        assert_eq!(app.selected_index, 0);
        app.select_next_n(10);
        assert_eq!(app.selected_index, 2);
        app.select_first();
        assert_eq!(app.selected_row().unwrap().record.get("id"), "T-2");
        app.select_last();
        assert_eq!(app.selected_row().unwrap().record.get("id"), "T-1");
    }

    #[test]
    fn shrinking_dataset_clamps_selection() {
        let mut app = app();
        app.select_last();
        app.set_dataset(
            &Dataset::builder()
                .header(["id", "status", "updated_at"])
                .row(["T-9", "open", ""])
                .build(),
        );
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn filter_narrows_rows() {
        let mut app = app();
        app.start_filter();
        for c in "pend".chars() {
            app.filter_push(c);
        }
        assert_eq!(app.visible_rows().len(), 1);
        assert_eq!(app.selected_row().unwrap().record.get("id"), "T-3");

        app.go_back();
        assert!(app.filter_text.is_empty());
        assert_eq!(app.visible_rows().len(), 3);
    }

    #[test]
    fn detail_needs_a_selection() {
        let mut app = App::with_theme("x", PriorityRules::default(), SignalSource::new(), Theme::dark());
        app.enter_detail();
        assert!(!app.show_detail_overlay);

        let mut app = self::app();
        app.enter_detail();
        assert!(app.show_detail_overlay);
        app.go_back();
        assert!(!app.show_detail_overlay);
    }

    #[test]
    fn sync_request_is_taken_once() {
        let mut app = app();
        app.request_sync();
        assert!(app.take_sync_request());
        assert!(!app.take_sync_request());
        assert!(app.sync_in_progress);

        app.request_sync();
        assert!(!app.take_sync_request());

        app.apply_update(BoardUpdate::SyncFinished(Ok(3)));
        assert!(!app.sync_in_progress);
        assert_eq!(app.get_status_message(), Some("Synced 3 records"));
    }

    #[test]
    fn focus_maps_to_visibility() {
        let signals = SignalSource::new();
        let app = App::with_theme("x", PriorityRules::default(), signals.clone(), Theme::dark());
        app.set_visible(false);
        assert!(!signals.current().visible);
        app.set_visible(true);
        assert!(signals.current().visible);
    }
}
