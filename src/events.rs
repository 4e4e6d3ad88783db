use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use opsboard_sync::ActivityKind;

use crate::app::App;

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Dispatch one terminal event
pub fn handle_event(app: &mut App, event: Event, content_start_row: u16) {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse, content_start_row),
        Event::FocusGained => app.set_visible(true),
        Event::FocusLost => app.set_visible(false),
        _ => {}
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    app.record_activity(ActivityKind::Key);

    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.show_detail_overlay {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
                app.close_overlay();
            }
            // Allow scrolling through records while overlay is open
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::PageUp => app.select_prev_n(10),
            KeyCode::PageDown => app.select_next_n(10),
            KeyCode::Home => app.select_first(),
            KeyCode::End => app.select_last(),
            KeyCode::Char('r') => app.request_sync(),
            _ => {}
        }
        return;
    }

    if app.filter_active {
        handle_filter_input(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),

        KeyCode::Enter => app.enter_detail(),
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        // Sync now
        KeyCode::Char('r') => app.request_sync(),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('/') => app.start_filter(),
        KeyCode::Char('c') => {
            if !app.filter_text.is_empty() {
                app.clear_filter();
            }
        }

        _ => {}
    }
}

/// Handle key input while filter is active
fn handle_filter_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.filter_active = false;
        }

        // Cancel filter (keep text but exit input mode)
        KeyCode::Esc => {
            app.cancel_filter();
        }

        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_filter();
        }

        KeyCode::Backspace => {
            app.filter_pop();
            if app.filter_text.is_empty() {
                app.filter_active = false;
            }
        }

        KeyCode::Char(c) => {
            app.filter_push(c);
        }

        _ => {}
    }
}

/// Handle mouse events
///
/// `content_start_row` is the first screen row holding a record.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, content_start_row: u16) {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.record_activity(ActivityKind::Scroll);
            app.select_prev();
        }
        MouseEventKind::ScrollDown => {
            app.record_activity(ActivityKind::Scroll);
            app.select_next();
        }

        MouseEventKind::Down(MouseButton::Left) => {
            app.record_activity(ActivityKind::Click);
            if app.show_detail_overlay || app.show_help {
                return;
            }
            if mouse.row >= content_start_row {
                app.select_row((mouse.row - content_start_row) as usize);
            }
        }

        MouseEventKind::Down(MouseButton::Right) => {
            app.record_activity(ActivityKind::Click);
            app.go_back();
        }

        MouseEventKind::Moved => app.record_activity(ActivityKind::PointerMove),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use opsboard_sync::SignalSource;
    use opsboard_types::{Dataset, PriorityRules};

    use crate::ui::Theme;

    fn app_with(signals: SignalSource) -> App {
        let mut app = App::with_theme("test", PriorityRules::default(), signals, Theme::dark());
        app.set_dataset(
            &Dataset::builder()
                .header(["id", "status", "updated_at"])
                .row(["T-1", "open", "2024-05-01"])
                .row(["T-2", "pending", "2024-05-02"])
                .build(),
        );
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn mouse(kind: MouseEventKind, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column: 5,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn quit_and_help() {
        let mut app = app_with(SignalSource::new());
        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        // Any key closes help without acting
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.show_help);
        assert!(app.running);
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn r_requests_sync() {
        let mut app = app_with(SignalSource::new());
        handle_key_event(&mut app, key(KeyCode::Char('r')));
        assert!(app.take_sync_request());
    }

    #[test]
    fn filter_captures_typing() {
        let mut app = app_with(SignalSource::new());
        handle_key_event(&mut app, key(KeyCode::Char('/')));
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.running);
        assert_eq!(app.filter_text, "q");
        handle_key_event(&mut app, key(KeyCode::Backspace));
        assert!(!app.filter_active);
    }

    #[test]
    fn enter_opens_detail_and_esc_closes() {
        let mut app = app_with(SignalSource::new());
        handle_key_event(&mut app, key(KeyCode::Enter));
        assert!(app.show_detail_overlay);
        handle_key_event(&mut app, key(KeyCode::Down));
        assert_eq!(app.selected_index, 1);
        handle_key_event(&mut app, key(KeyCode::Esc));
        assert!(!app.show_detail_overlay);
    }

    #[test]
    fn keys_record_activity() {
        let signals = SignalSource::with_debounce(Duration::ZERO);
        let before = signals.current().last_activity_at;
        let mut app = app_with(signals.clone());
        std::thread::sleep(Duration::from_millis(5));
        handle_key_event(&mut app, key(KeyCode::Down));
        assert!(signals.current().last_activity_at > before);
    }

    #[test]
    fn focus_events_toggle_visibility() {
        let signals = SignalSource::new();
        let mut app = app_with(signals.clone());
        handle_event(&mut app, Event::FocusLost, 3);
        assert!(!signals.current().visible);
        handle_event(&mut app, Event::FocusGained, 3);
        assert!(signals.current().visible);
    }

    #[test]
    fn click_selects_row() {
        let mut app = app_with(SignalSource::new());
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 4), 3);
        assert_eq!(app.selected_index, 1);
        // Clicks past the last row are ignored
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 9), 3);
        assert_eq!(app.selected_index, 1);
    }
}
