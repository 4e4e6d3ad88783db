//! Common UI components shared across views.
//!
//! This module contains the header bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;

/// Render the header bar with the sync badge and bucket counts.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.sync.status;
    let badge = Span::styled(
        format!(" ● {} ", status.label().to_uppercase()),
        app.theme.sync_style(status),
    );
    let title = Span::styled("OPSBOARD ", Style::default().add_modifier(Modifier::BOLD));

    let Some(ref board) = app.board else {
        let line = Line::from(vec![badge, title, Span::raw("│ Loading...")]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let counts = board.counts();
    let line = Line::from(vec![
        badge,
        title,
        Span::raw("│ "),
        count_span(counts.escalated, app.theme.critical, true),
        Span::raw(" escalated "),
        count_span(counts.needs_action, app.theme.warning, false),
        Span::raw(" needs action "),
        Span::raw(format!("{}", counts.other)),
        Span::raw(" other │ "),
        Span::styled(
            format!("{}", counts.total()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" records"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn count_span(n: usize, color: ratatui::style::Color, bold: bool) -> Span<'static> {
    if n == 0 {
        return Span::styled("0", Style::default().add_modifier(Modifier::DIM));
    }
    let mut style = Style::default().fg(color);
    if bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    Span::styled(n.to_string(), style)
}

/// Render the status bar at the bottom.
///
/// Shows: data source, age of the data, last error, available controls.
/// Also displays temporary status messages.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.filter_active {
        "Type to search | Enter:apply Esc:cancel"
    } else {
        "r:sync /:search Enter:detail ?:help q:quit"
    };

    let age = match app.sync.data_age {
        Some(age) => format!("Updated {}", format_age(age)),
        None => "No data yet".to_string(),
    };

    let status = match app.sync.last_error {
        Some(ref err) if !app.sync.status.is_healthy() => {
            format!(" {} | {} | {} | {}", app.source_description(), age, err, controls)
        }
        _ if app.sync_in_progress => {
            format!(" {} | {} | Syncing... | {}", app.source_description(), age, controls)
        }
        _ => format!(" {} | {} | {}", app.source_description(), age, controls),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       View record"),
        Line::from("  Esc         Close / clear filter"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Board",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  /         Start filter/search"),
        Line::from("  c         Clear filter"),
        Line::from("  r         Sync now"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 20u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
