//! Detail overlay rendering.
//!
//! Displays a modal overlay with every field of the selected record, in
//! source column order.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 40;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 10;

/// Render the record detail as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(ref board) = app.board else {
        return;
    };
    let Some(row) = app.selected_row() else {
        return;
    };

    let overlay_width = (area.width * 90 / 100).clamp(MIN_OVERLAY_WIDTH, 100);
    let overlay_height = (area.height * 80 / 100).clamp(MIN_OVERLAY_HEIGHT, 40);

    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Min(4),    // Fields
        Constraint::Length(1), // Footer
    ])
    .split(overlay_area);

    // Header columns first, then any field the header does not name.
    let mut fields: Vec<(&str, &str)> = board
        .header
        .iter()
        .map(|name| (name.as_str(), row.record.get(name)))
        .collect();
    fields.extend(
        row.record
            .iter()
            .filter(|(name, _)| !board.header.iter().any(|h| h == name)),
    );

    let label_width = fields
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(4, 24) as u16;

    let rows: Vec<Row> = fields
        .iter()
        .map(|(name, value)| {
            Row::new(vec![
                Cell::from(name.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(value.to_string()),
            ])
        })
        .collect();

    let title = format!(" {} · {} ", row.priority.label(), app.source_description());
    let table = Table::new(rows, [Constraint::Length(label_width + 1), Constraint::Fill(1)]).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.highlight)),
    );
    frame.render_widget(table, chunks[0]);

    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " ↑↓:next record  Esc/Enter:close",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[1]);
}
