//! Board view rendering.
//!
//! Displays the records of the current dataset, most urgent first, with the
//! first few source columns and a priority marker.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;

/// Render the board table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(ref board) = app.board else {
        let message = match app.sync.last_error {
            Some(ref err) => format!("No data: {}", err),
            None => "Waiting for first sync...".to_string(),
        };
        let paragraph = Paragraph::new(Line::from(message))
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block.title(" Board "));
        frame.render_widget(paragraph, area);
        return;
    };

    let rows_to_show = app.visible_rows();
    let columns = board.table_columns();

    let mut header_cells = vec![Cell::from("")];
    header_cells.extend(columns.iter().map(|c| Cell::from(c.clone())));
    let header = Row::new(header_cells).height(1).style(app.theme.header);

    let rows: Vec<Row> = rows_to_show
        .iter()
        .map(|row| {
            let style = app.theme.priority_style(row.priority);
            let mut cells = vec![Cell::from(priority_marker(row.priority)).style(style)];
            cells.extend(
                columns
                    .iter()
                    .map(|c| Cell::from(row.record.get(c).to_string())),
            );
            Row::new(cells).style(style)
        })
        .collect();

    // Marker column, then the first column (usually the identity) gets a
    // double share.
    let mut widths = vec![Constraint::Length(2)];
    widths.extend(
        (0..columns.len()).map(|i| if i == 0 { Constraint::Fill(2) } else { Constraint::Fill(1) }),
    );

    let selected = app.selected_index.min(rows_to_show.len().saturating_sub(1));

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let position_info = if !rows_to_show.is_empty() {
        format!(" [{}/{}]", selected + 1, rows_to_show.len())
    } else {
        String::new()
    };

    let title = format!(
        " Board ({}/{}){}{} ",
        rows_to_show.len(),
        board.len(),
        filter_info,
        position_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if !rows_to_show.is_empty() {
        state.select(Some(selected));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn priority_marker(priority: opsboard_types::Priority) -> &'static str {
    match priority {
        opsboard_types::Priority::Escalated => "!!",
        opsboard_types::Priority::NeedsAction => "!",
        opsboard_types::Priority::Normal => "",
    }
}
