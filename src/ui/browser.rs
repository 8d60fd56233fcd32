use super::pane_styles;
use crate::app::{App, Focus};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

fn highlight() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub fn render_buckets(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.state();
    let selected = state.selected_bucket_id();

    let items: Vec<ListItem> = state
        .buckets
        .iter()
        .map(|bucket| {
            let marker = if Some(bucket.id.as_str()) == selected { "● " } else { "  " };
            ListItem::new(vec![
                Line::from(format!("{}{}", marker, bucket.name)),
                Line::from(Span::styled(
                    format!("  {}", bucket.subtitle()),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let title = if state.connected { " Buckets " } else { " Buckets (offline) " };
    let (border_style, title_style) = pane_styles(app.ui.focus == Focus::Buckets);
    let block = Block::default()
        .title(title)
        .title_style(title_style)
        .borders(Borders::ALL)
        .border_style(border_style);

    if items.is_empty() {
        let hint = if state.connected {
            "No buckets in this project"
        } else {
            "Press c to connect"
        };
        let para = Paragraph::new(hint)
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(para, area);
        return;
    }

    let mut list_state = ListState::default();
    list_state.select(Some(app.ui.bucket_index));
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut list_state);
}

pub fn render_tables(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.state();
    let filtered = app.filtered_tables();

    let items: Vec<ListItem> = filtered
        .iter()
        .map(|table| {
            let (marker, style) = if state.is_in_diagram(&table.id) {
                ("◆ ", Style::default().fg(Color::Cyan))
            } else {
                ("  ", Style::default())
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}{}", marker, table.label()), style),
                Span::styled(
                    format!(" ({})", table.columns.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let title = match &state.selected_bucket {
        Some(bucket) if app.ui.filter.is_empty() => format!(" Tables: {} ", bucket.name),
        Some(bucket) => format!(" Tables: {} (filtered) ", bucket.name),
        None => " Tables ".to_string(),
    };
    let (border_style, title_style) = pane_styles(app.ui.focus == Focus::Tables);
    let block = Block::default()
        .title(title)
        .title_style(title_style)
        .borders(Borders::ALL)
        .border_style(border_style);

    if items.is_empty() {
        let hint = if state.loading && state.tables.is_empty() {
            "Loading tables..."
        } else if state.selected_bucket.is_some() {
            "No tables"
        } else {
            "Select a bucket"
        };
        frame.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(Color::Gray))
                .block(block),
            area,
        );
    } else {
        let mut list_state = ListState::default();
        list_state.select(Some(app.ui.table_index));
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    // Show filter if active
    if (app.ui.filtering || !app.ui.filter.is_empty()) && area.height > 2 {
        let filter_line = Line::from(Span::styled(
            format!("/{}", app.ui.filter.value()),
            Style::default().fg(Color::Cyan),
        ));
        let line_area = Rect::new(area.x + 1, area.y + area.height - 1, area.width.saturating_sub(2), 1);
        frame.render_widget(filter_line, line_area);
        if app.ui.filtering {
            let x = line_area.x + 1 + app.ui.filter.cursor_column() as u16;
            frame.set_cursor(x.min(line_area.x + line_area.width), line_area.y);
        }
    }
}
