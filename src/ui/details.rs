use crate::app::App;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))
}

fn field(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Cyan)),
        Span::raw(value.to_string()),
    ])
}

/// Detail panel for the selected table
pub fn render_details(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Table ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let Some(table) = &app.state().selected_table else {
        frame.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            table.label().to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        field("ID", &table.id),
    ];
    if let Some(description) = table.description() {
        lines.push(field("Description", description));
    }
    if !table.primary_key.is_empty() {
        lines.push(field("Primary key", &table.primary_key.join(", ")));
    }
    if app.state().is_in_diagram(&table.id) {
        lines.push(Line::from(Span::styled(
            "In diagram (x to remove)",
            Style::default().fg(Color::Green),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Not in diagram (a to add)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines.push(Line::from(""));
    lines.push(heading(&format!("Columns ({})", table.columns.len())));
    if table.columns.is_empty() {
        lines.push(Line::from(Span::styled(
            "No column detail available",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for column in &table.columns {
        let name_style = if table.is_primary_key(&column.name) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::styled(column.name.clone(), name_style),
            Span::raw("  "),
            Span::styled(column.type_label(), Style::default().fg(Color::Gray)),
        ]));
        if let Some(description) = table.column_description(&column.name) {
            lines.push(Line::from(Span::styled(
                format!("  {}", description),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(para, area);
}
