use super::centered_rect;
use crate::app::{App, ConnectField, ConnectForm, RelationshipForm, RelationshipTarget, TextInput};
use crate::types::RelationKind;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

fn input_field(frame: &mut Frame, area: Rect, title: &str, text: String, input: &TextInput, active: bool) {
    let border = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border);
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(text).block(block), area);

    if active {
        let x = inner.x + (input.cursor_column() as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor(x, inner.y);
    }
}

pub fn render_connect(frame: &mut Frame, area: Rect, form: &ConnectForm, app: &App) {
    let popup = centered_rect(60, 50, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(" Connect to Storage API ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);

    input_field(
        frame,
        rows[0],
        " API token ",
        form.token.masked(),
        &form.token,
        form.field == ConnectField::Token,
    );
    input_field(
        frame,
        rows[1],
        " Instance URL ",
        form.url.value().to_string(),
        &form.url,
        form.field == ConnectField::Url,
    );

    let state = app.state();
    let mut lines = Vec::new();
    if state.loading {
        lines.push(Line::from(Span::styled(
            "Connecting...",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Enter connect  Tab switch field  Esc close",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), rows[2]);
}

pub fn render_relationship(frame: &mut Frame, area: Rect, form: &RelationshipForm, app: &App) {
    let popup = centered_rect(50, 40, area);
    frame.render_widget(Clear, popup);

    let (title, subject) = match &form.target {
        RelationshipTarget::Create { source, target } => {
            (" New relationship ", format!("{} -> {}", source, target))
        }
        RelationshipTarget::Edit { edge_id } => {
            let subject = app
                .document()
                .relationship(edge_id)
                .map(|r| format!("{} -> {}", r.from, r.to))
                .unwrap_or_else(|| edge_id.clone());
            (" Edit relationship ", subject)
        }
    };

    let mut lines = vec![
        Line::from(Span::styled(
            subject,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (index, kind) in RelationKind::ALL.iter().enumerate() {
        let chosen = *kind == form.kind;
        let style = if chosen {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let marker = if chosen { "(•)" } else { "( )" };
        lines.push(Line::from(Span::styled(
            format!(" {} {} {} ", marker, index + 1, kind.description()),
            style,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter confirm  Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
