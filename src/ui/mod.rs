mod browser;
mod details;
mod diagram;
mod dialogs;
mod help;

use crate::app::{App, Dialog, Focus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub use browser::{render_buckets, render_tables};
pub use details::render_details;
pub use diagram::render_diagram;
pub use dialogs::{render_connect, render_relationship};
pub use help::render_help;

/// Screen areas for one frame
struct Panes {
    buckets: Rect,
    tables: Rect,
    canvas: Rect,
    details: Option<Rect>,
    status: Rect,
}

fn layout(size: Rect, app: &App) -> Panes {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(size);

    let show_details = app.state().selected_table.is_some();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if show_details {
            vec![
                Constraint::Percentage(25),
                Constraint::Min(0),
                Constraint::Percentage(25),
            ]
        } else {
            vec![Constraint::Percentage(25), Constraint::Min(0)]
        })
        .split(vertical[0]);

    let browser = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(35), Constraint::Min(0)])
        .split(columns[0]);

    Panes {
        buckets: browser[0],
        tables: browser[1],
        canvas: columns[1],
        details: show_details.then(|| columns[2]),
        status: vertical[1],
    }
}

/// Drawable canvas cells (inside the border) for a terminal of `size`
pub fn canvas_area(size: Rect, app: &App) -> Rect {
    let canvas = layout(size, app).canvas;
    Rect::new(
        canvas.x.saturating_add(1),
        canvas.y.saturating_add(1),
        canvas.width.saturating_sub(2),
        canvas.height.saturating_sub(2),
    )
}

/// Border and title styles for a pane, highlighted when focused
pub(crate) fn pane_styles(focused: bool) -> (Style, Style) {
    if focused {
        (
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
    } else {
        (Style::default().fg(Color::Gray), Style::default().fg(Color::Gray))
    }
}

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.size();

    if app.ui.show_help {
        render_help(frame, size);
        return;
    }

    let panes = layout(size, app);
    render_buckets(frame, panes.buckets, app);
    render_tables(frame, panes.tables, app);
    render_diagram(frame, panes.canvas, app, app.ui.focus == Focus::Canvas);
    if let Some(area) = panes.details {
        render_details(frame, area, app);
    }
    render_status(frame, panes.status, app);

    match &app.ui.dialog {
        Some(Dialog::Connect(form)) => render_connect(frame, size, form, app),
        Some(Dialog::Relationship(form)) => render_relationship(frame, size, form, app),
        None => {}
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.state();
    let line = if let Some(error) = &state.error {
        Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::White).bg(Color::Red),
        ))
    } else if state.loading {
        Line::from(Span::styled(" Loading... ", Style::default().fg(Color::Yellow)))
    } else if let Some(status) = &app.ui.status {
        Line::from(Span::styled(format!(" {} ", status), Style::default().fg(Color::Green)))
    } else {
        let connection = if state.connected { "connected" } else { "offline" };
        Line::from(vec![
            Span::styled(format!(" {} ", connection), Style::default().fg(Color::Cyan)),
            Span::styled(
                " ? help  a add  x remove  Ctrl+S save  q quit",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    };
    frame.render_widget(Paragraph::new(line), area);
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
