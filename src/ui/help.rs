use super::centered_rect;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation:",
        &[
            ("Tab / Shift+Tab", "Switch between panes"),
            ("Up / Down", "Move in the bucket or table list"),
            ("Arrows", "Pan the diagram (diagram pane)"),
            ("Enter", "Open bucket / show table detail / edit relationship"),
            ("/", "Filter tables"),
        ],
    ),
    (
        "Diagram:",
        &[
            ("a", "Add table to the diagram"),
            ("x", "Remove table from the diagram"),
            ("Mouse drag", "Move a table"),
            ("Right drag / Shift+drag", "Draw a relationship"),
            ("Double click edge", "Change relationship kind"),
            ("Delete", "Remove the selected relationship"),
            ("+ / - / wheel", "Zoom in / out"),
            ("f", "Fit diagram to view"),
            ("g", "Arrange tables in a grid"),
        ],
    ),
    (
        "Files and connection:",
        &[
            ("Ctrl+S / Ctrl+L", "Save / load diagram"),
            ("Ctrl+E / Ctrl+O", "Export / import JSON file"),
            ("c", "Connect (when offline)"),
            ("Ctrl+D", "Disconnect"),
            ("?", "Show this help"),
            ("Esc", "Close modal / clear message"),
            ("q", "Quit application"),
        ],
    ),
];

pub fn render_help(frame: &mut Frame, area: Rect) {
    // Create a centered modal
    let popup_area = centered_rect(70, 80, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title("Help (Press ? or Esc to close)")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines = vec![Line::from(Span::styled(
        "bdm - Business Data Model designer",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))];

    for (title, keys) in SECTIONS {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            *title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        for (key, action) in keys.iter() {
            lines.push(Line::from(vec![
                Span::styled(*key, Style::default().fg(Color::Cyan)),
                Span::raw(format!("  {}", action)),
            ]));
        }
    }

    let para = Paragraph::new(lines)
        .block(Block::default())
        .wrap(Wrap { trim: true });

    frame.render_widget(para, inner);
}
