use super::pane_styles;
use crate::app::App;
use crate::canvas::{scene::SceneNode, GraphWidget, Scene, Selection};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::collections::HashMap;

/// Node box in absolute terminal cells, possibly off-screen: (x, y, w, h)
type CellBox = (i64, i64, i64, i64);

pub fn render_diagram(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let scene = app.scene();
    let (border_style, title_style) = pane_styles(focused);
    let block = Block::default()
        .title(format!(
            " {} ({:.0}%) ",
            app.document().name,
            scene.zoom() * 100.0
        ))
        .title_style(title_style)
        .borders(Borders::ALL)
        .border_style(border_style);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if scene.nodes().is_empty() {
        let empty = Paragraph::new(vec![
            Line::from("No tables in the diagram."),
            Line::from("Select a table and press a to add it."),
        ])
        .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, inner);
        return;
    }

    let boxes: HashMap<&str, CellBox> = scene
        .nodes()
        .iter()
        .map(|node| (node.data.id.as_str(), cell_box(scene, node, inner)))
        .collect();

    for node in scene.nodes() {
        if let Some(&cells) = boxes.get(node.data.id.as_str()) {
            render_node_box(frame, inner, scene, node, cells);
        }
    }

    draw_edges(frame.buffer_mut(), inner, scene, &boxes);
}

fn cell_box(scene: &Scene, node: &SceneNode, inner: Rect) -> CellBox {
    let (left, top, width, height) = scene.node_cells(node);
    (
        (inner.x as i64).saturating_add(left.round() as i64),
        (inner.y as i64).saturating_add(top.round() as i64),
        (width.round() as i64).max(3),
        (height.round() as i64).max(3),
    )
}

/// Part of a cell box visible inside `area`
fn clip(cells: CellBox, area: Rect) -> Option<Rect> {
    let (x, y, w, h) = cells;
    let left = x.max(area.x as i64);
    let top = y.max(area.y as i64);
    let right = x.saturating_add(w).min(area.right() as i64);
    let bottom = y.saturating_add(h).min(area.bottom() as i64);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(
        left as u16,
        top as u16,
        (right - left) as u16,
        (bottom - top) as u16,
    ))
}

fn render_node_box(frame: &mut Frame, area: Rect, scene: &Scene, node: &SceneNode, cells: CellBox) {
    let Some(visible) = clip(cells, area) else {
        return;
    };

    let selected = scene.selection() == &Selection::Node(node.data.id.clone());
    let border = if scene.is_link_mark(&node.data.id) {
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let block = Block::default()
        .title(node.data.label.as_str())
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(border);
    let inner = block.inner(visible);
    frame.render_widget(block, visible);

    // Columns, as many as fit
    let max_rows = inner.height as usize;
    let name_width = (inner.width as usize).saturating_sub(2);
    let mut lines = Vec::new();
    let overflow = node.data.columns.len() > max_rows;
    let shown = if overflow { max_rows.saturating_sub(1) } else { max_rows };

    for col in node.data.columns.iter().take(shown) {
        let (marker, style) = if col.primary_key {
            ("*", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else {
            (" ", Style::default().fg(Color::White))
        };
        let name: String = col.name.chars().take(name_width).collect();
        let mut spans = vec![Span::styled(marker, style), Span::styled(name, style)];
        let used = 1 + col.name.chars().count().min(name_width);
        if used + col.data_type.len() + 1 < inner.width as usize {
            spans.push(Span::styled(
                format!(" {}", col.data_type),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }
    if overflow {
        lines.push(Line::from(Span::styled(
            format!("... {} more", node.data.columns.len() - shown),
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_edges(buf: &mut Buffer, area: Rect, scene: &Scene, boxes: &HashMap<&str, CellBox>) {
    let rects: Vec<CellBox> = boxes.values().copied().collect();

    for edge in scene.edge_list() {
        let Some(route) = scene.edge_route(edge) else {
            continue;
        };
        let style = if scene.selection() == &Selection::Edge(edge.id.clone()) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::LightGreen)
        };

        let cells: Vec<(i64, i64)> = route_cells(&route, area.width, area.height)
            .into_iter()
            .map(|(x, y)| (area.x as i64 + x, area.y as i64 + y))
            .collect();
        let head = route.last().map(|&point| absolute_cell(area, point));
        draw_curve(buf, area, &cells, head, &rects, style);

        if let Some(&point) = route.get(route.len() / 2) {
            let (x, y) = absolute_cell(area, point);
            draw_label(buf, area, x, y, &edge.label, style);
        }
    }
}

/// Terminal cell holding a fractional viewport point, saturating far off-screen
fn absolute_cell(area: Rect, (x, y): (f64, f64)) -> (i64, i64) {
    (
        (area.x as i64).saturating_add(x.floor() as i64),
        (area.y as i64).saturating_add(y.floor() as i64),
    )
}

/// Clip the segment `a`-`b` to the box from `(0, 0)` to `max`
fn clip_segment(a: (f64, f64), b: (f64, f64), max: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, a.0), (dx, max.0 - a.0), (-dy, a.1), (dy, max.1 - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else if p < 0.0 {
            t0 = t0.max(q / p);
        } else {
            t1 = t1.min(q / p);
        }
    }
    (t0 <= t1).then(|| {
        (
            (a.0 + t0 * dx, a.1 + t0 * dy),
            (a.0 + t1 * dx, a.1 + t1 * dy),
        )
    })
}

/// Visible viewport cells along a route, in order and without gaps
fn route_cells(route: &[(f64, f64)], cols: u16, rows: u16) -> Vec<(i64, i64)> {
    let (cols, rows) = (cols as i64, rows as i64);
    let mut cells: Vec<(i64, i64)> = Vec::new();
    for pair in route.windows(2) {
        let Some((a, b)) = clip_segment(pair[0], pair[1], (cols as f64, rows as f64)) else {
            continue;
        };
        // At most one cell per step on either axis
        let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as usize;
        for j in 0..=steps {
            let t = j as f64 / steps as f64;
            let cell = (
                (a.0 + (b.0 - a.0) * t).floor() as i64,
                (a.1 + (b.1 - a.1) * t).floor() as i64,
            );
            let visible = (0..cols).contains(&cell.0) && (0..rows).contains(&cell.1);
            if visible && cells.last() != Some(&cell) {
                cells.push(cell);
            }
        }
    }
    cells
}

fn in_area(area: Rect, x: i64, y: i64) -> bool {
    x >= area.x as i64 && x < area.right() as i64 && y >= area.y as i64 && y < area.bottom() as i64
}

fn inside_box(rects: &[CellBox], x: i64, y: i64) -> bool {
    rects.iter().any(|&(bx, by, bw, bh)| {
        x >= bx && x < bx.saturating_add(bw) && y >= by && y < by.saturating_add(bh)
    })
}

fn draw_curve(
    buf: &mut Buffer,
    area: Rect,
    cells: &[(i64, i64)],
    head: Option<(i64, i64)>,
    rects: &[CellBox],
    style: Style,
) {
    for (i, &(x, y)) in cells.iter().enumerate() {
        if !in_area(area, x, y) || inside_box(rects, x, y) {
            continue;
        }

        let (adx, ady) = match i.checked_sub(1).map(|p| cells[p]) {
            Some((px, py)) => (x - px, y - py),
            None => (1, 0),
        };
        let ch = if i == cells.len() - 1 && head == Some((x, y)) {
            // Arrow head at the target
            if adx.abs() > ady.abs() {
                if adx > 0 { '>' } else { '<' }
            } else if ady > 0 {
                'v'
            } else {
                '^'
            }
        } else if adx != 0 && ady != 0 {
            if (adx > 0) == (ady > 0) { '\\' } else { '/' }
        } else if ady != 0 {
            '│'
        } else {
            '─'
        };

        let cell = buf.get_mut(x as u16, y as u16);
        if can_draw_on_cell(cell.symbol().chars().next().unwrap_or(' ')) {
            cell.set_char(ch);
            cell.set_style(style);
        }
    }
}

fn draw_label(buf: &mut Buffer, area: Rect, x: i64, y: i64, label: &str, style: Style) {
    let width = label.chars().count() as i64;
    let start = x.saturating_sub(width / 2);
    for (offset, ch) in label.chars().enumerate() {
        let cx = start.saturating_add(offset as i64);
        if in_area(area, cx, y) {
            let cell = buf.get_mut(cx as u16, y as u16);
            cell.set_char(ch);
            cell.set_style(style.add_modifier(Modifier::REVERSED));
        }
    }
}

fn can_draw_on_cell(ch: char) -> bool {
    matches!(ch, ' ' | '─' | '│' | '>' | '<' | '^' | 'v' | '/' | '\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::widget::{EdgeData, NodeData};
    use crate::types::Position;

    fn node(id: &str) -> NodeData {
        NodeData {
            id: id.to_string(),
            label: id.to_string(),
            columns: Vec::new(),
        }
    }

    fn link(source: &str, target: &str) -> EdgeData {
        EdgeData {
            id: format!("{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
            label: String::new(),
        }
    }

    fn render_edges(scene: &Scene, area: Rect) -> Buffer {
        let mut buf = Buffer::empty(area);
        let boxes: HashMap<&str, CellBox> = scene
            .nodes()
            .iter()
            .map(|node| (node.data.id.as_str(), cell_box(scene, node, area)))
            .collect();
        draw_edges(&mut buf, area, scene, &boxes);
        buf
    }

    #[test]
    fn route_cells_are_continuous_and_end_on_target() {
        let route = vec![(2.2, 3.7), (15.0, 6.0), (40.4, 15.1)];
        let cells = route_cells(&route, 80, 24);
        assert_eq!(cells.first(), Some(&(2, 3)));
        assert_eq!(cells.last(), Some(&(40, 15)));
        for pair in cells.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!((a.0 - b.0).abs() <= 1 && (a.1 - b.1).abs() <= 1);
        }
    }

    #[test]
    fn route_cells_only_cover_the_viewport() {
        let route = vec![(-1.0e12, 5.5), (1.0e12, 5.5)];
        let cells = route_cells(&route, 80, 24);
        assert_eq!(cells.len(), 80);
        assert!(cells.iter().all(|&(x, y)| (0..80).contains(&x) && y == 5));
        assert!(route_cells(&[(-10.0, -10.0), (-5.0, 30.0)], 80, 24).is_empty());
    }

    #[test]
    fn distant_nodes_render_without_overflow() {
        let mut scene = Scene::new();
        scene.add_node(node("near"), Position::new(0.0, 160.0));
        scene.add_node(node("far"), Position::new(400_000.0, 160.0));
        scene.add_node(node("remote"), Position::new(1.0e18, -1.0e18));
        scene.add_edge(link("near", "far"));
        scene.add_edge(link("near", "remote"));
        scene.add_edge(link("remote", "far"));

        let buf = render_edges(&scene, Rect::new(0, 0, 80, 24));
        // The long edge leaves the near box along its center row
        assert_eq!(buf.get(60, 10).symbol(), "─");
    }

    #[test]
    fn every_drawn_edge_cell_is_clickable() {
        let mut scene = Scene::new();
        scene.set_viewport(100, 100);
        scene.add_node(node("a"), Position::new(400.0, 100.0));
        scene.add_node(node("b"), Position::new(400.0, 1400.0));
        scene.add_edge(link("a", "b"));

        let area = Rect::new(0, 0, 100, 100);
        let buf = render_edges(&scene, area);
        let mut drawn = 0;
        for row in 0..area.height {
            for col in 0..area.width {
                if buf.get(col, row).symbol() == " " {
                    continue;
                }
                drawn += 1;
                let point = scene.cell_to_canvas(col, row);
                assert_eq!(
                    scene.edge_at(point).as_deref(),
                    Some("a-b"),
                    "cell ({}, {}) is drawn but not clickable",
                    col,
                    row
                );
            }
        }
        assert!(drawn > 50);
    }

    #[test]
    fn clip_handles_offscreen_boxes() {
        let area = Rect::new(5, 5, 20, 10);
        assert_eq!(clip((-10, -10, 5, 5), area), None);
        assert_eq!(clip((0, 8, 10, 4), area), Some(Rect::new(5, 8, 5, 4)));
        assert_eq!(clip((i64::MAX - 1, 6, 25, 4), area), None);
        assert_eq!(clip((i64::MIN, 6, 3, 4), area), None);
    }
}
