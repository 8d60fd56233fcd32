use super::widget::{EdgeData, GraphWidget, NodeData, Selection};
use crate::types::Position;

/// Canvas pixels covered by one terminal cell at zoom 1.0
pub const CELL_WIDTH: f64 = 8.0;
pub const CELL_HEIGHT: f64 = 16.0;

/// Node box size in canvas pixels; positions are node centers
pub const NODE_WIDTH: f64 = 200.0;
pub const NODE_HEIGHT: f64 = 112.0;

const MIN_ZOOM: f64 = 0.2;
const MAX_ZOOM: f64 = 4.0;
const FIT_PADDING: f64 = 30.0;
const GRID_SPACING: f64 = 1.2;

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub data: NodeData,
    pub position: Position,
}

/// In-memory graph rendered to the terminal by `ui::diagram`
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    edges: Vec<EdgeData>,
    zoom: f64,
    /// Canvas point shown at the viewport's top-left cell
    pan: Position,
    viewport: (u16, u16),
    selection: Selection,
    link_source: Option<String>,
    link_target: Option<String>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            zoom: 1.0,
            pan: Position::default(),
            viewport: (80, 24),
            selection: Selection::None,
            link_source: None,
            link_target: None,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Viewport size in terminal cells
    pub fn set_viewport(&mut self, cols: u16, rows: u16) {
        self.viewport = (cols.max(1), rows.max(1));
    }

    /// Scroll the view by whole cells
    pub fn pan_by(&mut self, cols: i32, rows: i32) {
        self.pan.x += cols as f64 * CELL_WIDTH / self.zoom;
        self.pan.y += rows as f64 * CELL_HEIGHT / self.zoom;
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn edge_list(&self) -> &[EdgeData] {
        &self.edges
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_link_mark(&self, id: &str) -> bool {
        self.link_source.as_deref() == Some(id) || self.link_target.as_deref() == Some(id)
    }

    /// Canvas point under the center of a viewport cell
    pub fn cell_to_canvas(&self, col: u16, row: u16) -> Position {
        Position::new(
            self.pan.x + (col as f64 + 0.5) * CELL_WIDTH / self.zoom,
            self.pan.y + (row as f64 + 0.5) * CELL_HEIGHT / self.zoom,
        )
    }

    /// Viewport cell coordinates (fractional, may be off-screen) of a canvas point
    pub fn canvas_to_cell(&self, point: Position) -> (f64, f64) {
        (
            (point.x - self.pan.x) * self.zoom / CELL_WIDTH,
            (point.y - self.pan.y) * self.zoom / CELL_HEIGHT,
        )
    }

    /// Node box in viewport cells: (left, top, width, height)
    pub fn node_cells(&self, node: &SceneNode) -> (f64, f64, f64, f64) {
        let top_left = Position::new(
            node.position.x - NODE_WIDTH / 2.0,
            node.position.y - NODE_HEIGHT / 2.0,
        );
        let (left, top) = self.canvas_to_cell(top_left);
        (
            left,
            top,
            NODE_WIDTH * self.zoom / CELL_WIDTH,
            NODE_HEIGHT * self.zoom / CELL_HEIGHT,
        )
    }

    /// Canvas point at fractional viewport cell coordinates
    fn cells_to_canvas(&self, (x, y): (f64, f64)) -> Position {
        Position::new(
            self.pan.x + x * CELL_WIDTH / self.zoom,
            self.pan.y + y * CELL_HEIGHT / self.zoom,
        )
    }

    /// Sampled curve of an edge in fractional viewport cells, from the side of
    /// the source box facing the target to the side of the target facing back.
    /// Drawing and hit testing both follow this route.
    pub fn edge_route(&self, edge: &EdgeData) -> Option<Vec<(f64, f64)>> {
        let from = self.node_cells(self.find(&edge.source)?);
        let to = self.node_cells(self.find(&edge.target)?);
        let start = attach_point(from, box_center(to));
        let end = attach_point(to, box_center(from));
        Some(curve_route(start, end))
    }

    fn viewport_px(&self) -> (f64, f64) {
        (
            self.viewport.0 as f64 * CELL_WIDTH,
            self.viewport.1 as f64 * CELL_HEIGHT,
        )
    }

    fn find(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.data.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.data.id == id)
    }
}

fn contains(center: Position, point: Position) -> bool {
    (point.x - center.x).abs() <= NODE_WIDTH / 2.0 && (point.y - center.y).abs() <= NODE_HEIGHT / 2.0
}

type CellRect = (f64, f64, f64, f64);

fn box_center((x, y, w, h): CellRect) -> (f64, f64) {
    (x + w / 2.0, y + h / 2.0)
}

/// Point just outside the side of `cells` that faces `target`
fn attach_point(cells: CellRect, target: (f64, f64)) -> (f64, f64) {
    let (x, y, w, h) = cells;
    let (cx, cy) = box_center(cells);
    let dx = target.0 - cx;
    let dy = target.1 - cy;

    // Cells are about twice as tall as wide
    if dx.abs() > dy.abs() * 2.0 {
        if dx > 0.0 {
            (x + w + 0.5, cy)
        } else {
            (x - 0.5, cy)
        }
    } else if dy > 0.0 {
        (cx, y + h + 0.5)
    } else {
        (cx, y - 0.5)
    }
}

/// Gentle cubic curve from `start` to `end`, sampled densely enough to draw
fn curve_route(start: (f64, f64), end: (f64, f64)) -> Vec<(f64, f64)> {
    let (x1, y1) = start;
    let (x2, y2) = end;
    let dx = x2 - x1;
    let dy = y2 - y1;
    let dist = dx.hypot(dy);

    let offset = (dist * 0.25).clamp(2.0, 12.0);
    let (c1, c2) = if dx.abs() > dy.abs() {
        let dir = if dy >= 0.0 { 1.0 } else { -1.0 };
        (
            (x1 + dx / 3.0, y1 + dir * offset / 2.0),
            (x1 + 2.0 * dx / 3.0, y2 - dir * offset / 2.0),
        )
    } else {
        let dir = if dx >= 0.0 { 1.0 } else { -1.0 };
        (
            (x1 + dir * offset, y1 + dy / 3.0),
            (x2 - dir * offset, y1 + 2.0 * dy / 3.0),
        )
    };

    let steps = ((dist * 3.0) as usize).clamp(30, 600);
    (0..=steps)
        .map(|i| cubic_bezier(start, c1, c2, end, i as f64 / steps as f64))
        .collect()
}

/// Calculate a point on a cubic bezier curve
fn cubic_bezier(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    t: f64,
) -> (f64, f64) {
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;
    let t2 = t * t;
    let t3 = t2 * t;

    let x = mt3 * p0.0 + 3.0 * mt2 * t * p1.0 + 3.0 * mt * t2 * p2.0 + t3 * p3.0;
    let y = mt3 * p0.1 + 3.0 * mt2 * t * p1.1 + 3.0 * mt * t2 * p2.1 + t3 * p3.1;
    (x, y)
}

/// Distance from `p` to the segment `a`-`b`
fn segment_distance(p: Position, a: Position, b: Position) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(&a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&Position::new(a.x + t * dx, a.y + t * dy))
}

impl GraphWidget for Scene {
    fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.data.id.clone()).collect()
    }

    fn node(&self, id: &str) -> Option<&NodeData> {
        self.find(id).map(|n| &n.data)
    }

    fn add_node(&mut self, node: NodeData, position: Position) {
        if let Some(existing) = self.find_mut(&node.id) {
            existing.data = node;
            return;
        }
        self.nodes.push(SceneNode {
            data: node,
            position,
        });
    }

    fn update_node(&mut self, node: NodeData) {
        if let Some(existing) = self.find_mut(&node.id) {
            existing.data = node;
        }
    }

    fn remove_node(&mut self, id: &str) {
        self.nodes.retain(|n| n.data.id != id);
        self.edges.retain(|e| e.source != id && e.target != id);
        if self.selection == Selection::Node(id.to_string()) {
            self.selection = Selection::None;
        }
    }

    fn node_position(&self, id: &str) -> Option<Position> {
        self.find(id).map(|n| n.position)
    }

    fn set_node_position(&mut self, id: &str, position: Position) {
        if let Some(node) = self.find_mut(id) {
            node.position = position;
        }
    }

    fn edges(&self) -> Vec<EdgeData> {
        self.edges.clone()
    }

    fn add_edge(&mut self, edge: EdgeData) {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return;
        }
        self.edges.push(edge);
    }

    fn set_edge_label(&mut self, id: &str, label: &str) -> bool {
        match self.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                edge.label = label.to_string();
                true
            }
            None => false,
        }
    }

    fn remove_edge(&mut self, id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        if self.selection == Selection::Edge(id.to_string()) {
            self.selection = Selection::None;
        }
        self.edges.len() != before
    }

    fn node_at(&self, point: Position) -> Option<String> {
        // Later nodes draw on top
        self.nodes
            .iter()
            .rev()
            .find(|n| contains(n.position, point))
            .map(|n| n.data.id.clone())
    }

    fn edge_at(&self, point: Position) -> Option<String> {
        let tolerance = 0.75 * CELL_HEIGHT / self.zoom;
        self.edges
            .iter()
            .filter_map(|edge| {
                let route: Vec<Position> = self
                    .edge_route(edge)?
                    .into_iter()
                    .map(|cell| self.cells_to_canvas(cell))
                    .collect();
                let distance = route
                    .windows(2)
                    .map(|pair| segment_distance(point, pair[0], pair[1]))
                    .fold(f64::INFINITY, f64::min);
                (distance <= tolerance).then_some((distance, edge.id.clone()))
            })
            .min_by(|x, y| x.0.total_cmp(&y.0))
            .map(|(_, id)| id)
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: f64) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        // Zoom around the viewport center
        let (vw, vh) = self.viewport_px();
        let center = Position::new(
            self.pan.x + vw / (2.0 * self.zoom),
            self.pan.y + vh / (2.0 * self.zoom),
        );
        self.zoom = zoom;
        self.pan = Position::new(center.x - vw / (2.0 * zoom), center.y - vh / (2.0 * zoom));
    }

    fn fit(&mut self) {
        if self.nodes.is_empty() {
            self.zoom = 1.0;
            self.pan = Position::default();
            return;
        }

        let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
        let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
        for node in &self.nodes {
            min_x = min_x.min(node.position.x - NODE_WIDTH / 2.0);
            min_y = min_y.min(node.position.y - NODE_HEIGHT / 2.0);
            max_x = max_x.max(node.position.x + NODE_WIDTH / 2.0);
            max_y = max_y.max(node.position.y + NODE_HEIGHT / 2.0);
        }
        let width = max_x - min_x + 2.0 * FIT_PADDING;
        let height = max_y - min_y + 2.0 * FIT_PADDING;

        let (vw, vh) = self.viewport_px();
        self.zoom = (vw / width).min(vh / height).clamp(MIN_ZOOM, MAX_ZOOM);
        let center = Position::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
        self.pan = Position::new(
            center.x - vw / (2.0 * self.zoom),
            center.y - vh / (2.0 * self.zoom),
        );
    }

    fn grid_layout(&mut self) -> Vec<(String, Position)> {
        let count = self.nodes.len();
        if count == 0 {
            return Vec::new();
        }
        let cols = (count as f64).sqrt().ceil() as usize;
        let step_x = NODE_WIDTH * GRID_SPACING + FIT_PADDING;
        let step_y = NODE_HEIGHT * GRID_SPACING + FIT_PADDING;

        let mut placed = Vec::with_capacity(count);
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let (row, col) = (index / cols, index % cols);
            node.position = Position::new(
                FIT_PADDING + NODE_WIDTH / 2.0 + col as f64 * step_x,
                FIT_PADDING + NODE_HEIGHT / 2.0 + row as f64 * step_y,
            );
            placed.push((node.data.id.clone(), node.position));
        }
        self.fit();
        placed
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    fn set_link_marks(&mut self, source: Option<String>, target: Option<String>) {
        self.link_source = source;
        self.link_target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> NodeData {
        NodeData {
            id: id.to_string(),
            label: id.to_string(),
            columns: Vec::new(),
        }
    }

    fn edge(id: &str, source: &str, target: &str) -> EdgeData {
        EdgeData {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            label: "Parent-Child".to_string(),
        }
    }

    #[test]
    fn hit_testing_finds_nodes_and_edges() {
        let mut scene = Scene::new();
        scene.add_node(node("a"), Position::new(100.0, 100.0));
        scene.add_node(node("b"), Position::new(600.0, 100.0));
        scene.add_edge(edge("a-b", "a", "b"));

        assert_eq!(scene.node_at(Position::new(150.0, 120.0)).as_deref(), Some("a"));
        assert_eq!(scene.node_at(Position::new(350.0, 300.0)), None);
        assert_eq!(scene.edge_at(Position::new(350.0, 104.0)).as_deref(), Some("a-b"));
        assert_eq!(scene.edge_at(Position::new(350.0, 200.0)), None);
    }

    #[test]
    fn edge_route_runs_between_facing_sides() {
        let mut scene = Scene::new();
        scene.add_node(node("a"), Position::new(100.0, 100.0));
        scene.add_node(node("b"), Position::new(100.0, 900.0));
        scene.add_edge(edge("a-b", "a", "b"));

        let route = scene.edge_route(&scene.edge_list()[0]).unwrap();
        let (_, top, _, height) = scene.node_cells(&scene.nodes()[0]);
        let (_, b_top, _, _) = scene.node_cells(&scene.nodes()[1]);
        let first = route[0];
        let last = route[route.len() - 1];
        assert!((first.1 - (top + height + 0.5)).abs() < 1e-9);
        assert!((last.1 - (b_top - 0.5)).abs() < 1e-9);

        // The curve bows sideways, and clicks on the bowed part still hit
        let (bow_x, bow_y) = route
            .iter()
            .copied()
            .max_by(|p, q| p.0.total_cmp(&q.0))
            .unwrap();
        assert!(bow_x - first.0 > 2.0);
        let click = scene.cells_to_canvas((bow_x, bow_y));
        assert_eq!(scene.edge_at(click).as_deref(), Some("a-b"));
    }

    #[test]
    fn zoom_is_clamped_and_centered() {
        let mut scene = Scene::new();
        scene.set_viewport(100, 50);
        let center = scene.cell_to_canvas(50, 25);
        scene.set_zoom(2.0);
        let after = scene.cell_to_canvas(50, 25);
        assert!(center.distance(&after) < CELL_WIDTH);

        scene.set_zoom(100.0);
        assert_eq!(scene.zoom(), MAX_ZOOM);
        scene.set_zoom(0.0);
        assert_eq!(scene.zoom(), MIN_ZOOM);
    }

    #[test]
    fn fit_brings_all_nodes_into_view() {
        let mut scene = Scene::new();
        scene.set_viewport(80, 24);
        scene.add_node(node("a"), Position::new(-500.0, -500.0));
        scene.add_node(node("b"), Position::new(2000.0, 900.0));
        scene.fit();

        for n in scene.nodes() {
            let (left, top, width, height) = scene.node_cells(n);
            assert!(left >= -0.01 && top >= -0.01);
            assert!(left + width <= 80.01 && top + height <= 24.01);
        }
    }

    #[test]
    fn grid_layout_places_nodes_without_overlap() {
        let mut scene = Scene::new();
        for id in ["a", "b", "c", "d", "e"] {
            scene.add_node(node(id), Position::new(10.0, 10.0));
        }
        let placed = scene.grid_layout();
        assert_eq!(placed.len(), 5);
        for (i, (_, p)) in placed.iter().enumerate() {
            for (_, q) in placed.iter().skip(i + 1) {
                assert!((p.x - q.x).abs() >= NODE_WIDTH || (p.y - q.y).abs() >= NODE_HEIGHT);
            }
        }
    }

    #[test]
    fn removing_node_drops_its_edges() {
        let mut scene = Scene::new();
        scene.add_node(node("a"), Position::new(0.0, 0.0));
        scene.add_node(node("b"), Position::new(400.0, 0.0));
        scene.add_edge(edge("a-b", "a", "b"));
        scene.remove_node("a");
        assert!(scene.edges().is_empty());
    }
}
