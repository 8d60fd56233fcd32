use super::gesture::{CanvasEvent, Gesture, Hit, PointerEvent, PointerKind, DOUBLE_TAP_WINDOW, DRAG_THRESHOLD};
use super::widget::{EdgeData, GraphWidget, NodeData, Selection};
use crate::types::{Position, RelationKind, Relationship, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::mem;
use std::ops::Range;
use std::time::Instant;

/// Region new nodes are scattered in when they have no known position
pub const PLACEMENT_REGION: Range<f64> = 100.0..600.0;

/// Outcome of reconciling the canvas with the diagram tables
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub removed_edges: Vec<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.removed_edges.is_empty()
    }
}

/// Keeps a graph widget in step with the diagram and turns pointer input
/// into canvas events.
///
/// Node positions are cached by table id and outlive the nodes themselves,
/// so a table removed and added back returns to where it was.
pub struct CanvasAdapter<W: GraphWidget> {
    widget: W,
    positions: HashMap<String, Position>,
    region: Range<f64>,
    rng: StdRng,
    gesture: Gesture,
    last_edge_tap: Option<(String, Instant)>,
}

impl<W: GraphWidget> CanvasAdapter<W> {
    pub fn new(widget: W) -> Self {
        Self::with_rng(widget, StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn seeded(widget: W, seed: u64) -> Self {
        Self::with_rng(widget, StdRng::seed_from_u64(seed))
    }

    fn with_rng(widget: W, rng: StdRng) -> Self {
        Self {
            widget,
            positions: HashMap::new(),
            region: PLACEMENT_REGION,
            rng,
            gesture: Gesture::Idle,
            last_edge_tap: None,
        }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    /// Prime the position cache, moving nodes already on the canvas
    pub fn seed_positions(&mut self, positions: &HashMap<String, Position>) {
        for (id, position) in positions {
            self.positions.insert(id.clone(), *position);
            if self.widget.node(id).is_some() {
                self.widget.set_node_position(id, *position);
            }
        }
    }

    /// Reconcile the canvas with `tables` by id: add, update, remove.
    pub fn sync(&mut self, tables: &[Table]) -> SyncReport {
        let wanted: HashSet<&str> = tables.iter().map(|t| t.id.as_str()).collect();
        let mut report = SyncReport::default();

        for id in self.widget.node_ids() {
            if wanted.contains(id.as_str()) {
                continue;
            }
            for edge in self.widget.edges() {
                if edge.source == id || edge.target == id {
                    self.widget.remove_edge(&edge.id);
                    report.removed_edges.push(edge.id);
                }
            }
            if let Some(position) = self.widget.node_position(&id) {
                self.positions.insert(id.clone(), position);
            }
            self.widget.remove_node(&id);
            report.removed.push(id);
        }

        for table in tables {
            let data = NodeData::from_table(table);
            match self.widget.node(&table.id) {
                Some(existing) if *existing == data => {}
                Some(_) => {
                    self.widget.update_node(data);
                    report.updated.push(table.id.clone());
                }
                None => {
                    let position = match self.positions.get(&table.id) {
                        Some(cached) => *cached,
                        None => self.random_position(),
                    };
                    self.positions.insert(table.id.clone(), position);
                    self.widget.add_node(data, position);
                    report.added.push(table.id.clone());
                }
            }
        }

        if !report.is_empty() {
            tracing::debug!(
                added = report.added.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                "Canvas synced"
            );
        }
        report
    }

    fn random_position(&mut self) -> Position {
        Position::new(
            self.rng.gen_range(self.region.clone()),
            self.rng.gen_range(self.region.clone()),
        )
    }

    /// Record where a dragged node was dropped
    pub fn drag_release(&mut self, id: &str, position: Position) {
        self.widget.set_node_position(id, position);
        self.positions.insert(id.to_string(), position);
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<CanvasEvent> {
        match event.kind {
            PointerKind::Down => {
                self.pointer_down(event);
                None
            }
            PointerKind::Move => {
                self.pointer_move(event);
                None
            }
            PointerKind::Up => self.pointer_up(event),
        }
    }

    fn hit(&self, point: Position) -> Hit {
        if let Some(node) = self.widget.node_at(point) {
            Hit::Node(node)
        } else if let Some(edge) = self.widget.edge_at(point) {
            Hit::Edge(edge)
        } else {
            Hit::Empty
        }
    }

    fn pointer_down(&mut self, event: PointerEvent) {
        let hit = self.hit(event.point);
        self.gesture = match hit {
            Hit::Node(source) if event.starts_link() => {
                self.widget.set_link_marks(Some(source.clone()), None);
                Gesture::Linking {
                    source,
                    target: None,
                }
            }
            hit => Gesture::Pressing {
                hit,
                origin: event.point,
            },
        };
    }

    fn pointer_move(&mut self, event: PointerEvent) {
        let point = event.point;
        match &mut self.gesture {
            Gesture::Pressing {
                hit: Hit::Node(id),
                origin,
            } if origin.distance(&point) > DRAG_THRESHOLD => {
                let node = mem::take(id);
                let center = self.widget.node_position(&node).unwrap_or(*origin);
                let offset = (center.x - origin.x, center.y - origin.y);
                self.widget
                    .set_node_position(&node, Position::new(point.x + offset.0, point.y + offset.1));
                self.gesture = Gesture::Dragging { node, offset };
            }
            Gesture::Dragging { node, offset } => {
                let position = Position::new(point.x + offset.0, point.y + offset.1);
                self.widget.set_node_position(node, position);
            }
            Gesture::Linking { source, target } => {
                let hover = self.widget.node_at(point).filter(|id| id.as_str() != source.as_str());
                if *target != hover {
                    *target = hover;
                    self.widget
                        .set_link_marks(Some(source.clone()), target.clone());
                }
            }
            _ => {}
        }
    }

    fn pointer_up(&mut self, event: PointerEvent) -> Option<CanvasEvent> {
        match mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Pressing { hit, .. } => Some(self.tap(hit, event.at)),
            Gesture::Dragging { node, offset } => {
                let position = Position::new(event.point.x + offset.0, event.point.y + offset.1);
                self.drag_release(&node, position);
                Some(CanvasEvent::NodeMoved { id: node, position })
            }
            Gesture::Linking { source, .. } => {
                self.widget.set_link_marks(None, None);
                match self.widget.node_at(event.point) {
                    Some(target) if target != source => {
                        Some(CanvasEvent::RelationshipRequested { source, target })
                    }
                    _ => {
                        tracing::debug!(%source, "Relationship drag abandoned");
                        None
                    }
                }
            }
        }
    }

    /// End the gesture when the pointer is released off the canvas. A drag
    /// keeps the node where it was last shown; a relationship drag is abandoned.
    pub fn cancel_pointer(&mut self) -> Option<CanvasEvent> {
        match mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Pressing { .. } => None,
            Gesture::Dragging { node, .. } => {
                let position = self.widget.node_position(&node)?;
                self.drag_release(&node, position);
                Some(CanvasEvent::NodeMoved { id: node, position })
            }
            Gesture::Linking { source, .. } => {
                self.widget.set_link_marks(None, None);
                tracing::debug!(%source, "Relationship drag left the canvas");
                None
            }
        }
    }

    fn tap(&mut self, hit: Hit, at: Instant) -> CanvasEvent {
        match hit {
            Hit::Node(id) => {
                self.last_edge_tap = None;
                self.widget.set_selection(Selection::Node(id.clone()));
                CanvasEvent::NodeSelected(id)
            }
            Hit::Edge(id) => {
                let double = matches!(
                    &self.last_edge_tap,
                    Some((last, when)) if *last == id && at.duration_since(*when) <= DOUBLE_TAP_WINDOW
                );
                self.widget.set_selection(Selection::Edge(id.clone()));
                if double {
                    self.last_edge_tap = None;
                    CanvasEvent::EdgeEditRequested(id)
                } else {
                    self.last_edge_tap = Some((id.clone(), at));
                    CanvasEvent::EdgeSelected(id)
                }
            }
            Hit::Empty => {
                self.last_edge_tap = None;
                self.widget.set_selection(Selection::None);
                CanvasEvent::SelectionCleared
            }
        }
    }

    /// Draw an edge for `relationship`. Skipped when an edge already joins
    /// the same ordered pair or an endpoint is not on the canvas.
    pub fn add_relationship(&mut self, relationship: &Relationship) -> bool {
        let exists = self
            .widget
            .edges()
            .iter()
            .any(|e| e.source == relationship.from && e.target == relationship.to);
        if exists
            || self.widget.node(&relationship.from).is_none()
            || self.widget.node(&relationship.to).is_none()
        {
            return false;
        }
        self.widget.add_edge(EdgeData {
            id: relationship.edge_id(),
            source: relationship.from.clone(),
            target: relationship.to.clone(),
            label: relationship.kind.label().to_string(),
        });
        true
    }

    pub fn update_relationship(&mut self, edge_id: &str, kind: RelationKind) -> bool {
        self.widget.set_edge_label(edge_id, kind.label())
    }

    pub fn remove_relationship(&mut self, edge_id: &str) -> bool {
        self.widget.remove_edge(edge_id)
    }

    pub fn clear_relationships(&mut self) {
        for edge in self.widget.edges() {
            self.widget.remove_edge(&edge.id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.last_edge_tap = None;
        self.widget.set_selection(Selection::None);
    }

    pub fn zoom_in(&mut self) {
        let zoom = self.widget.zoom() * 1.2;
        self.widget.set_zoom(zoom);
    }

    pub fn zoom_out(&mut self) {
        let zoom = self.widget.zoom() * 0.8;
        self.widget.set_zoom(zoom);
    }

    pub fn fit(&mut self) {
        self.widget.fit();
    }

    /// Lay every node out on a grid; the new positions replace cached ones
    pub fn grid_layout(&mut self) -> Vec<(String, Position)> {
        let placed = self.widget.grid_layout();
        for (id, position) in &placed {
            self.positions.insert(id.clone(), *position);
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::gesture::PointerButton;
    use crate::canvas::Scene;
    use crate::types::Column;
    use std::time::Duration;

    fn table(id: &str) -> Table {
        let mut table = Table::new(id, id);
        table.columns.push(Column {
            name: "id".to_string(),
            data_type: "INTEGER".to_string(),
            nullable: false,
            length: None,
            base_type: "INTEGER".to_string(),
        });
        table
    }

    fn adapter() -> CanvasAdapter<Scene> {
        CanvasAdapter::seeded(Scene::new(), 7)
    }

    fn pointer(kind: PointerKind, x: f64, y: f64, at: Instant) -> PointerEvent {
        PointerEvent::new(kind, PointerButton::Primary, Position::new(x, y), at)
    }

    fn place(canvas: &mut CanvasAdapter<Scene>, id: &str, x: f64, y: f64) {
        canvas.drag_release(id, Position::new(x, y));
    }

    #[test]
    fn new_nodes_land_in_region_and_stay_put_on_refresh() {
        let mut canvas = adapter();
        let tables = vec![table("a"), table("b"), table("c")];
        let report = canvas.sync(&tables);
        assert_eq!(report.added.len(), 3);

        let before = canvas.positions().clone();
        for p in before.values() {
            assert!(PLACEMENT_REGION.contains(&p.x) && PLACEMENT_REGION.contains(&p.y));
        }

        // Same ids, fresh objects with changed data
        let mut refreshed = tables.clone();
        refreshed[1].columns.clear();
        let report = canvas.sync(&refreshed);
        assert!(report.added.is_empty());
        assert_eq!(report.updated, vec!["b".to_string()]);
        assert_eq!(canvas.positions(), &before);
        for id in ["a", "b", "c"] {
            assert_eq!(canvas.widget().node_position(id), before.get(id).copied());
        }
    }

    #[test]
    fn dragged_position_survives_removal_and_re_add() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b")]);
        place(&mut canvas, "a", 42.0, 4242.0);

        canvas.sync(&[table("b")]);
        assert!(canvas.widget().node("a").is_none());
        canvas.sync(&[table("a"), table("b")]);
        assert_eq!(canvas.widget().node_position("a"), Some(Position::new(42.0, 4242.0)));
    }

    #[test]
    fn duplicate_pair_is_skipped_and_removal_cascades() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b"), table("c")]);

        assert!(canvas.add_relationship(&Relationship::new("a", "b", RelationKind::ParentChild)));
        assert!(!canvas.add_relationship(&Relationship::new("a", "b", RelationKind::ManyToMany)));
        assert!(canvas.add_relationship(&Relationship::new("c", "a", RelationKind::ManyToMany)));
        assert!(canvas.add_relationship(&Relationship::new("b", "c", RelationKind::ParentChild)));
        assert!(!canvas.add_relationship(&Relationship::new("a", "ghost", RelationKind::ParentChild)));
        assert_eq!(canvas.widget().edges().len(), 3);

        let report = canvas.sync(&[table("b"), table("c")]);
        assert_eq!(report.removed, vec!["a".to_string()]);
        assert_eq!(report.removed_edges.len(), 2);
        let edges = canvas.widget().edges();
        assert_eq!(edges.len(), 1);
        assert!(edges.iter().all(|e| e.source != "a" && e.target != "a"));
    }

    #[test]
    fn relationship_label_follows_kind_change() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b")]);
        let rel = Relationship::new("a", "b", RelationKind::ParentChild);
        canvas.add_relationship(&rel);

        assert!(canvas.update_relationship(&rel.edge_id(), RelationKind::ManyToMany));
        assert_eq!(canvas.widget().edges()[0].label, "M:N");
        assert!(canvas.remove_relationship(&rel.edge_id()));
        assert!(!canvas.remove_relationship(&rel.edge_id()));
    }

    #[test]
    fn grid_layout_refreshes_cache() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b"), table("c"), table("d")]);
        let placed = canvas.grid_layout();
        assert_eq!(placed.len(), 4);
        for (id, position) in placed {
            assert_eq!(canvas.position(&id), Some(position));
        }
    }

    #[test]
    fn zoom_steps() {
        let mut canvas = adapter();
        canvas.zoom_in();
        assert!((canvas.widget().zoom() - 1.2).abs() < 1e-9);
        canvas.zoom_out();
        assert!((canvas.widget().zoom() - 0.96).abs() < 1e-9);
    }

    #[test]
    fn drag_moves_node_and_reports_drop() {
        let mut canvas = adapter();
        canvas.sync(&[table("a")]);
        place(&mut canvas, "a", 300.0, 300.0);
        let now = Instant::now();

        canvas.handle_pointer(pointer(PointerKind::Down, 310.0, 300.0, now));
        canvas.handle_pointer(pointer(PointerKind::Move, 400.0, 350.0, now));
        let event = canvas.handle_pointer(pointer(PointerKind::Up, 510.0, 400.0, now));

        let expected = Position::new(500.0, 400.0);
        assert_eq!(
            event,
            Some(CanvasEvent::NodeMoved {
                id: "a".to_string(),
                position: expected
            })
        );
        assert_eq!(canvas.position("a"), Some(expected));
    }

    #[test]
    fn taps_select_and_double_tap_edits_edge() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b")]);
        place(&mut canvas, "a", 100.0, 100.0);
        place(&mut canvas, "b", 700.0, 100.0);
        let rel = Relationship::new("a", "b", RelationKind::ParentChild);
        canvas.add_relationship(&rel);
        let edge = rel.edge_id();

        let tap = |canvas: &mut CanvasAdapter<Scene>, x: f64, y: f64, at: Instant| {
            canvas.handle_pointer(pointer(PointerKind::Down, x, y, at));
            canvas.handle_pointer(pointer(PointerKind::Up, x, y, at))
        };

        let start = Instant::now();
        assert_eq!(
            tap(&mut canvas, 100.0, 100.0, start),
            Some(CanvasEvent::NodeSelected("a".to_string()))
        );
        assert_eq!(
            tap(&mut canvas, 400.0, 100.0, start),
            Some(CanvasEvent::EdgeSelected(edge.clone()))
        );
        assert_eq!(canvas.widget().selection(), &Selection::Edge(edge.clone()));
        assert_eq!(
            tap(&mut canvas, 400.0, 100.0, start + Duration::from_millis(250)),
            Some(CanvasEvent::EdgeEditRequested(edge.clone()))
        );

        // Too slow for a double tap
        let later = start + Duration::from_secs(2);
        tap(&mut canvas, 400.0, 100.0, later);
        assert_eq!(
            tap(&mut canvas, 400.0, 100.0, later + Duration::from_millis(600)),
            Some(CanvasEvent::EdgeSelected(edge))
        );

        assert_eq!(
            tap(&mut canvas, 400.0, 900.0, later),
            Some(CanvasEvent::SelectionCleared)
        );
    }

    #[test]
    fn link_drag_requests_relationship_between_distinct_nodes() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b")]);
        place(&mut canvas, "a", 100.0, 100.0);
        place(&mut canvas, "b", 700.0, 100.0);
        let now = Instant::now();

        let link = |kind, x, y| {
            PointerEvent::new(kind, PointerButton::Secondary, Position::new(x, y), now)
        };

        canvas.handle_pointer(link(PointerKind::Down, 100.0, 100.0));
        canvas.handle_pointer(link(PointerKind::Move, 690.0, 110.0));
        assert!(canvas.widget().is_link_mark("b"));
        let event = canvas.handle_pointer(link(PointerKind::Up, 690.0, 110.0));
        assert_eq!(
            event,
            Some(CanvasEvent::RelationshipRequested {
                source: "a".to_string(),
                target: "b".to_string()
            })
        );
        assert!(!canvas.widget().is_link_mark("a"));
        // Positions are untouched by linking
        assert_eq!(canvas.position("a"), Some(Position::new(100.0, 100.0)));
    }

    #[test]
    fn link_drag_onto_source_or_empty_canvas_is_abandoned() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b")]);
        place(&mut canvas, "a", 100.0, 100.0);
        place(&mut canvas, "b", 700.0, 100.0);
        let now = Instant::now();
        let modified = |kind, x, y| pointer(kind, x, y, now).with_link_modifier(true);

        canvas.handle_pointer(modified(PointerKind::Down, 100.0, 100.0));
        assert_eq!(canvas.handle_pointer(modified(PointerKind::Up, 120.0, 110.0)), None);

        canvas.handle_pointer(modified(PointerKind::Down, 100.0, 100.0));
        canvas.handle_pointer(modified(PointerKind::Move, 400.0, 900.0));
        assert_eq!(canvas.handle_pointer(modified(PointerKind::Up, 400.0, 900.0)), None);
        assert!(canvas.widget().edges().is_empty());
    }

    #[test]
    fn release_off_canvas_abandons_link_and_keeps_drag() {
        let mut canvas = adapter();
        canvas.sync(&[table("a"), table("b")]);
        place(&mut canvas, "a", 100.0, 100.0);
        place(&mut canvas, "b", 700.0, 100.0);
        let now = Instant::now();

        // Hovering over b marks it, leaving the canvas drops the link
        canvas.handle_pointer(pointer(PointerKind::Down, 100.0, 100.0, now).with_link_modifier(true));
        canvas.handle_pointer(pointer(PointerKind::Move, 700.0, 100.0, now).with_link_modifier(true));
        assert!(canvas.widget().is_link_mark("b"));
        assert_eq!(canvas.cancel_pointer(), None);
        assert!(!canvas.widget().is_link_mark("a") && !canvas.widget().is_link_mark("b"));

        // A drag stays where it was last shown
        canvas.handle_pointer(pointer(PointerKind::Down, 100.0, 100.0, now));
        canvas.handle_pointer(pointer(PointerKind::Move, 150.0, 300.0, now));
        let moved = Position::new(150.0, 300.0);
        assert_eq!(
            canvas.cancel_pointer(),
            Some(CanvasEvent::NodeMoved {
                id: "a".to_string(),
                position: moved,
            })
        );
        assert_eq!(canvas.position("a"), Some(moved));

        // Nothing pending
        assert_eq!(canvas.cancel_pointer(), None);
    }
}
