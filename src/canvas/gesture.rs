use crate::types::Position;
use std::time::{Duration, Instant};

/// Two taps on the same edge within this window request an edit
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(400);

/// Pointer travel (canvas pixels) before a press becomes a drag
pub(super) const DRAG_THRESHOLD: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Pointer input in canvas coordinates
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub button: PointerButton,
    pub point: Position,
    /// Modifier that turns a primary press on a node into a relationship drag
    pub link_modifier: bool,
    pub at: Instant,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, button: PointerButton, point: Position, at: Instant) -> Self {
        Self {
            kind,
            button,
            point,
            link_modifier: false,
            at,
        }
    }

    pub fn with_link_modifier(mut self, on: bool) -> Self {
        self.link_modifier = on;
        self
    }

    pub(super) fn starts_link(&self) -> bool {
        self.button == PointerButton::Secondary || self.link_modifier
    }
}

/// What the canvas reports back to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    NodeSelected(String),
    EdgeSelected(String),
    SelectionCleared,
    EdgeEditRequested(String),
    RelationshipRequested { source: String, target: String },
    NodeMoved { id: String, position: Position },
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Hit {
    Node(String),
    Edge(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(super) enum Gesture {
    #[default]
    Idle,
    Pressing {
        hit: Hit,
        origin: Position,
    },
    Dragging {
        node: String,
        /// Node center minus pointer, kept constant while dragging
        offset: (f64, f64),
    },
    Linking {
        source: String,
        target: Option<String>,
    },
}
