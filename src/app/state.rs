use super::text_editor::TextInput;
use crate::config::{Connection, DEFAULT_INSTANCE_URL};
use crate::types::RelationKind;
use ratatui::layout::Rect;

/// Which pane currently has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Buckets,
    Tables,
    Canvas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectField {
    Token,
    Url,
}

/// Credential form shown until a connection succeeds
#[derive(Debug, Clone)]
pub struct ConnectForm {
    pub token: TextInput,
    pub url: TextInput,
    pub field: ConnectField,
}

impl ConnectForm {
    pub fn new(previous: Option<&Connection>) -> Self {
        Self {
            token: TextInput::new(previous.map(|c| c.api_token.as_str()).unwrap_or_default()),
            url: TextInput::new(
                previous
                    .map(|c| c.instance_url.as_str())
                    .unwrap_or(DEFAULT_INSTANCE_URL),
            ),
            field: ConnectField::Token,
        }
    }

    pub fn active_input(&mut self) -> &mut TextInput {
        match self.field {
            ConnectField::Token => &mut self.token,
            ConnectField::Url => &mut self.url,
        }
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            ConnectField::Token => ConnectField::Url,
            ConnectField::Url => ConnectField::Token,
        };
    }

    /// Connection from the form, if both fields are filled in
    pub fn connection(&self) -> Option<Connection> {
        let token = self.token.value().trim();
        let url = self.url.value().trim();
        if token.is_empty() || url.is_empty() {
            return None;
        }
        Some(Connection::new(token, url))
    }
}

/// What the relationship dialog will do on confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipTarget {
    Create { source: String, target: String },
    Edit { edge_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipForm {
    pub target: RelationshipTarget,
    pub kind: RelationKind,
}

impl RelationshipForm {
    pub fn toggle_kind(&mut self) {
        self.kind = match self.kind {
            RelationKind::ParentChild => RelationKind::ManyToMany,
            RelationKind::ManyToMany => RelationKind::ParentChild,
        };
    }
}

#[derive(Debug, Clone)]
pub enum Dialog {
    Connect(ConnectForm),
    Relationship(RelationshipForm),
}

/// Interface state that is not part of the designer's data
#[derive(Debug)]
pub struct UiState {
    pub focus: Focus,
    pub bucket_index: usize,
    pub table_index: usize,
    pub filter: TextInput,
    pub filtering: bool,
    pub dialog: Option<Dialog>,
    pub show_help: bool,
    /// Outcome of the last local action (save, export, ...)
    pub status: Option<String>,
    pub selected_edge: Option<String>,
    /// Canvas rectangle from the last frame, for mouse hit testing
    pub canvas_area: Rect,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            focus: Focus::Buckets,
            bucket_index: 0,
            table_index: 0,
            filter: TextInput::default(),
            filtering: false,
            dialog: None,
            show_help: false,
            status: None,
            selected_edge: None,
            canvas_area: Rect::default(),
        }
    }
}

impl UiState {
    pub fn next_pane(&mut self) {
        self.focus = match self.focus {
            Focus::Buckets => Focus::Tables,
            Focus::Tables => Focus::Canvas,
            Focus::Canvas => Focus::Buckets,
        };
    }

    pub fn prev_pane(&mut self) {
        self.focus = match self.focus {
            Focus::Buckets => Focus::Canvas,
            Focus::Tables => Focus::Buckets,
            Focus::Canvas => Focus::Tables,
        };
    }
}

/// Wrapping step through a list of `len` items
pub fn step_index(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    let index = index.min(len - 1);
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}
