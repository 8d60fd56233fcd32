//! Designer state as a single value updated by a reducer.
//!
//! Every change goes through [`reduce`] with a named [`Action`], so a test can
//! replay a list of actions and compare the resulting state.

use crate::types::{Bucket, Table};

/// Everything the designer knows about the remote side and the diagram's tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignerState {
    pub connected: bool,
    pub buckets: Vec<Bucket>,
    pub selected_bucket: Option<Bucket>,
    pub tables: Vec<Table>,
    pub selected_table: Option<Table>,
    /// Tables placed on the diagram, unique by id, in insertion order
    pub bdm_tables: Vec<Table>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetConnection(bool),
    SetBuckets(Vec<Bucket>),
    SelectBucket(Option<Bucket>),
    SetTables(Vec<Table>),
    SelectTable(Option<Table>),
    /// Add a table, or refresh it in place if already present
    AddToDiagram(Table),
    /// Drop a table; relationships touching it are the caller's to remove
    RemoveFromDiagram(String),
    /// Replace the diagram's tables wholesale (load/import)
    ReplaceDiagram(Vec<Table>),
    SetLoading(bool),
    SetError(Option<String>),
    /// Forget the remote side but keep the diagram
    Disconnect,
}

pub fn reduce(mut state: DesignerState, action: Action) -> DesignerState {
    match action {
        Action::SetConnection(connected) => {
            state.connected = connected;
        }
        Action::SetBuckets(buckets) => {
            state.buckets = buckets;
        }
        Action::SelectBucket(bucket) => {
            state.selected_bucket = bucket;
        }
        Action::SetTables(tables) => {
            state.tables = tables;
        }
        Action::SelectTable(table) => {
            state.selected_table = table;
        }
        Action::AddToDiagram(table) => {
            match state.bdm_tables.iter_mut().find(|t| t.id == table.id) {
                Some(existing) => *existing = table,
                None => state.bdm_tables.push(table),
            }
        }
        Action::RemoveFromDiagram(table_id) => {
            state.bdm_tables.retain(|t| t.id != table_id);
        }
        Action::ReplaceDiagram(tables) => {
            state.bdm_tables.clear();
            for table in tables {
                state = reduce(state, Action::AddToDiagram(table));
            }
        }
        Action::SetLoading(loading) => {
            state.loading = loading;
        }
        Action::SetError(error) => {
            state.error = error;
        }
        Action::Disconnect => {
            state = DesignerState {
                bdm_tables: std::mem::take(&mut state.bdm_tables),
                ..DesignerState::default()
            };
        }
    }
    state
}

impl DesignerState {
    pub fn is_in_diagram(&self, table_id: &str) -> bool {
        self.bdm_tables.iter().any(|t| t.id == table_id)
    }

    pub fn diagram_table(&self, table_id: &str) -> Option<&Table> {
        self.bdm_tables.iter().find(|t| t.id == table_id)
    }

    /// Tables of the browsed bucket matching the search text
    pub fn filtered_tables(&self, query: &str) -> Vec<&Table> {
        self.tables.iter().filter(|t| t.matches(query)).collect()
    }

    pub fn selected_bucket_id(&self) -> Option<&str> {
        self.selected_bucket.as_ref().map(|b| b.id.as_str())
    }

    pub fn selected_table_id(&self) -> Option<&str> {
        self.selected_table.as_ref().map(|t| t.id.as_str())
    }
}

/// Owner of the current state
#[derive(Debug, Default)]
pub struct Store {
    state: DesignerState,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DesignerState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::trace!(?action, "dispatch");
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }
}
