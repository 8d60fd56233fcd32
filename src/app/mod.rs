mod state;
mod text_editor;

use crate::canvas::{
    CanvasAdapter, CanvasEvent, GraphWidget, PointerButton, PointerEvent, PointerKind, Scene,
    Selection,
};
use crate::config::{self, Connection};
use crate::diagram::{persist, BdmDocument};
use crate::storage::Storage;
use crate::store::{Action, DesignerState, Store};
use crate::types::{RelationKind, Relationship, Table};
use crate::worker::{DetailPurpose, RequestId, Worker, WorkerMessage, WorkerResponse};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

pub use state::{
    ConnectField, ConnectForm, Dialog, Focus, RelationshipForm, RelationshipTarget, UiState,
};
pub use text_editor::TextInput;

/// Main application controller
pub struct App {
    store: Store,
    pub ui: UiState,
    document: BdmDocument,
    canvas: CanvasAdapter<Scene>,
    storage: Box<dyn Storage>,
    worker: Worker,
    pending: HashSet<RequestId>,
    next_request: RequestId,
    export_path: PathBuf,
    should_quit: bool,
}

impl App {
    pub fn new(worker: Worker, storage: Box<dyn Storage>, export_path: PathBuf) -> Self {
        Self {
            store: Store::new(),
            ui: UiState::default(),
            document: BdmDocument::default(),
            canvas: CanvasAdapter::new(Scene::new()),
            storage,
            worker,
            pending: HashSet::new(),
            next_request: 1,
            export_path,
            should_quit: false,
        }
    }

    pub fn state(&self) -> &DesignerState {
        self.store.state()
    }

    pub fn document(&self) -> &BdmDocument {
        &self.document
    }

    pub fn scene(&self) -> &Scene {
        self.canvas.widget()
    }

    /// Check if application should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Tables of the browsed bucket matching the filter
    pub fn filtered_tables(&self) -> Vec<&Table> {
        self.state().filtered_tables(self.ui.filter.value())
    }

    /// Table under the cursor in the tables pane
    pub fn cursor_table(&self) -> Option<&Table> {
        self.filtered_tables().get(self.ui.table_index).copied()
    }

    /// Restore the saved diagram, then connect with the given or remembered credential
    pub fn startup(&mut self, connection: Option<Connection>, reconnect: bool) {
        match persist::load(self.storage.as_ref()) {
            Ok(Some(doc)) => {
                tracing::info!(tables = doc.tables.len(), "Restored saved diagram");
                self.apply_document(doc);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Saved diagram ignored: {}", e);
                self.ui.status = Some(format!("Saved diagram could not be restored: {}", e));
            }
        }

        let remembered = if reconnect && connection.is_none() {
            config::load_connection(self.storage.as_ref()).unwrap_or_else(|e| {
                tracing::warn!("Saved connection unavailable: {}", e);
                None
            })
        } else {
            None
        };

        match connection.or(remembered) {
            Some(connection) => {
                self.ui.dialog = Some(Dialog::Connect(ConnectForm::new(Some(&connection))));
                self.connect(connection);
            }
            None => self.ui.dialog = Some(Dialog::Connect(ConnectForm::new(None))),
        }
    }

    /// Canvas rectangle for this frame; mouse input is mapped through it
    pub fn set_canvas_area(&mut self, area: Rect) {
        self.ui.canvas_area = area;
        self.canvas.widget_mut().set_viewport(area.width, area.height);
    }

    fn send(&mut self, build: impl FnOnce(RequestId) -> WorkerMessage) {
        let request = self.next_request;
        self.next_request += 1;

        match self.worker.send(build(request)) {
            Ok(()) => {
                self.pending.insert(request);
                self.store.dispatch(Action::SetLoading(true));
            }
            Err(e) => {
                tracing::error!("Worker unavailable: {}", e);
                self.store
                    .dispatch(Action::SetError(Some(format!("Background worker stopped: {}", e))));
            }
        }
    }

    pub fn connect(&mut self, connection: Connection) {
        tracing::info!(url = %connection.instance_url, "Connecting");
        self.store.dispatch(Action::SetError(None));
        self.send(|request| WorkerMessage::Connect {
            request,
            connection,
        });
    }

    pub fn select_bucket(&mut self, index: usize) {
        let Some(bucket) = self.state().buckets.get(index).cloned() else {
            return;
        };
        self.ui.bucket_index = index;
        self.ui.table_index = 0;
        let bucket_id = bucket.id.clone();
        self.store.dispatch(Action::SelectBucket(Some(bucket)));
        self.store.dispatch(Action::SetTables(Vec::new()));
        self.store.dispatch(Action::SelectTable(None));
        self.send(|request| WorkerMessage::LoadTables { request, bucket_id });
    }

    fn request_detail(&mut self, table_id: String, purpose: DetailPurpose) {
        self.send(|request| WorkerMessage::LoadTableDetail {
            request,
            table_id,
            purpose,
        });
    }

    /// Show a table in the details panel and fetch its latest detail
    pub fn inspect_table(&mut self, table_id: &str) {
        let state = self.state();
        let snapshot = state
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .or_else(|| state.diagram_table(table_id))
            .cloned();
        let Some(table) = snapshot else {
            return;
        };

        let in_diagram = state.is_in_diagram(table_id);
        let connected = state.connected;
        self.store.dispatch(Action::SelectTable(Some(table)));
        self.ui.selected_edge = None;
        if in_diagram {
            self.canvas
                .widget_mut()
                .set_selection(Selection::Node(table_id.to_string()));
        }
        if connected {
            self.request_detail(table_id.to_string(), DetailPurpose::Inspect);
        }
    }

    /// Fetch the cursor table's detail and add it to the diagram
    pub fn add_cursor_table(&mut self) {
        let Some(table_id) = self.cursor_table().map(|t| t.id.clone()) else {
            return;
        };
        self.request_detail(table_id, DetailPurpose::AddToDiagram);
    }

    pub fn remove_table(&mut self, table_id: &str) {
        let Some(label) = self.state().diagram_table(table_id).map(|t| t.label().to_string()) else {
            return;
        };
        self.store
            .dispatch(Action::RemoveFromDiagram(table_id.to_string()));
        self.sync_canvas();
        if self.state().selected_table_id() == Some(table_id) {
            self.store.dispatch(Action::SelectTable(None));
        }
        self.ui.status = Some(format!("Removed {} from the diagram", label));
    }

    /// Bring the canvas and the document in line with the diagram tables
    fn sync_canvas(&mut self) {
        let tables = self.state().bdm_tables.clone();
        let report = self.canvas.sync(&tables);
        let dropped = self.document.sync_nodes(&tables, self.canvas.positions());
        for edge_id in dropped.iter().chain(report.removed_edges.iter()) {
            self.canvas.remove_relationship(edge_id);
        }
        if let Some(edge_id) = &self.ui.selected_edge {
            if self.document.relationship(edge_id).is_none() {
                self.ui.selected_edge = None;
            }
        }
    }

    /// Replace the diagram with a loaded or imported document
    fn apply_document(&mut self, doc: BdmDocument) {
        self.canvas.clear_relationships();
        self.canvas.clear_selection();
        self.canvas.seed_positions(&doc.positions());
        let tables = doc.tables();
        self.document = doc;
        self.ui.selected_edge = None;

        self.store.dispatch(Action::ReplaceDiagram(tables));
        self.sync_canvas();
        for relationship in self.document.relationships.clone() {
            self.canvas.add_relationship(&relationship);
        }

        if self.state().connected {
            self.refresh_diagram_tables();
        }
    }

    fn refresh_diagram_tables(&mut self) {
        let ids: Vec<String> = self.state().bdm_tables.iter().map(|t| t.id.clone()).collect();
        for table_id in ids {
            self.request_detail(table_id, DetailPurpose::Refresh);
        }
    }

    /// Process worker responses
    pub fn process_worker_responses(&mut self) {
        loop {
            match self.worker.try_recv() {
                Ok(Some(response)) => self.apply_response(response),
                Ok(None) => break,
                Err(e) => {
                    if !self.pending.is_empty() {
                        self.pending.clear();
                        self.store.dispatch(Action::SetLoading(false));
                        self.store.dispatch(Action::SetError(Some(e.to_string())));
                    }
                    break;
                }
            }
        }
    }

    pub fn apply_response(&mut self, response: WorkerResponse) {
        let request = response.request();
        if !self.pending.remove(&request) {
            tracing::debug!(request, "Ignoring response to a forgotten request");
            return;
        }

        match response {
            WorkerResponse::Connected {
                connection,
                buckets,
                ..
            } => {
                tracing::info!(buckets = buckets.len(), "Connected");
                self.store.dispatch(Action::SetConnection(true));
                self.store.dispatch(Action::SetBuckets(buckets));
                self.store.dispatch(Action::SetError(None));
                self.ui.dialog = None;
                if let Err(e) = config::save_connection(self.storage.as_mut(), &connection) {
                    tracing::warn!("Connection not remembered: {}", e);
                }
                self.select_bucket(0);
                self.refresh_diagram_tables();
            }
            WorkerResponse::ConnectionFailed { message, .. } => {
                self.store.dispatch(Action::SetConnection(false));
                self.store.dispatch(Action::SetError(Some(message)));
                if self.ui.dialog.is_none() {
                    self.ui.dialog = Some(Dialog::Connect(ConnectForm::new(None)));
                }
            }
            WorkerResponse::TablesLoaded {
                bucket_id,
                tables,
                incomplete,
                ..
            } => {
                if self.state().selected_bucket_id() != Some(bucket_id.as_str()) {
                    tracing::debug!(%bucket_id, "Dropping tables of a bucket no longer selected");
                } else {
                    let total = tables.len();
                    self.store.dispatch(Action::SetTables(tables));
                    self.ui.table_index = 0;
                    let error = (!incomplete.is_empty()).then(|| {
                        format!(
                            "Some table details could not be loaded ({} of {} incomplete)",
                            incomplete.len(),
                            total
                        )
                    });
                    self.store.dispatch(Action::SetError(error));
                }
            }
            WorkerResponse::TableDetailLoaded { purpose, table, .. } => match purpose {
                DetailPurpose::AddToDiagram => {
                    self.ui.status = Some(format!("Added {} to the diagram", table.label()));
                    self.store.dispatch(Action::AddToDiagram(table));
                    self.sync_canvas();
                }
                DetailPurpose::Inspect => {
                    if self.state().selected_table_id() == Some(table.id.as_str()) {
                        self.store.dispatch(Action::SelectTable(Some(table)));
                    } else {
                        tracing::debug!(table_id = %table.id, "Dropping detail of a table no longer selected");
                    }
                }
                DetailPurpose::Refresh => {
                    if self.state().is_in_diagram(&table.id) {
                        self.store.dispatch(Action::AddToDiagram(table));
                        self.sync_canvas();
                    }
                }
            },
            WorkerResponse::Error { message, .. } => {
                self.store.dispatch(Action::SetError(Some(message)));
            }
        }

        if self.pending.is_empty() {
            self.store.dispatch(Action::SetLoading(false));
        }
    }

    fn handle_canvas_event(&mut self, event: CanvasEvent) {
        match event {
            CanvasEvent::NodeSelected(id) => self.inspect_table(&id),
            CanvasEvent::EdgeSelected(id) => {
                self.ui.selected_edge = Some(id);
                self.store.dispatch(Action::SelectTable(None));
            }
            CanvasEvent::SelectionCleared => {
                self.ui.selected_edge = None;
                self.store.dispatch(Action::SelectTable(None));
            }
            CanvasEvent::EdgeEditRequested(id) => self.edit_relationship(id),
            CanvasEvent::RelationshipRequested { source, target } => {
                if self.document.has_relationship(&source, &target) {
                    self.ui.status = Some("These tables are already related".to_string());
                    return;
                }
                self.ui.dialog = Some(Dialog::Relationship(RelationshipForm {
                    target: RelationshipTarget::Create { source, target },
                    kind: RelationKind::ParentChild,
                }));
            }
            CanvasEvent::NodeMoved { id, position } => {
                self.document.set_position(&id, position);
            }
        }
    }

    fn edit_relationship(&mut self, edge_id: String) {
        let Some(kind) = self.document.relationship(&edge_id).map(|r| r.kind) else {
            return;
        };
        self.ui.selected_edge = Some(edge_id.clone());
        self.ui.dialog = Some(Dialog::Relationship(RelationshipForm {
            target: RelationshipTarget::Edit { edge_id },
            kind,
        }));
    }

    fn confirm_relationship(&mut self, form: RelationshipForm) {
        match form.target {
            RelationshipTarget::Create { source, target } => {
                let relationship = Relationship::new(source, target, form.kind);
                if self.document.add_relationship(relationship.clone()) {
                    self.canvas.add_relationship(&relationship);
                    self.ui.status = Some(format!(
                        "Added {} relationship {} -> {}",
                        form.kind, relationship.from, relationship.to
                    ));
                }
            }
            RelationshipTarget::Edit { edge_id } => {
                if self.document.set_relationship_kind(&edge_id, form.kind) {
                    self.canvas.update_relationship(&edge_id, form.kind);
                }
            }
        }
    }

    pub fn delete_selected_relationship(&mut self) {
        let Some(edge_id) = self.ui.selected_edge.take() else {
            return;
        };
        if self.document.remove_relationship(&edge_id).is_some() {
            self.canvas.remove_relationship(&edge_id);
            self.ui.status = Some("Relationship removed".to_string());
        }
        self.canvas.clear_selection();
    }

    pub fn save_diagram(&mut self) {
        match persist::save(self.storage.as_mut(), &self.document) {
            Ok(()) => self.ui.status = Some("Diagram saved".to_string()),
            Err(e) => {
                tracing::error!("Save failed: {}", e);
                self.store
                    .dispatch(Action::SetError(Some(format!("Failed to save diagram: {}", e))));
            }
        }
    }

    pub fn load_diagram(&mut self) {
        match persist::load(self.storage.as_ref()) {
            Ok(Some(doc)) => {
                self.apply_document(doc);
                self.ui.status = Some("Diagram loaded".to_string());
            }
            Ok(None) => self.ui.status = Some("No saved diagram".to_string()),
            Err(e) => {
                tracing::error!("Load failed: {}", e);
                self.store
                    .dispatch(Action::SetError(Some(format!("Failed to load diagram: {}", e))));
            }
        }
    }

    pub fn export_diagram(&mut self) {
        match persist::export_to_file(&self.export_path, &self.document) {
            Ok(()) => {
                self.ui.status = Some(format!("Exported to {}", self.export_path.display()))
            }
            Err(e) => self
                .store
                .dispatch(Action::SetError(Some(format!("Export failed: {}", e)))),
        }
    }

    pub fn import_diagram(&mut self) {
        match persist::import_from_file(&self.export_path) {
            Ok(doc) => {
                self.apply_document(doc);
                self.ui.status = Some(format!("Imported {}", self.export_path.display()));
            }
            Err(e) => self
                .store
                .dispatch(Action::SetError(Some(format!("Import failed: {}", e)))),
        }
    }

    pub fn disconnect(&mut self) {
        if let Err(e) = config::forget_connection(self.storage.as_mut()) {
            tracing::warn!("Saved connection not cleared: {}", e);
        }
        self.pending.clear();
        self.store.dispatch(Action::Disconnect);
        self.ui.bucket_index = 0;
        self.ui.table_index = 0;
        self.ui.filter.clear();
        self.ui.focus = Focus::Buckets;
        self.ui.dialog = Some(Dialog::Connect(ConnectForm::new(None)));
        tracing::info!("Disconnected");
    }

    fn arrange_grid(&mut self) {
        for (id, position) in self.canvas.grid_layout() {
            self.document.set_position(&id, position);
        }
    }

    /// Handle a key event
    pub fn handle_key_event(&mut self, event: KeyEvent) {
        if self.ui.dialog.is_some() {
            self.handle_dialog_key(event);
            return;
        }

        if self.ui.show_help {
            if matches!(event.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                self.ui.show_help = false;
            }
            return;
        }

        if self.ui.filtering {
            match event.code {
                KeyCode::Esc => {
                    self.ui.filtering = false;
                    self.ui.filter.clear();
                }
                KeyCode::Enter => self.ui.filtering = false,
                _ => {
                    if self.ui.filter.handle_key(event) {
                        self.ui.table_index = 0;
                    }
                }
            }
            return;
        }

        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Char('q') if !ctrl => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('s') if ctrl => self.save_diagram(),
            KeyCode::Char('l') if ctrl => self.load_diagram(),
            KeyCode::Char('e') if ctrl => self.export_diagram(),
            KeyCode::Char('o') if ctrl => self.import_diagram(),
            KeyCode::Char('d') if ctrl => self.disconnect(),
            KeyCode::Char('?') => self.ui.show_help = true,
            KeyCode::Tab => self.ui.next_pane(),
            KeyCode::BackTab => self.ui.prev_pane(),
            KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => self.navigate(event.code),
            KeyCode::Enter => match self.ui.focus {
                Focus::Buckets => self.select_bucket(self.ui.bucket_index),
                Focus::Tables => {
                    if let Some(id) = self.cursor_table().map(|t| t.id.clone()) {
                        self.inspect_table(&id);
                    }
                }
                Focus::Canvas => {
                    if let Some(edge_id) = self.ui.selected_edge.clone() {
                        self.edit_relationship(edge_id);
                    }
                }
            },
            KeyCode::Char('a') => self.add_cursor_table(),
            KeyCode::Char('x') => {
                let target = match self.ui.focus {
                    Focus::Tables => self.cursor_table().map(|t| t.id.clone()),
                    _ => self.state().selected_table_id().map(str::to_string),
                };
                if let Some(id) = target {
                    self.remove_table(&id);
                }
            }
            KeyCode::Char('c') if !self.state().connected => {
                self.ui.dialog = Some(Dialog::Connect(ConnectForm::new(None)));
            }
            KeyCode::Char('/') => {
                self.ui.focus = Focus::Tables;
                self.ui.filtering = true;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.canvas.zoom_in(),
            KeyCode::Char('-') => self.canvas.zoom_out(),
            KeyCode::Char('f') => self.canvas.fit(),
            KeyCode::Char('g') => self.arrange_grid(),
            KeyCode::Delete => self.delete_selected_relationship(),
            KeyCode::Esc => {
                self.ui.status = None;
                self.store.dispatch(Action::SetError(None));
            }
            _ => {}
        }
    }

    fn navigate(&mut self, code: KeyCode) {
        let forward = matches!(code, KeyCode::Down | KeyCode::Right);
        match self.ui.focus {
            Focus::Buckets => {
                let len = self.state().buckets.len();
                self.ui.bucket_index = state::step_index(self.ui.bucket_index, len, forward);
            }
            Focus::Tables => {
                let len = self.filtered_tables().len();
                self.ui.table_index = state::step_index(self.ui.table_index, len, forward);
            }
            Focus::Canvas => {
                let (cols, rows) = match code {
                    KeyCode::Left => (-4, 0),
                    KeyCode::Right => (4, 0),
                    KeyCode::Up => (0, -2),
                    _ => (0, 2),
                };
                self.canvas.widget_mut().pan_by(cols, rows);
            }
        }
    }

    fn handle_dialog_key(&mut self, event: KeyEvent) {
        let Some(dialog) = self.ui.dialog.as_mut() else {
            return;
        };

        match dialog {
            Dialog::Connect(form) => match event.code {
                KeyCode::Esc => self.ui.dialog = None,
                KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                    form.toggle_field()
                }
                KeyCode::Enter => match form.connection() {
                    Some(connection) => self.connect(connection),
                    None => self.store.dispatch(Action::SetError(Some(
                        "API token and instance URL are required".to_string(),
                    ))),
                },
                _ => {
                    form.active_input().handle_key(event);
                }
            },
            Dialog::Relationship(form) => match event.code {
                KeyCode::Esc => self.ui.dialog = None,
                KeyCode::Char('1') => form.kind = RelationKind::ParentChild,
                KeyCode::Char('2') => form.kind = RelationKind::ManyToMany,
                KeyCode::Tab
                | KeyCode::BackTab
                | KeyCode::Up
                | KeyCode::Down
                | KeyCode::Left
                | KeyCode::Right
                | KeyCode::Char(' ') => form.toggle_kind(),
                KeyCode::Enter => {
                    let form = form.clone();
                    self.ui.dialog = None;
                    self.confirm_relationship(form);
                }
                _ => {}
            },
        }
    }

    /// Handle a mouse event over the canvas
    pub fn handle_mouse_event(&mut self, event: MouseEvent) {
        if self.ui.dialog.is_some() || self.ui.show_help {
            return;
        }

        let area = self.ui.canvas_area;
        let inside = event.column >= area.x
            && event.column < area.right()
            && event.row >= area.y
            && event.row < area.bottom();

        let (kind, button) = match event.kind {
            MouseEventKind::Down(button) if inside => (PointerKind::Down, button),
            MouseEventKind::Drag(button) if inside => (PointerKind::Move, button),
            MouseEventKind::Up(button) if inside => (PointerKind::Up, button),
            MouseEventKind::Up(_) => {
                if let Some(canvas_event) = self.canvas.cancel_pointer() {
                    self.handle_canvas_event(canvas_event);
                }
                return;
            }
            MouseEventKind::ScrollUp if inside => return self.canvas.zoom_in(),
            MouseEventKind::ScrollDown if inside => return self.canvas.zoom_out(),
            _ => return,
        };
        let button = match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Middle => return,
        };
        if kind == PointerKind::Down {
            self.ui.focus = Focus::Canvas;
        }

        let col = event.column.saturating_sub(area.x);
        let row = event.row.saturating_sub(area.y);
        let point = self.canvas.widget().cell_to_canvas(col, row);
        let pointer = PointerEvent::new(kind, button, point, Instant::now())
            .with_link_modifier(event.modifiers.contains(KeyModifiers::SHIFT));

        if let Some(canvas_event) = self.canvas.handle_pointer(pointer) {
            self.handle_canvas_event(canvas_event);
        }
    }

    /// Shutdown the application
    pub fn shutdown(self) -> anyhow::Result<()> {
        self.worker.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::{Bucket, Column, Position};

    fn app_with(storage: MemoryStorage) -> App {
        let dir = std::env::temp_dir().join("bdm-app-tests-export.json");
        App::new(Worker::new().unwrap(), Box::new(storage), dir)
    }

    fn app() -> App {
        app_with(MemoryStorage::new())
    }

    fn bucket(id: &str) -> Bucket {
        Bucket {
            id: id.to_string(),
            name: id.to_string(),
            stage: "in".to_string(),
            description: None,
        }
    }

    fn table(id: &str, columns: &[&str]) -> Table {
        let mut table = Table::new(id, id);
        for name in columns {
            table.columns.push(Column {
                name: name.to_string(),
                data_type: "STRING".to_string(),
                nullable: true,
                length: None,
                base_type: "STRING".to_string(),
            });
        }
        table
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// Request id the next `send` will use
    fn last_request(app: &App) -> RequestId {
        app.next_request - 1
    }

    /// Connect to an unreachable URL and answer the request by hand
    fn connected(buckets: Vec<Bucket>) -> App {
        let mut app = app();
        app.connect(Connection::new("token", "http://127.0.0.1:9"));
        let request = last_request(&app);
        app.apply_response(WorkerResponse::Connected {
            request,
            connection: Connection::new("token", "http://127.0.0.1:9"),
            buckets,
        });
        app
    }

    fn load_tables(app: &mut App, bucket_id: &str, tables: Vec<Table>) {
        let request = last_request(app);
        app.apply_response(WorkerResponse::TablesLoaded {
            request,
            bucket_id: bucket_id.to_string(),
            tables,
            incomplete: Vec::new(),
        });
    }

    fn add(app: &mut App, table: Table) {
        app.request_detail(table.id.clone(), DetailPurpose::AddToDiagram);
        let request = last_request(app);
        app.apply_response(WorkerResponse::TableDetailLoaded {
            request,
            purpose: DetailPurpose::AddToDiagram,
            table,
        });
    }

    fn relate(app: &mut App, source: &str, target: &str) {
        app.handle_canvas_event(CanvasEvent::RelationshipRequested {
            source: source.to_string(),
            target: target.to_string(),
        });
        app.handle_key_event(key(KeyCode::Enter));
    }

    #[test]
    fn connect_selects_first_bucket_and_remembers_credential() {
        let app = connected(vec![bucket("in.c-a"), bucket("in.c-b")]);
        let state = app.state();
        assert!(state.connected);
        assert_eq!(state.selected_bucket_id(), Some("in.c-a"));
        // Tables request for the first bucket is in flight
        assert!(state.loading);
        assert!(app.ui.dialog.is_none());
        assert!(config::load_connection(app.storage.as_ref()).unwrap().is_some());
    }

    #[test]
    fn failed_connect_clears_loading_and_reports() {
        let mut app = app();
        app.connect(Connection::new("bad", "http://127.0.0.1:9"));
        assert!(app.state().loading);
        let request = last_request(&app);
        app.apply_response(WorkerResponse::ConnectionFailed {
            request,
            message: "Connection failed".to_string(),
        });

        assert!(!app.state().loading);
        assert!(!app.state().connected);
        assert_eq!(app.state().error.as_deref(), Some("Connection failed"));
        assert!(matches!(app.ui.dialog, Some(Dialog::Connect(_))));
    }

    #[test]
    fn late_tables_for_another_bucket_are_dropped() {
        let mut app = connected(vec![bucket("in.c-a"), bucket("in.c-b")]);
        let first = last_request(&app);
        app.select_bucket(1);

        app.apply_response(WorkerResponse::TablesLoaded {
            request: first,
            bucket_id: "in.c-a".to_string(),
            tables: vec![table("in.c-a.t", &["id"])],
            incomplete: Vec::new(),
        });
        assert!(app.state().tables.is_empty());
        assert!(app.state().loading);

        load_tables(&mut app, "in.c-b", vec![table("in.c-b.t", &["id"])]);
        assert_eq!(app.state().tables.len(), 1);
        assert!(!app.state().loading);
    }

    #[test]
    fn partial_fetch_is_reported() {
        let mut app = connected(vec![bucket("in.c-a")]);
        let request = last_request(&app);
        app.apply_response(WorkerResponse::TablesLoaded {
            request,
            bucket_id: "in.c-a".to_string(),
            tables: vec![table("t1", &["id"]), table("t2", &[])],
            incomplete: vec!["t2".to_string()],
        });
        assert_eq!(app.state().tables.len(), 2);
        assert!(app.state().error.as_deref().unwrap().contains("1 of 2"));
    }

    #[test]
    fn worker_error_releases_loading() {
        let mut app = connected(vec![bucket("in.c-a")]);
        let request = last_request(&app);
        app.apply_response(WorkerResponse::Error {
            request,
            message: "Failed to load tables".to_string(),
        });
        assert!(!app.state().loading);
        assert!(app.state().error.is_some());
    }

    #[test]
    fn add_relate_and_remove_keeps_canvas_and_document_in_step() {
        let mut app = connected(vec![bucket("B1")]);
        load_tables(&mut app, "B1", vec![table("T1", &["id"]), table("T2", &["id", "t1_id"])]);
        add(&mut app, table("T1", &["id"]));
        add(&mut app, table("T2", &["id", "t1_id"]));

        relate(&mut app, "T1", "T2");
        assert_eq!(app.document().relationships.len(), 1);
        let edges = app.scene().edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].label, "Parent-Child");

        // Same ordered pair again does nothing
        relate(&mut app, "T1", "T2");
        assert!(app.ui.dialog.is_none());
        assert_eq!(app.scene().edges().len(), 1);

        app.remove_table("T1");
        assert_eq!(app.scene().node_ids(), vec!["T2".to_string()]);
        assert!(app.scene().edges().is_empty());
        assert!(app.document().relationships.is_empty());
        assert_eq!(app.document().tables.len(), 1);
    }

    #[test]
    fn refreshed_detail_keeps_dragged_position() {
        let mut app = connected(vec![bucket("B1")]);
        add(&mut app, table("T1", &["id"]));
        let p = Position::new(321.0, 654.0);
        app.canvas.drag_release("T1", p);
        app.handle_canvas_event(CanvasEvent::NodeMoved {
            id: "T1".to_string(),
            position: p,
        });

        add(&mut app, table("T1", &["id", "name"]));
        assert_eq!(app.state().bdm_tables.len(), 1);
        assert_eq!(app.scene().node_position("T1"), Some(p));
        assert_eq!(app.document().node("T1").unwrap().position, p);
        assert_eq!(app.document().node("T1").unwrap().properties.len(), 2);
    }

    #[test]
    fn relationship_kind_can_be_edited_and_deleted() {
        let mut app = connected(vec![bucket("B1")]);
        add(&mut app, table("A", &["id"]));
        add(&mut app, table("B", &["id"]));
        relate(&mut app, "A", "B");
        let edge_id = app.document().relationships[0].edge_id();

        app.handle_canvas_event(CanvasEvent::EdgeEditRequested(edge_id.clone()));
        app.handle_key_event(key(KeyCode::Char('2')));
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.document().relationships[0].kind, RelationKind::ManyToMany);
        assert_eq!(app.scene().edges()[0].label, "M:N");
        assert_eq!(app.document().relationships[0].edge_id(), edge_id);

        app.handle_canvas_event(CanvasEvent::EdgeSelected(edge_id));
        app.handle_key_event(key(KeyCode::Delete));
        assert!(app.document().relationships.is_empty());
        assert!(app.scene().edges().is_empty());
    }

    #[test]
    fn cancelled_relationship_dialog_adds_nothing() {
        let mut app = connected(vec![bucket("B1")]);
        add(&mut app, table("A", &["id"]));
        add(&mut app, table("B", &["id"]));
        app.handle_canvas_event(CanvasEvent::RelationshipRequested {
            source: "A".to_string(),
            target: "B".to_string(),
        });
        app.handle_key_event(key(KeyCode::Esc));
        assert!(app.document().relationships.is_empty());
        assert!(app.scene().edges().is_empty());
    }

    #[test]
    fn save_then_load_restores_diagram() {
        let mut app = connected(vec![bucket("B1")]);
        add(&mut app, table("A", &["id"]));
        add(&mut app, table("B", &["id"]));
        relate(&mut app, "A", "B");
        app.canvas.drag_release("A", Position::new(10.0, 20.0));
        app.handle_canvas_event(CanvasEvent::NodeMoved {
            id: "A".to_string(),
            position: Position::new(10.0, 20.0),
        });
        app.save_diagram();
        let saved = app.document().clone();

        app.remove_table("A");
        app.load_diagram();
        assert_eq!(app.document(), &saved);
        assert_eq!(app.state().bdm_tables.len(), 2);
        assert_eq!(app.scene().node_position("A"), Some(Position::new(10.0, 20.0)));
        assert_eq!(app.scene().edges().len(), 1);
    }

    #[test]
    fn failed_save_reports_and_keeps_document() {
        let mut app = app_with(MemoryStorage::unavailable());
        add(&mut app, table("A", &["id"]));
        let before = app.document().clone();

        app.save_diagram();
        assert!(app.state().error.as_deref().unwrap().starts_with("Failed to save"));
        assert_eq!(app.document(), &before);
    }

    #[test]
    fn import_failure_leaves_diagram_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut app = App::new(Worker::new().unwrap(), Box::new(MemoryStorage::new()), path);
        add(&mut app, table("A", &["id"]));
        let before = app.document().clone();
        app.import_diagram();
        assert!(app.state().error.as_deref().unwrap().starts_with("Import failed"));
        assert_eq!(app.document(), &before);
        assert_eq!(app.scene().node_ids(), vec!["A".to_string()]);
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// A under terminal cell (40, 5), B under the canvas's left column at row 12
    fn canvas_beside_browser() -> App {
        let mut app = connected(vec![bucket("B1")]);
        add(&mut app, table("A", &["id"]));
        add(&mut app, table("B", &["id"]));
        app.set_canvas_area(Rect::new(30, 0, 80, 24));
        app.canvas.drag_release("A", Position::new(84.0, 88.0));
        app.canvas.drag_release("B", Position::new(4.0, 200.0));
        app
    }

    #[test]
    fn relationship_drag_released_outside_canvas_is_abandoned() {
        let mut app = canvas_beside_browser();

        app.handle_mouse_event(mouse(MouseEventKind::Down(MouseButton::Right), 40, 5));
        app.handle_mouse_event(mouse(MouseEventKind::Drag(MouseButton::Right), 5, 12));
        app.handle_mouse_event(mouse(MouseEventKind::Up(MouseButton::Right), 5, 12));
        assert!(app.ui.dialog.is_none());
        assert!(!app.scene().is_link_mark("A") && !app.scene().is_link_mark("B"));

        // Released over B on the canvas's left column it does connect
        app.handle_mouse_event(mouse(MouseEventKind::Down(MouseButton::Right), 40, 5));
        app.handle_mouse_event(mouse(MouseEventKind::Drag(MouseButton::Right), 30, 12));
        app.handle_mouse_event(mouse(MouseEventKind::Up(MouseButton::Right), 30, 12));
        match &app.ui.dialog {
            Some(Dialog::Relationship(form)) => assert_eq!(
                form.target,
                RelationshipTarget::Create {
                    source: "A".to_string(),
                    target: "B".to_string(),
                }
            ),
            other => panic!("expected relationship dialog, got {:?}", other),
        }
    }

    #[test]
    fn node_drag_released_outside_canvas_keeps_last_position() {
        let mut app = canvas_beside_browser();

        app.handle_mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), 40, 5));
        app.handle_mouse_event(mouse(MouseEventKind::Drag(MouseButton::Left), 60, 5));
        app.handle_mouse_event(mouse(MouseEventKind::Drag(MouseButton::Left), 5, 5));
        app.handle_mouse_event(mouse(MouseEventKind::Up(MouseButton::Left), 5, 5));

        let dropped = Position::new(244.0, 88.0);
        assert_eq!(app.scene().node_position("A"), Some(dropped));
        assert_eq!(app.document().positions().get("A"), Some(&dropped));
        assert!(app.ui.dialog.is_none());
    }

    #[test]
    fn stale_inspect_detail_is_dropped() {
        let mut app = connected(vec![bucket("B1")]);
        load_tables(&mut app, "B1", vec![table("T1", &["id"]), table("T2", &["id"])]);

        app.inspect_table("T1");
        let first = last_request(&app);
        app.inspect_table("T2");
        app.apply_response(WorkerResponse::TableDetailLoaded {
            request: first,
            purpose: DetailPurpose::Inspect,
            table: table("T1", &["id", "extra"]),
        });
        assert_eq!(app.state().selected_table_id(), Some("T2"));
    }

    #[test]
    fn disconnect_keeps_diagram() {
        let mut app = connected(vec![bucket("B1")]);
        add(&mut app, table("A", &["id"]));
        app.handle_key_event(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));

        let state = app.state();
        assert!(!state.connected);
        assert!(state.buckets.is_empty());
        assert_eq!(state.bdm_tables.len(), 1);
        assert!(config::load_connection(app.storage.as_ref()).unwrap().is_none());
        assert!(matches!(app.ui.dialog, Some(Dialog::Connect(_))));
    }

    #[test]
    fn filter_narrows_tables_pane() {
        let mut app = connected(vec![bucket("B1")]);
        load_tables(&mut app, "B1", vec![table("orders", &[]), table("users", &[])]);
        app.handle_key_event(key(KeyCode::Char('/')));
        for c in "use".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.filtered_tables().len(), 1);
        assert_eq!(app.cursor_table().unwrap().id, "users");
    }
}
