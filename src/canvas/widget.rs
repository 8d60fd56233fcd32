use crate::types::{Position, Table};

/// Column line shown inside a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeColumn {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
}

/// Data carried by a rendered node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: String,
    pub label: String,
    pub columns: Vec<NodeColumn>,
}

impl NodeData {
    pub fn from_table(table: &Table) -> Self {
        Self {
            id: table.id.clone(),
            label: table.label().to_string(),
            columns: table
                .columns
                .iter()
                .map(|col| NodeColumn {
                    name: col.name.clone(),
                    data_type: col.data_type.clone(),
                    primary_key: table.is_primary_key(&col.name),
                })
                .collect(),
        }
    }
}

/// Data carried by a rendered edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Element currently highlighted as selected
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(String),
    Edge(String),
}

/// Operations the canvas adapter needs from a graph renderer
pub trait GraphWidget {
    fn node_ids(&self) -> Vec<String>;
    fn node(&self, id: &str) -> Option<&NodeData>;
    fn add_node(&mut self, node: NodeData, position: Position);
    /// Replace a node's data, leaving its position alone
    fn update_node(&mut self, node: NodeData);
    fn remove_node(&mut self, id: &str);
    fn node_position(&self, id: &str) -> Option<Position>;
    fn set_node_position(&mut self, id: &str, position: Position);

    fn edges(&self) -> Vec<EdgeData>;
    fn add_edge(&mut self, edge: EdgeData);
    fn set_edge_label(&mut self, id: &str, label: &str) -> bool;
    fn remove_edge(&mut self, id: &str) -> bool;

    /// Topmost node under a canvas point
    fn node_at(&self, point: Position) -> Option<String>;
    /// Edge passing near a canvas point
    fn edge_at(&self, point: Position) -> Option<String>;

    fn zoom(&self) -> f64;
    /// Set the zoom level; the widget clamps it to what it can render
    fn set_zoom(&mut self, zoom: f64);
    fn fit(&mut self);
    /// Arrange all nodes in a grid and return their new positions
    fn grid_layout(&mut self) -> Vec<(String, Position)>;

    fn set_selection(&mut self, selection: Selection);
    /// Nodes highlighted during a relationship drag
    fn set_link_marks(&mut self, source: Option<String>, target: Option<String>);
}
