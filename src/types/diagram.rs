use crate::types::{Column, MetadataEntry, Table, DESCRIPTION_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the canvas, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Relationship kind drawn between two tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "Parent-Child")]
    ParentChild,
    #[serde(rename = "M:N")]
    ManyToMany,
}

impl RelationKind {
    pub const ALL: [RelationKind; 2] = [RelationKind::ParentChild, RelationKind::ManyToMany];

    /// Edge label and serialized form
    pub fn label(&self) -> &'static str {
        match self {
            RelationKind::ParentChild => "Parent-Child",
            RelationKind::ManyToMany => "M:N",
        }
    }

    /// Longer name used in the relationship dialog
    pub fn description(&self) -> &'static str {
        match self {
            RelationKind::ParentChild => "Parent-Child",
            RelationKind::ManyToMany => "Many-to-Many",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Simple property descriptor derived from a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// A table placed on the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: String,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl DiagramNode {
    pub fn from_table(table: &Table, position: Position) -> Self {
        Self {
            id: table.id.clone(),
            name: table.label().to_string(),
            position,
            properties: properties_of(table),
        }
    }

    /// Rebuild a table snapshot from a stored node, for diagrams loaded without a connection
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(self.id.clone(), self.name.clone());
        for property in &self.properties {
            table.columns.push(Column {
                name: property.name.clone(),
                data_type: property.data_type.clone(),
                nullable: true,
                length: None,
                base_type: property.data_type.clone(),
            });
            if let Some(comments) = &property.comments {
                table.column_metadata.insert(
                    property.name.clone(),
                    vec![MetadataEntry {
                        key: DESCRIPTION_KEY.to_string(),
                        value: comments.clone(),
                    }],
                );
            }
        }
        table
    }
}

/// Property descriptors for every column of a table
pub fn properties_of(table: &Table) -> Vec<Property> {
    table
        .columns
        .iter()
        .map(|col| Property {
            name: col.name.clone(),
            data_type: col.data_type.clone(),
            comments: table.column_description(&col.name).map(str::to_string),
        })
        .collect()
}

/// Directed relationship between two diagram tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl Relationship {
    /// New relationship with its identifier derived from the endpoints and kind
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: RelationKind) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            id: Some(derive_edge_id(&from, &to, kind)),
            from,
            to,
            kind,
            comments: None,
        }
    }

    /// Explicit identifier, or the derived one for documents that omit it
    pub fn edge_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| derive_edge_id(&self.from, &self.to, self.kind))
    }

    pub fn connects(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }
}

pub fn derive_edge_id(from: &str, to: &str, kind: RelationKind) -> String {
    format!("{}-{}-{}", from, to, kind.label())
}
