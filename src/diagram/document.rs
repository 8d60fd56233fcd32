use crate::types::{DiagramNode, Position, RelationKind, Relationship, Table};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_BDM_NAME: &str = "New BDM";

/// The persisted Business Data Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BdmDocument {
    #[serde(rename = "bdmName")]
    pub name: String,
    #[serde(default)]
    pub tables: Vec<DiagramNode>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Default for BdmDocument {
    fn default() -> Self {
        Self::new(DEFAULT_BDM_NAME)
    }
}

impl BdmDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn node(&self, table_id: &str) -> Option<&DiagramNode> {
        self.tables.iter().find(|n| n.id == table_id)
    }

    pub fn positions(&self) -> HashMap<String, Position> {
        self.tables
            .iter()
            .map(|n| (n.id.clone(), n.position))
            .collect()
    }

    /// Mirror the diagram's tables, in order, using the canvas positions.
    ///
    /// Nodes whose table is gone are dropped along with their relationships;
    /// the ids of removed relationships are returned.
    pub fn sync_nodes(&mut self, tables: &[Table], positions: &HashMap<String, Position>) -> Vec<String> {
        let previous: HashMap<String, Position> = self.positions();
        self.tables = tables
            .iter()
            .map(|table| {
                let position = positions
                    .get(&table.id)
                    .or_else(|| previous.get(&table.id))
                    .copied()
                    .unwrap_or_default();
                DiagramNode::from_table(table, position)
            })
            .collect();

        let present: HashSet<&str> = self.tables.iter().map(|n| n.id.as_str()).collect();
        let mut removed = Vec::new();
        self.relationships.retain(|rel| {
            let keep = present.contains(rel.from.as_str()) && present.contains(rel.to.as_str());
            if !keep {
                removed.push(rel.edge_id());
            }
            keep
        });
        removed
    }

    pub fn set_position(&mut self, table_id: &str, position: Position) -> bool {
        match self.tables.iter_mut().find(|n| n.id == table_id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    pub fn has_relationship(&self, from: &str, to: &str) -> bool {
        self.relationships.iter().any(|rel| rel.connects(from, to))
    }

    /// Add a relationship unless one already exists for the same ordered pair
    pub fn add_relationship(&mut self, relationship: Relationship) -> bool {
        if self.has_relationship(&relationship.from, &relationship.to) {
            return false;
        }
        self.relationships.push(relationship);
        true
    }

    pub fn relationship(&self, edge_id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| rel.edge_id() == edge_id)
    }

    /// Change a relationship's kind; its identifier stays the same
    pub fn set_relationship_kind(&mut self, edge_id: &str, kind: RelationKind) -> bool {
        match self
            .relationships
            .iter_mut()
            .find(|rel| rel.edge_id() == edge_id)
        {
            Some(rel) => {
                rel.id = Some(rel.edge_id());
                rel.kind = kind;
                true
            }
            None => false,
        }
    }

    pub fn remove_relationship(&mut self, edge_id: &str) -> Option<Relationship> {
        let index = self
            .relationships
            .iter()
            .position(|rel| rel.edge_id() == edge_id)?;
        Some(self.relationships.remove(index))
    }

    /// Table snapshots for every node, used when no live detail is available
    pub fn tables(&self) -> Vec<Table> {
        self.tables.iter().map(DiagramNode::to_table).collect()
    }
}
