use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key the storage service uses for human-written descriptions
pub const DESCRIPTION_KEY: &str = "KBC.description";

/// A named grouping of tables in remote storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Bucket {
    /// Secondary line shown under the bucket name
    pub fn subtitle(&self) -> &str {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => description,
            _ => &self.stage,
        }
    }
}

/// A key/value metadata entry attached to a table or column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Normalized column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub length: Option<String>,
    pub base_type: String,
}

impl Column {
    /// Human readable type, e.g. `VARCHAR (255) [STRING], Nullable`
    pub fn type_label(&self) -> String {
        let mut label = self.data_type.clone();
        if let Some(length) = self.length.as_deref().filter(|l| !l.is_empty()) {
            label.push_str(&format!(" ({})", length));
        }
        if !self.base_type.is_empty() && self.base_type != self.data_type {
            label.push_str(&format!(" [{}]", self.base_type));
        }
        if self.nullable {
            label.push_str(", Nullable");
        }
        label
    }
}

/// A table snapshot fetched from remote storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub metadata: Vec<MetadataEntry>,
    pub column_metadata: BTreeMap<String, Vec<MetadataEntry>>,
}

impl Table {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
            metadata: Vec::new(),
            column_metadata: BTreeMap::new(),
        }
    }

    /// Label shown on the canvas and in lists
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(display) if !display.is_empty() => display,
            _ => &self.name,
        }
    }

    /// Copy of this table with column detail stripped, used when a detail fetch fails
    pub fn degraded(&self) -> Self {
        Self {
            columns: Vec::new(),
            column_metadata: BTreeMap::new(),
            ..self.clone()
        }
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }

    /// Table-level description, if any
    pub fn description(&self) -> Option<&str> {
        find_value(&self.metadata, DESCRIPTION_KEY)
    }

    /// Column-level description, if any
    pub fn column_description(&self, column: &str) -> Option<&str> {
        self.column_metadata
            .get(column)
            .and_then(|entries| find_value(entries, DESCRIPTION_KEY))
    }

    /// Case-insensitive match over name and display name
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self
                .display_name
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}

fn find_value<'a>(entries: &'a [MetadataEntry], key: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| entry.value.as_str())
}
