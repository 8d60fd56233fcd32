//! Shapes returned by the storage API and their normalization into [`Table`].
//!
//! Column detail arrives in two forms. Table detail responses nest it under
//! `definition.columns`, each column carrying its own `definition` object.
//! Listings (and older instances) put `columns` at the root, either as plain
//! names or as flat objects. Both are folded into [`Column`] with defaults for
//! anything missing: type `STRING`, nullable `true`, base type equal to the type.

use crate::types::{Bucket, Column, MetadataEntry, Table};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

const DEFAULT_TYPE: &str = "STRING";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTable {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    primary_key: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    columns: Vec<RawColumn>,
    #[serde(default)]
    definition: Option<RawTableDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    metadata: Vec<MetadataEntry>,
    #[serde(default, deserialize_with = "metadata_map")]
    column_metadata: BTreeMap<String, Vec<MetadataEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTableDefinition {
    #[serde(default, deserialize_with = "null_as_default")]
    primary_keys_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    columns: Vec<RawColumn>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawColumn {
    Name(String),
    Detailed(RawColumnDetail),
}

#[derive(Debug, Default, Deserialize)]
struct RawColumnDetail {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    data_type: Option<String>,
    #[serde(default)]
    nullable: Option<bool>,
    #[serde(default)]
    length: Option<Value>,
    #[serde(default)]
    basetype: Option<String>,
    #[serde(default)]
    definition: Option<RawColumnDefinition>,
}

#[derive(Debug, Default, Deserialize)]
struct RawColumnDefinition {
    #[serde(rename = "type", default)]
    data_type: Option<String>,
    #[serde(default)]
    nullable: Option<bool>,
    #[serde(default)]
    length: Option<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// An empty column metadata map is serialized as `[]` by the API
fn metadata_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<MetadataEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(column, entries)| {
                serde_json::from_value::<Vec<MetadataEntry>>(entries)
                    .ok()
                    .map(|entries| (column, entries))
            })
            .collect()),
        _ => Ok(BTreeMap::new()),
    }
}

fn length_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&String>) -> Option<&String> {
    value.filter(|s| !s.is_empty())
}

impl RawColumn {
    fn normalize(self) -> Column {
        match self {
            RawColumn::Name(name) => Column {
                name,
                data_type: DEFAULT_TYPE.to_string(),
                nullable: true,
                length: None,
                base_type: DEFAULT_TYPE.to_string(),
            },
            RawColumn::Detailed(detail) => {
                let nested = detail.definition.unwrap_or_default();
                let data_type = non_empty(nested.data_type.as_ref())
                    .or(non_empty(detail.data_type.as_ref()))
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_TYPE.to_string());
                let base_type = non_empty(detail.basetype.as_ref())
                    .cloned()
                    .unwrap_or_else(|| data_type.clone());
                Column {
                    name: detail.name,
                    nullable: nested.nullable.or(detail.nullable).unwrap_or(true),
                    length: length_text(nested.length.as_ref())
                        .or_else(|| length_text(detail.length.as_ref())),
                    data_type,
                    base_type,
                }
            }
        }
    }
}

impl RawTable {
    pub(crate) fn normalize(self) -> Table {
        let definition = self.definition.unwrap_or_default();

        // Nested definition wins when it carries columns
        let raw_columns = if definition.columns.is_empty() {
            self.columns
        } else {
            definition.columns
        };
        let primary_key = if self.primary_key.is_empty() {
            definition.primary_keys_names
        } else {
            self.primary_key
        };

        Table {
            id: self.id,
            name: self.name,
            display_name: self.display_name,
            columns: raw_columns.into_iter().map(RawColumn::normalize).collect(),
            primary_key,
            metadata: self.metadata,
            column_metadata: self.column_metadata,
        }
    }
}

/// Decode a table list response
pub fn tables_from_value(value: Value) -> Result<Vec<Table>, serde_json::Error> {
    let raw: Vec<RawTable> = serde_json::from_value(value)?;
    Ok(raw.into_iter().map(RawTable::normalize).collect())
}

/// Decode a single table detail response
pub fn table_from_value(value: Value) -> Result<Table, serde_json::Error> {
    let raw: RawTable = serde_json::from_value(value)?;
    Ok(raw.normalize())
}

/// Decode a bucket list response
pub fn buckets_from_value(value: Value) -> Result<Vec<Bucket>, serde_json::Error> {
    serde_json::from_value(value)
}
