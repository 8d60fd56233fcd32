use super::BdmDocument;
use crate::storage::{Storage, StorageError};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage slot holding the saved diagram
pub const DIAGRAM_SLOT: &str = "bdm-state";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Diagram is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Diagram is inconsistent: {0}")]
    Invalid(String),
    #[error("Cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write the document to the diagram slot
pub fn save(storage: &mut dyn Storage, doc: &BdmDocument) -> Result<(), PersistError> {
    let json = serde_json::to_string(doc)?;
    storage.set(DIAGRAM_SLOT, &json)?;
    tracing::info!(
        tables = doc.tables.len(),
        relationships = doc.relationships.len(),
        "Diagram saved"
    );
    Ok(())
}

/// Read the saved document; `Ok(None)` when nothing was saved yet
pub fn load(storage: &dyn Storage) -> Result<Option<BdmDocument>, PersistError> {
    match storage.get(DIAGRAM_SLOT)? {
        Some(json) => import(&json).map(Some),
        None => Ok(None),
    }
}

/// Pretty-printed document for download
pub fn export(doc: &BdmDocument) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Parse and validate a document. Callers replace their state only on `Ok`.
pub fn import(text: &str) -> Result<BdmDocument, PersistError> {
    let doc: BdmDocument = serde_json::from_str(text)?;
    validate(&doc)?;
    Ok(doc)
}

pub fn export_to_file(path: &Path, doc: &BdmDocument) -> Result<(), PersistError> {
    let json = export(doc)?;
    fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Diagram exported");
    Ok(())
}

pub fn import_from_file(path: &Path) -> Result<BdmDocument, PersistError> {
    let text = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    import(&text)
}

fn validate(doc: &BdmDocument) -> Result<(), PersistError> {
    let mut ids = HashSet::new();
    for node in &doc.tables {
        if !ids.insert(node.id.as_str()) {
            return Err(PersistError::Invalid(format!("table '{}' appears twice", node.id)));
        }
    }

    let mut pairs = HashSet::new();
    for rel in &doc.relationships {
        for end in [&rel.from, &rel.to] {
            if !ids.contains(end.as_str()) {
                return Err(PersistError::Invalid(format!(
                    "relationship references unknown table '{}'",
                    end
                )));
            }
        }
        if !pairs.insert((rel.from.as_str(), rel.to.as_str())) {
            return Err(PersistError::Invalid(format!(
                "duplicate relationship {} -> {}",
                rel.from, rel.to
            )));
        }
    }
    Ok(())
}
