mod error;
mod sqlite;

use std::collections::HashMap;
use thiserror::Error;

pub use sqlite::SqliteStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage quota exceeded while writing '{slot}'")]
    QuotaExceeded { slot: String },
    #[error("{0}")]
    Sqlite(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Sqlite(error::format_storage_error(&err))
    }
}

/// Named-slot text storage, the local persistence boundary
pub trait Storage {
    /// Read a slot; `None` if it was never written
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError>;
    /// Write a slot, replacing any previous value
    fn set(&mut self, slot: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, slot: &str) -> Result<(), StorageError>;
}

/// In-process storage with an optional size quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: HashMap<String, String>,
    quota: Option<usize>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes larger than `bytes`
    #[cfg(test)]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Storage that fails every operation
    #[cfg(test)]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable {
            Err(StorageError::Unavailable("storage is disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.slots.get(slot).cloned())
    }

    fn set(&mut self, slot: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        if self.quota.is_some_and(|quota| value.len() > quota) {
            return Err(StorageError::QuotaExceeded {
                slot: slot.to_string(),
            });
        }
        self.slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> Result<(), StorageError> {
        self.check()?;
        self.slots.remove(slot);
        Ok(())
    }
}
