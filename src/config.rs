use crate::storage::{Storage, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Instance URL offered in the connect dialog
pub const DEFAULT_INSTANCE_URL: &str = "https://connection.north-europe.azure.keboola.com";

/// Storage slot holding the last successful connection
pub const CONNECTION_SLOT: &str = "bdm-connection";

const APP_DIR: &str = "bdm-designer";
const STORAGE_FILE: &str = "bdm.sqlite3";
pub const LOG_FILE: &str = "bdm.log";

/// Credential and endpoint for the storage API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub api_token: String,
    pub instance_url: String,
}

impl Connection {
    pub fn new(api_token: impl Into<String>, instance_url: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            instance_url: instance_url.into(),
        }
    }

    /// Instance URL without trailing slashes, ready for path joins
    pub fn base_url(&self) -> &str {
        self.instance_url.trim_end_matches('/')
    }
}

// Keep the token out of logs
impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("api_token", &"<redacted>")
            .field("instance_url", &self.instance_url)
            .finish()
    }
}

/// Runtime settings resolved from the command line
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub export_path: PathBuf,
    pub reconnect: bool,
    pub connection: Option<Connection>,
}

impl Settings {
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE)
    }
}

/// Per-user data directory, falling back to the working directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Remember a connection for auto-reconnect on the next start
pub fn save_connection(storage: &mut dyn Storage, connection: &Connection) -> Result<(), StorageError> {
    let json = serde_json::to_string(connection)
        .map_err(|e| StorageError::Unavailable(format!("cannot encode connection: {}", e)))?;
    storage.set(CONNECTION_SLOT, &json)
}

/// Saved connection, if any. A corrupt slot is treated as absent.
pub fn load_connection(storage: &dyn Storage) -> Result<Option<Connection>, StorageError> {
    let Some(json) = storage.get(CONNECTION_SLOT)? else {
        return Ok(None);
    };
    match serde_json::from_str(&json) {
        Ok(connection) => Ok(Some(connection)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable saved connection: {}", e);
            Ok(None)
        }
    }
}

pub fn forget_connection(storage: &mut dyn Storage) -> Result<(), StorageError> {
    storage.remove(CONNECTION_SLOT)
}
