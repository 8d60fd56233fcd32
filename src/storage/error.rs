/// User-friendly SQLite error formatting for the storage file
pub fn format_storage_error(error: &rusqlite::Error) -> String {
    match error {
        rusqlite::Error::SqliteFailure(err, msg) => {
            format_sqlite_failure(err.extended_code, msg.as_deref())
        }
        rusqlite::Error::InvalidColumnType(_, name, actual) => {
            format!("Storage is corrupt: slot column '{}' holds {}", name, actual)
        }
        _ => format!("Storage error: {}", error),
    }
}

fn format_sqlite_failure(code: i32, message: Option<&str>) -> String {
    let detail = message.unwrap_or("SQLite error");

    // Primary result code lives in the low byte
    match code & 0xff {
        5 | 6 => {
            // SQLITE_BUSY / SQLITE_LOCKED
            "Storage is locked\n\nAnother bdm instance is saving. Try again in a moment.".to_string()
        }
        8 => {
            // SQLITE_READONLY
            "Storage file is read-only\n\nCheck permissions of the data directory.".to_string()
        }
        11 | 26 => {
            // SQLITE_CORRUPT / SQLITE_NOTADB
            format!("Storage file is damaged: {}\n\nHint: move it aside to start fresh", detail)
        }
        13 => {
            // SQLITE_FULL
            "Storage is full".to_string()
        }
        14 => {
            // SQLITE_CANTOPEN
            format!("Cannot open storage file: {}", detail)
        }
        _ => format!("Storage error (code {}): {}", code, detail),
    }
}
