use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::StorageError;

/// Fixed storage key holding the JSON-encoded history array.
pub const HISTORY_KEY: &str = "qa_history";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub question: String,
    pub answer: String,
    pub inference_time: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Single-table SQLite key-value store.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let store = SqliteStore { path: path.to_path_buf() };
        store.connect()?.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        Ok(Connection::open(&self.path)?)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.connect()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn values(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.values.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values()?.remove(key);
        Ok(())
    }
}

/// In-memory history mirrored to a [`KeyValueStore`] on every mutation.
pub struct HistoryStore {
    storage: Box<dyn KeyValueStore>,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// Reads persisted history. Unreadable or corrupted data yields an empty history.
    pub fn load(storage: Box<dyn KeyValueStore>) -> Self {
        let records = match storage.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryRecord>>(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "discarding corrupted history");
                    if let Err(e) = storage.remove(HISTORY_KEY) {
                        error!(error = %e, "failed to remove corrupted history");
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                error!(error = %e, "failed to read history");
                Vec::new()
            }
        };
        debug!(count = records.len(), "history loaded");

        HistoryStore { storage, records }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
        self.persist();
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.persist();
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.records)
            .map_err(|e| e.to_string())
            .and_then(|json| self.storage.set(HISTORY_KEY, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            error!(error = %e, "failed to persist history");
        }
    }

    #[cfg(test)]
    fn into_storage(self) -> Box<dyn KeyValueStore> {
        self.storage
    }
}
