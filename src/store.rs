use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::models::{Catalog, DailyTasks};

/// Key holding the serialized task buckets
pub const TASKS_KEY: &str = "eduplanner_tasks";
/// Key holding the serialized subject list
pub const SUBJECTS_KEY: &str = "eduplanner_subjects";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Failed to serialize {key}: {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed blob storage. Values are opaque JSON text.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Blob storage backed by a single SQLite table
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and initialize the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(db_path)?;
        let store = SqliteStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let store = SqliteStore {
            conn: Connection::open_in_memory()?,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT
            )",
            [],
        )?;
        Ok(())
    }

    /// Last write time of a key, RFC 3339
    pub fn updated_at(&self, key: &str) -> Result<Option<String>, StoreError> {
        let stamp: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT updated_at FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stamp.flatten())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load the task buckets. Absent or malformed blobs give an empty mapping.
pub fn load_tasks<S: KeyValueStore + ?Sized>(store: &S) -> Result<DailyTasks, StoreError> {
    Ok(load_blob(store, TASKS_KEY)?.unwrap_or_default())
}

/// Load the catalog. Absent or malformed blobs give the seed catalog.
pub fn load_catalog<S: KeyValueStore + ?Sized>(store: &S) -> Result<Catalog, StoreError> {
    Ok(load_blob(store, SUBJECTS_KEY)?.unwrap_or_else(Catalog::seed))
}

pub fn save_tasks<S: KeyValueStore + ?Sized>(store: &mut S, tasks: &DailyTasks) -> Result<(), StoreError> {
    save_blob(store, TASKS_KEY, tasks)
}

pub fn save_catalog<S: KeyValueStore + ?Sized>(store: &mut S, catalog: &Catalog) -> Result<(), StoreError> {
    save_blob(store, SUBJECTS_KEY, catalog)
}

fn load_blob<S, T>(store: &S, key: &'static str) -> Result<Option<T>, StoreError>
where
    S: KeyValueStore + ?Sized,
    T: serde::de::DeserializeOwned,
{
    let Some(raw) = store.get(key)? else {
        tracing::debug!(key, "no stored value, using defaults");
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored value is malformed, using defaults");
            Ok(None)
        }
    }
}

fn save_blob<S, T>(store: &mut S, key: &'static str, value: &T) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
    T: serde::Serialize,
{
    let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize { key, source })?;
    store.set(key, &json)?;
    tracing::trace!(key, bytes = json.len(), "saved");
    Ok(())
}
