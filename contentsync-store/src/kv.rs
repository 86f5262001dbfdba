//! Key/value backends for the binding store.
//!
//! Values are JSON. Both backends are blocking; the [`BindingStore`] moves
//! calls onto the blocking pool.
//!
//! [`BindingStore`]: crate::BindingStore

use crate::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A durable string-keyed JSON store.
pub trait KeyValueStore: Send + Sync {
    /// Reads a key.
    fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Writes a key, returning the previous value.
    fn set(&self, key: &str, value: Value) -> StoreResult<Option<Value>>;

    /// Deletes a key, returning the previous value.
    fn delete(&self, key: &str) -> StoreResult<Option<Value>>;
}

/// Key/value store backed by a SQLite file.
pub struct SqliteKeyValueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyValueStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn read(conn: &Connection, key: &str) -> StoreResult<Option<Value>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| serde_json::from_str(&s).map_err(StoreError::from))
            .transpose()
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Self::read(&conn, key)
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<Option<Value>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let previous = Self::read(&conn, key)?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
            params![key, serde_json::to_string(&value)?],
        )?;
        Ok(previous)
    }

    fn delete(&self, key: &str) -> StoreResult<Option<Value>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let previous = Self::read(&conn, key)?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(previous)
    }
}

/// Volatile key/value store for tests and dry runs.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every key currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<Option<Value>> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.insert(key.to_string(), value))
    }

    fn delete(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.remove(key))
    }
}
