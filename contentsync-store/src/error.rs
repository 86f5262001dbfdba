//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking store task panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),

    /// The connection lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}
