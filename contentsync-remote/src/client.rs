//! Remote search client abstraction.
//!
//! Defines the call surface the synchronization engine needs from the remote
//! search service. Every call is an independent unit of failure.

use crate::error::RemoteResult;
use async_trait::async_trait;
use contentsync_types::{Credentials, IndexInfo, SearchDocument};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Documentation link attached to service errors when the service gives none.
pub const DEFAULT_REFERENCE_URL: &str = "https://upstash.com/docs/search/overall/getstarted";

/// Configuration for the HTTP search client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchClientConfig {
    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
    /// Link attached to service errors.
    pub reference_url: String,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            reference_url: DEFAULT_REFERENCE_URL.to_string(),
        }
    }
}

/// Kind of write enqueued on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    Upsert,
    Delete,
    DeleteIndex,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upsert => write!(f, "upsert"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteIndex => write!(f, "delete_index"),
        }
    }
}

/// Receipt for a write accepted by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandle {
    pub index_name: String,
    pub operation: RemoteOperation,
    /// Documents carried by the request (0 for index deletion).
    pub document_count: usize,
}

impl TaskHandle {
    pub fn new(index_name: impl Into<String>, operation: RemoteOperation, document_count: usize) -> Self {
        Self {
            index_name: index_name.into(),
            operation,
            document_count,
        }
    }
}

/// Abstract remote search service.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Switches the client to new credentials for all subsequent calls.
    async fn use_credentials(&self, credentials: &Credentials);

    /// Returns the host the client currently talks to.
    async fn host(&self) -> String;

    /// Lists the names of every index that exists remotely.
    async fn list_indexes(&self) -> RemoteResult<Vec<String>>;

    /// Inserts or replaces documents in an index, creating it if needed.
    async fn upsert(&self, index: &str, documents: &[SearchDocument]) -> RemoteResult<TaskHandle>;

    /// Deletes documents by id from an index.
    async fn delete(&self, index: &str, ids: &[String]) -> RemoteResult<TaskHandle>;

    /// Drops an index and all of its documents.
    async fn delete_index(&self, index: &str) -> RemoteResult<TaskHandle>;

    /// Returns document counts for an index.
    async fn info(&self, index: &str) -> RemoteResult<IndexInfo>;
}
