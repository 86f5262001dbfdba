//! In-memory search service for tests.

use crate::client::{RemoteOperation, SearchClient, TaskHandle};
use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use contentsync_types::{Credentials, IndexInfo, SearchDocument};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call observed by [`MockSearchClient`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ListIndexes,
    Upsert { index: String, ids: Vec<String> },
    Delete { index: String, ids: Vec<String> },
    DeleteIndex { index: String },
    Info { index: String },
}

#[derive(Debug, Default)]
struct MockState {
    credentials: Credentials,
    indexes: BTreeMap<String, BTreeMap<String, SearchDocument>>,
    pending: HashMap<String, u64>,
    failing_indexes: BTreeSet<String>,
    fail_list_indexes: bool,
    calls: Vec<RemoteCall>,
}

/// A search client that stores indexes in memory and records every call.
///
/// Upserting into an unknown index creates it, like the real service.
#[derive(Debug, Default)]
pub struct MockSearchClient {
    state: Mutex<MockState>,
}

impl MockSearchClient {
    /// Creates an empty mock service.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates an empty index.
    pub fn create_index(&self, index: impl Into<String>) {
        self.state().indexes.entry(index.into()).or_default();
    }

    /// Makes every write and info call on `index` fail with a service error.
    pub fn fail_index(&self, index: impl Into<String>) {
        self.state().failing_indexes.insert(index.into());
    }

    /// Makes `list_indexes` fail with a connectivity error.
    pub fn fail_list_indexes(&self) {
        self.state().fail_list_indexes = true;
    }

    /// Sets the pending document count reported by `info`.
    pub fn set_pending(&self, index: impl Into<String>, pending: u64) {
        self.state().pending.insert(index.into(), pending);
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Documents currently held by `index`, ordered by id.
    pub fn documents(&self, index: &str) -> Vec<SearchDocument> {
        self.state()
            .indexes
            .get(index)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of the indexes that currently exist.
    pub fn index_names(&self) -> Vec<String> {
        self.state().indexes.keys().cloned().collect()
    }

    /// Credentials last passed to `use_credentials`.
    pub fn credentials(&self) -> Credentials {
        self.state().credentials.clone()
    }

    fn check_index(state: &MockState, index: &str) -> RemoteResult<()> {
        if state.failing_indexes.contains(index) {
            return Err(RemoteError::Service {
                status: 500,
                message: format!("index {index} is unavailable"),
                link: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn use_credentials(&self, credentials: &Credentials) {
        self.state().credentials = credentials.clone();
    }

    async fn host(&self) -> String {
        self.state().credentials.host.clone()
    }

    async fn list_indexes(&self) -> RemoteResult<Vec<String>> {
        let mut state = self.state();
        state.calls.push(RemoteCall::ListIndexes);
        if state.fail_list_indexes {
            return Err(RemoteError::Connectivity {
                host: state.credentials.host.clone(),
                message: "connection refused".to_string(),
            });
        }
        Ok(state.indexes.keys().cloned().collect())
    }

    async fn upsert(&self, index: &str, documents: &[SearchDocument]) -> RemoteResult<TaskHandle> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Upsert {
            index: index.to_string(),
            ids: documents.iter().map(|d| d.id.clone()).collect(),
        });
        Self::check_index(&state, index)?;

        let docs = state.indexes.entry(index.to_string()).or_default();
        for doc in documents {
            docs.insert(doc.id.clone(), doc.clone());
        }
        Ok(TaskHandle::new(index, RemoteOperation::Upsert, documents.len()))
    }

    async fn delete(&self, index: &str, ids: &[String]) -> RemoteResult<TaskHandle> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Delete {
            index: index.to_string(),
            ids: ids.to_vec(),
        });
        Self::check_index(&state, index)?;

        if let Some(docs) = state.indexes.get_mut(index) {
            for id in ids {
                docs.remove(id);
            }
        }
        Ok(TaskHandle::new(index, RemoteOperation::Delete, ids.len()))
    }

    async fn delete_index(&self, index: &str) -> RemoteResult<TaskHandle> {
        let mut state = self.state();
        state.calls.push(RemoteCall::DeleteIndex {
            index: index.to_string(),
        });
        Self::check_index(&state, index)?;

        state.indexes.remove(index);
        state.pending.remove(index);
        Ok(TaskHandle::new(index, RemoteOperation::DeleteIndex, 0))
    }

    async fn info(&self, index: &str) -> RemoteResult<IndexInfo> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Info {
            index: index.to_string(),
        });
        Self::check_index(&state, index)?;

        let document_count = state.indexes.get(index).map_or(0, |docs| docs.len() as u64);
        let pending_document_count = state.pending.get(index).copied().unwrap_or(0);
        Ok(IndexInfo {
            document_count,
            pending_document_count,
        })
    }
}
