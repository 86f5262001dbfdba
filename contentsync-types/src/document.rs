//! Documents as stored in the remote search service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document in a remote search index.
///
/// `content` is searchable; `metadata` is returned with hits but not searched.
/// The two maps never share a key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchDocument {
    /// `"{collection}-{entry id}"`.
    pub id: String,
    /// Searchable fields.
    pub content: Map<String, Value>,
    /// Retrievable, non-searchable fields.
    pub metadata: Map<String, Value>,
}

/// Document counts of a remote index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Documents already searchable.
    #[serde(default)]
    pub document_count: u64,
    /// Documents accepted but not yet indexed.
    #[serde(default)]
    pub pending_document_count: u64,
}

impl IndexInfo {
    /// The remote service is still processing writes for this index.
    pub fn is_indexing(&self) -> bool {
        self.pending_document_count > 0
    }
}
