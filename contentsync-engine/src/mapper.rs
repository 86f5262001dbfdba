//! Entry to search document mapping.
//!
//! A document id is `"{collection}-{entry id}"`, so two content types can share
//! one index without colliding as long as their collection names differ. Only
//! published entries become documents.

use contentsync_types::{Entry, EntryId, SearchDocument};
use serde_json::Map;
use std::collections::HashSet;

/// Document id of an entry.
pub fn document_id(collection: &str, entry_id: EntryId) -> String {
    format!("{collection}-{entry_id}")
}

/// Maps entries of one collection to search documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMapper {
    collection: String,
    searchable_fields: Vec<String>,
}

impl DocumentMapper {
    /// With no searchable fields every field is searchable.
    pub fn new(collection: impl Into<String>, searchable_fields: Vec<String>) -> Self {
        Self {
            collection: collection.into(),
            searchable_fields,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable_fields
    }

    pub fn document_id(&self, entry_id: EntryId) -> String {
        document_id(&self.collection, entry_id)
    }

    /// Maps one entry regardless of its publication state.
    pub fn to_document(&self, entry: &Entry) -> SearchDocument {
        let id = self.document_id(entry.id);
        if self.searchable_fields.is_empty() {
            return SearchDocument {
                id,
                content: entry.fields.clone(),
                metadata: Map::new(),
            };
        }

        let searchable: HashSet<&str> = self.searchable_fields.iter().map(String::as_str).collect();
        let (content, metadata) = entry
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .partition(|(k, _)| searchable.contains(k.as_str()));

        SearchDocument {
            id,
            content,
            metadata,
        }
    }

    /// Maps the published entries and drops the rest.
    pub fn to_documents(&self, entries: &[Entry]) -> Vec<SearchDocument> {
        entries
            .iter()
            .filter(|e| e.is_published())
            .map(|e| self.to_document(e))
            .collect()
    }

    /// Maps the published entries and returns the document ids of the others.
    pub fn partition_published(&self, entries: &[Entry]) -> (Vec<SearchDocument>, Vec<String>) {
        let mut documents = Vec::new();
        let mut unpublished = Vec::new();
        for entry in entries {
            if entry.is_published() {
                documents.push(self.to_document(entry));
            } else {
                unpublished.push(self.document_id(entry.id));
            }
        }
        (documents, unpublished)
    }
}
