//! Read access to CMS content.
//!
//! The engine never writes content. It needs the list of content types, their
//! collection names and fields, and paged, id-ordered entry listings.

mod memory;

pub use memory::{ContentSnapshot, ContentTypeSnapshot, MemoryContentRepository};

use async_trait::async_trait;
use contentsync_types::{ContentTypeId, Entry, EntryId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result type for content repository calls.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised by a [`ContentRepository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Backend(String),
}

/// Which version of an entry to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    #[default]
    Published,
    Draft,
}

/// Entry selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EntryFilter {
    #[default]
    All,
    /// Entries whose id is in the list.
    Ids(Vec<EntryId>),
    /// A CMS `where` clause, passed through untouched.
    Where(Value),
}

/// Order of listed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntrySort {
    #[default]
    IdAsc,
    IdDesc,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryQuery {
    pub start: usize,
    pub limit: usize,
    pub filter: EntryFilter,
    pub sort: EntrySort,
    pub status: PublicationStatus,
}

impl EntryQuery {
    /// A page of published entries ordered by id ascending.
    pub fn page(start: usize, limit: usize) -> Self {
        Self {
            start,
            limit,
            filter: EntryFilter::All,
            sort: EntrySort::IdAsc,
            status: PublicationStatus::Published,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: EntryFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: PublicationStatus) -> Self {
        self.status = status;
        self
    }
}

/// Source of CMS content.
///
/// Unknown content types are not errors: they count zero entries and list
/// none.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Every content type the CMS defines.
    async fn content_type_ids(&self) -> RepositoryResult<Vec<ContentTypeId>>;

    /// Collection name of a content type, `None` if unknown.
    async fn collection_name(&self, content_type: &ContentTypeId) -> RepositoryResult<Option<String>>;

    /// Field names of a content type, sorted.
    async fn field_names(&self, content_type: &ContentTypeId) -> RepositoryResult<Vec<String>>;

    async fn count_entries(
        &self,
        content_type: &ContentTypeId,
        filter: &EntryFilter,
        status: PublicationStatus,
    ) -> RepositoryResult<u64>;

    async fn list_entries(
        &self,
        content_type: &ContentTypeId,
        query: &EntryQuery,
    ) -> RepositoryResult<Vec<Entry>>;
}
