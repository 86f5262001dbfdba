//! Core type definitions for contentsync.
//!
//! This crate defines the plain data types shared by every layer of the
//! synchronization stack:
//! - Content type and entry identifiers
//! - CMS entries as they come out of the content repository
//! - Search documents as they are sent to the remote search service
//! - Bindings between content types and remote indexes
//! - Credentials for the remote search service
//!
//! Nothing in here performs I/O.

mod binding;
mod document;
mod entry;
mod ids;

pub use binding::{ContentTypeBinding, Credentials, IndexNames, IndexedContentType};
pub use document::{IndexInfo, SearchDocument};
pub use entry::{Entry, PUBLISHED_AT_FIELD};
pub use ids::{ContentTypeId, EntryId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid entry id: {0}")]
    InvalidEntryId(String),

    #[error("entry is not a JSON object")]
    NotAnObject,
}
