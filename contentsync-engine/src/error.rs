//! Error types for the sync engine.

use crate::repository::RepositoryError;
use contentsync_remote::{RemoteError, DEFAULT_REFERENCE_URL};
use contentsync_store::StoreError;
use contentsync_types::ContentTypeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by engine commands and recorded for lifecycle handlers.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The search service rejected a request.
    #[error("{message}")]
    RemoteService { message: String, link: Option<String> },

    /// The search service could not be reached.
    #[error("Could not connect with the search service, please check your host: {host}")]
    RemoteConnectivity { host: String, message: String },

    /// Binding store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Content repository failure.
    #[error("content repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The content repository does not know the content type.
    #[error("unknown content type: {0}")]
    UnknownContentType(ContentTypeId),

    /// A spawned handler panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Converts a remote error, attaching `reference_url` to service errors
    /// that carry no link of their own.
    pub fn from_remote(err: RemoteError, reference_url: &str) -> Self {
        match err {
            RemoteError::NotConfigured => Self::RemoteConnectivity {
                host: String::new(),
                message: err.to_string(),
            },
            RemoteError::Connectivity { host, message } => {
                Self::RemoteConnectivity { host, message }
            }
            RemoteError::Service { message, link, .. } => Self::RemoteService {
                message,
                link: link.or_else(|| Some(reference_url.to_string())),
            },
            RemoteError::Client(_) | RemoteError::InvalidResponse(_) => Self::RemoteService {
                message: err.to_string(),
                link: Some(reference_url.to_string()),
            },
        }
    }

    /// Payload shown to operators on the control surface.
    pub fn report(&self) -> ErrorReport {
        match self {
            Self::RemoteService { message, link } => ErrorReport {
                message: message.clone(),
                link: link.clone(),
            },
            other => ErrorReport {
                message: other.to_string(),
                link: None,
            },
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        Self::from_remote(err, DEFAULT_REFERENCE_URL)
    }
}

/// Operator-facing description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}
