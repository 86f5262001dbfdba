//! Error types for remote search calls.

use thiserror::Error;

/// Result type for remote search calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors returned by a [`SearchClient`](crate::SearchClient).
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No host has been configured.
    #[error("search service is not configured")]
    NotConfigured,

    /// The service could not be reached or refused our credentials.
    #[error("could not reach search service at {host}: {message}")]
    Connectivity { host: String, message: String },

    /// The service answered with an error.
    #[error("search service error ({status}): {message}")]
    Service {
        status: u16,
        message: String,
        link: Option<String>,
    },

    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),

    /// The service answered with something we could not decode.
    #[error("invalid response from search service: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether the failure is about reaching the service rather than about
    /// the request itself.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::Connectivity { .. })
    }
}
