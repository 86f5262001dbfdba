//! Remote search service client for contentsync.
//!
//! The engine talks to the search service only through the [`SearchClient`]
//! trait:
//! - [`HttpSearchClient`] speaks the Upstash Search REST protocol
//! - [`mock::MockSearchClient`] keeps indexes in memory for tests
//!
//! Every call is independent. A failed batch does not roll back earlier
//! batches, and callers decide how to aggregate failures.

mod client;
mod error;
mod http;
pub mod mock;

pub use client::{
    RemoteOperation, SearchClient, SearchClientConfig, TaskHandle, DEFAULT_REFERENCE_URL,
};
pub use error::{RemoteError, RemoteResult};
pub use http::HttpSearchClient;
