//! Persistent binding store for contentsync.
//!
//! Holds everything the synchronization engine needs to survive a restart:
//! - Credentials of the remote search service
//! - Index names bound to each content type
//! - Which content types are indexed (and with which searchable fields)
//! - Which content types are subscribed to lifecycle events
//!
//! The engine itself keeps no durable state. Persistence goes through a
//! [`KeyValueStore`]: SQLite for real deployments, an in-memory map for tests.

mod binding_store;
mod error;
mod kv;

pub use binding_store::{BindingStore, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use kv::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
