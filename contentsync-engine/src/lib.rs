//! Content to search index synchronization engine.
//!
//! Keeps remote search indexes consistent with the published content of a
//! CMS. Three things drive it:
//! - Commands: enable, disable, reconfigure, report and bootstrap
//! - Lifecycle events emitted by the CMS after every write
//! - The remote service's own list of indexes, checked on every report
//!
//! # Components
//!
//! - **Mapper**: turns entries into search documents
//! - **Repository**: read access to CMS content
//! - **Engine**: the commands and the incremental handlers
//! - **Lifecycle**: spawns handlers for CMS events without blocking the CMS
//! - **Sink**: where handler failures go, since no caller waits for them

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod mapper;
pub mod repository;
pub mod sink;

pub use config::{RuntimeContext, SyncConfig, DEFAULT_BATCH_SIZE};
pub use engine::{
    delete_filter_ids, BindingState, ContentTypeReport, HandlerOutcome, IndexFailure, SyncEngine,
};
pub use error::{ErrorReport, SyncError, SyncResult};
pub use lifecycle::{LifecycleDispatcher, LifecycleEvent};
pub use mapper::{document_id, DocumentMapper};
pub use repository::{
    ContentRepository, ContentSnapshot, ContentTypeSnapshot, EntryFilter, EntryQuery, EntrySort,
    MemoryContentRepository, PublicationStatus, RepositoryError, RepositoryResult,
};
pub use sink::{CollectingErrorSink, ErrorSink, HandlerFailure, TracingErrorSink};
