//! Engine configuration and runtime context.

use crate::sink::{ErrorSink, TracingErrorSink};
use contentsync_remote::DEFAULT_REFERENCE_URL;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Entries per page when paging through a collection.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Configuration for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Entries fetched and documents sent per request.
    pub batch_size: usize,
    /// Link attached to remote service errors that carry none.
    pub reference_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            reference_url: DEFAULT_REFERENCE_URL.to_string(),
        }
    }
}

/// Everything the engine needs besides its collaborators.
#[derive(Clone)]
pub struct RuntimeContext {
    pub config: SyncConfig,
    /// Receives failures of lifecycle handlers.
    pub error_sink: Arc<dyn ErrorSink>,
}

impl RuntimeContext {
    pub fn new(config: SyncConfig, error_sink: Arc<dyn ErrorSink>) -> Self {
        Self { config, error_sink }
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(SyncConfig::default(), Arc::new(TracingErrorSink))
    }
}
