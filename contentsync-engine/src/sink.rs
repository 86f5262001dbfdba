//! Destinations for failures of fire-and-forget handlers.

use crate::error::ErrorReport;
use contentsync_types::ContentTypeId;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tracing::error;

/// A handler failure with the context needed to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerFailure {
    pub content_type: ContentTypeId,
    /// Lifecycle action that triggered the handler (`afterCreate`, ...).
    pub action: String,
    /// Index the failed call targeted; `None` when the handler failed as a whole.
    pub index_name: Option<String>,
    pub error: ErrorReport,
}

/// Receives failures that cannot be returned to a caller.
pub trait ErrorSink: Send + Sync {
    fn record(&self, failure: HandlerFailure);
}

/// Logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn record(&self, failure: HandlerFailure) {
        error!(
            content_type = %failure.content_type,
            action = %failure.action,
            index = failure.index_name.as_deref().unwrap_or("-"),
            "Search sync failed: {}",
            failure.error.message
        );
    }
}

/// Keeps failures in memory.
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    failures: Mutex<Vec<HandlerFailure>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> Vec<HandlerFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn record(&self, failure: HandlerFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }
}
