//! Lifecycle event dispatch.
//!
//! The CMS reports writes after they commit. Dispatching never blocks the
//! caller and never fails it: handlers run on their own task and every
//! failure goes to the engine's [`ErrorSink`](crate::ErrorSink).

use crate::engine::{HandlerOutcome, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::sink::HandlerFailure;
use contentsync_types::{ContentTypeId, Entry, EntryId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A committed CMS write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LifecycleEvent {
    AfterCreate {
        content_type: ContentTypeId,
        record: Entry,
    },
    AfterCreateMany {
        content_type: ContentTypeId,
        #[serde(default)]
        count: u64,
        ids: Vec<EntryId>,
    },
    AfterUpdate {
        content_type: ContentTypeId,
        record: Entry,
    },
    AfterUpdateMany {
        content_type: ContentTypeId,
        #[serde(rename = "where")]
        where_clause: Value,
    },
    AfterDelete {
        content_type: ContentTypeId,
        /// The deleted record as returned by the CMS. Only its `id` is read.
        record: Value,
        #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
        where_clause: Option<Value>,
    },
    AfterDeleteMany {
        content_type: ContentTypeId,
        #[serde(rename = "where")]
        where_clause: Value,
    },
}

impl LifecycleEvent {
    pub fn content_type(&self) -> &ContentTypeId {
        match self {
            Self::AfterCreate { content_type, .. }
            | Self::AfterCreateMany { content_type, .. }
            | Self::AfterUpdate { content_type, .. }
            | Self::AfterUpdateMany { content_type, .. }
            | Self::AfterDelete { content_type, .. }
            | Self::AfterDeleteMany { content_type, .. } => content_type,
        }
    }

    /// Name of the CMS hook that produced the event.
    pub fn action(&self) -> &'static str {
        match self {
            Self::AfterCreate { .. } => "afterCreate",
            Self::AfterCreateMany { .. } => "afterCreateMany",
            Self::AfterUpdate { .. } => "afterUpdate",
            Self::AfterUpdateMany { .. } => "afterUpdateMany",
            Self::AfterDelete { .. } => "afterDelete",
            Self::AfterDeleteMany { .. } => "afterDeleteMany",
        }
    }
}

async fn run(engine: &SyncEngine, event: &LifecycleEvent) -> SyncResult<HandlerOutcome> {
    match event {
        LifecycleEvent::AfterCreate {
            content_type,
            record,
        } => engine.on_create(content_type, record).await,
        LifecycleEvent::AfterCreateMany {
            content_type, ids, ..
        } => engine.on_create_many(content_type, ids).await,
        LifecycleEvent::AfterUpdate {
            content_type,
            record,
        } => engine.on_update(content_type, record).await,
        LifecycleEvent::AfterUpdateMany {
            content_type,
            where_clause,
        } => engine.on_update_many(content_type, where_clause).await,
        LifecycleEvent::AfterDelete {
            content_type,
            record,
            where_clause,
        } => {
            engine
                .on_delete(content_type, record, where_clause.as_ref())
                .await
        }
        LifecycleEvent::AfterDeleteMany {
            content_type,
            where_clause,
        } => engine.on_delete_many(content_type, where_clause).await,
    }
}

/// Routes lifecycle events to the engine's handlers.
pub struct LifecycleDispatcher {
    engine: Arc<SyncEngine>,
}

impl LifecycleDispatcher {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Runs the handler for an event on the current task and returns its
    /// outcome.
    pub async fn handle(&self, event: &LifecycleEvent) -> SyncResult<HandlerOutcome> {
        run(&self.engine, event).await
    }

    /// Spawns the handler for an event and returns at once.
    ///
    /// Returns `None` when the event's content type is not subscribed.
    pub async fn dispatch(&self, event: LifecycleEvent) -> Option<JoinHandle<()>> {
        if !self.engine.is_subscribed(event.content_type()).await {
            debug!(
                "No subscription for {}, dropping {} event",
                event.content_type(),
                event.action()
            );
            return None;
        }

        let engine = self.engine.clone();
        Some(tokio::spawn(async move {
            let sink = engine.context().error_sink.clone();
            let content_type = event.content_type().clone();
            let action = event.action();

            // Run on a nested task so a panicking handler is reported too.
            let handler = tokio::spawn(async move { run(&engine, &event).await });
            let failure = |index_name: Option<String>, error: &SyncError| HandlerFailure {
                content_type: content_type.clone(),
                action: action.to_string(),
                index_name,
                error: error.report(),
            };

            match handler.await {
                Ok(Ok(outcome)) => {
                    for f in outcome.failures {
                        sink.record(failure(Some(f.index_name), &f.error));
                    }
                }
                Ok(Err(e)) => sink.record(failure(None, &e)),
                Err(e) => sink.record(failure(None, &SyncError::Task(e.to_string()))),
            }
        }))
    }
}
