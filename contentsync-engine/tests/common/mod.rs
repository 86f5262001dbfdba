#![allow(dead_code)]

use contentsync_engine::{
    CollectingErrorSink, ContentTypeSnapshot, MemoryContentRepository, RuntimeContext, SyncConfig,
    SyncEngine,
};
use contentsync_remote::mock::{MockSearchClient, RemoteCall};
use contentsync_store::{BindingStore, MemoryKeyValueStore};
use contentsync_types::{ContentTypeId, Entry};
use serde_json::Value;
use std::sync::Arc;

pub const ARTICLE: &str = "api::article.article";
pub const TAG: &str = "api::tag.tag";
pub const PAGE: &str = "api::page.page";

pub struct Harness {
    pub engine: Arc<SyncEngine>,
    pub remote: Arc<MockSearchClient>,
    pub content: Arc<MemoryContentRepository>,
    pub store: Arc<BindingStore>,
    pub sink: Arc<CollectingErrorSink>,
}

pub fn ct(uid: &str) -> ContentTypeId {
    ContentTypeId::new(uid)
}

/// Entries `1..=count`, published except for the ids in `unpublished`.
pub fn entries(count: u64, unpublished: &[u64]) -> Vec<Entry> {
    (1..=count)
        .map(|id| {
            let entry = Entry::new(id)
                .with_field("title", format!("Entry {id}"))
                .with_field("body", "lorem ipsum");
            if unpublished.contains(&id) {
                entry.with_field("publishedAt", Value::Null)
            } else {
                entry.published("2024-05-01T10:00:00.000Z")
            }
        })
        .collect()
}

pub fn content_type(uid: &str, collection: &str, entries: Vec<Entry>) -> ContentTypeSnapshot {
    let mut snapshot = ContentTypeSnapshot::new(uid, collection);
    snapshot.fields = vec!["title".into(), "body".into(), "publishedAt".into()];
    snapshot.entries = entries;
    snapshot
}

pub fn harness(types: Vec<ContentTypeSnapshot>) -> Harness {
    let mut content = MemoryContentRepository::new();
    for snapshot in types {
        content = content.with_content_type(snapshot);
    }
    let content = Arc::new(content);
    let remote = Arc::new(MockSearchClient::new());
    let store = Arc::new(BindingStore::new(Arc::new(MemoryKeyValueStore::new())));
    let sink = Arc::new(CollectingErrorSink::new());

    let ctx = RuntimeContext::new(SyncConfig::default(), sink.clone());
    let engine = Arc::new(SyncEngine::new(
        ctx,
        store.clone(),
        content.clone(),
        remote.clone(),
    ));

    Harness {
        engine,
        remote,
        content,
        store,
        sink,
    }
}

/// Sizes of the upserts sent to `index`, in order.
pub fn upsert_sizes(remote: &MockSearchClient, index: &str) -> Vec<usize> {
    remote
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RemoteCall::Upsert { index: i, ids } if i == index => Some(ids.len()),
            _ => None,
        })
        .collect()
}

/// Ids deleted from `index`, flattened in order.
pub fn deleted_ids(remote: &MockSearchClient, index: &str) -> Vec<String> {
    remote
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RemoteCall::Delete { index: i, ids } if i == index => Some(ids),
            _ => None,
        })
        .flatten()
        .collect()
}

pub fn dropped_indexes(remote: &MockSearchClient) -> Vec<String> {
    remote
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RemoteCall::DeleteIndex { index } => Some(index),
            _ => None,
        })
        .collect()
}
