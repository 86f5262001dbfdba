mod common;

use common::*;
use contentsync_engine::{
    BindingState, MemoryContentRepository, RuntimeContext, SyncEngine, SyncError,
};
use contentsync_remote::mock::RemoteCall;
use contentsync_remote::{RemoteOperation, SearchClient};
use contentsync_types::{Credentials, Entry, EntryId, IndexNames, IndexedContentType};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

// ── Construction & accessors ─────────────────────────────────────

#[tokio::test]
async fn engine_defaults() {
    let h = harness(vec![]);
    assert_eq!(h.engine.batch_size(), 100);
    assert!(h.engine.subscriptions().await.is_empty());
}

#[tokio::test]
async fn credentials_are_persisted_and_applied() {
    let h = harness(vec![]);
    let creds = Credentials::new("https://search.example.com", "token");

    let previous = h.engine.set_credentials(creds.clone()).await.unwrap();
    assert_eq!(previous, Credentials::default());
    assert_eq!(h.engine.credentials().await.unwrap(), creds);
    assert_eq!(h.remote.credentials(), creds);
}

// ── Enable ───────────────────────────────────────────────────────

#[tokio::test]
async fn enable_backfills_in_batches_of_100() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(250, &[]))]);

    let tasks = h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();

    assert_eq!(upsert_sizes(&h.remote, "article"), vec![100, 100, 50]);
    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().all(|t| t.operation == RemoteOperation::Upsert));
    assert_eq!(h.remote.documents("article").len(), 250);
}

#[tokio::test]
async fn enable_pages_in_id_order() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(150, &[]))]);
    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();

    let first_batch = match &h.remote.calls()[0] {
        RemoteCall::Upsert { ids, .. } => ids.clone(),
        other => panic!("unexpected call: {other:?}"),
    };
    assert_eq!(first_batch.first().map(String::as_str), Some("article-1"));
    assert_eq!(first_batch.last().map(String::as_str), Some("article-100"));
}

#[tokio::test]
async fn enable_indexes_only_published_entries() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(10, &[2, 5, 9]))]);

    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();

    let docs = h.remote.documents("article");
    assert_eq!(docs.len(), 7);
    assert!(!docs.iter().any(|d| d.id == "article-5"));
}

#[tokio::test]
async fn enable_defaults_index_name_to_collection_name() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(3, &[]))]);

    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();

    let binding = h.engine.binding(&ct(ARTICLE)).await.unwrap();
    assert_eq!(binding.index_names, IndexNames::single("article"));
    assert!(binding.indexed);
    assert!(binding.listened);
    assert_eq!(h.remote.index_names(), vec!["article".to_string()]);
}

#[tokio::test]
async fn enable_sanitizes_explicit_index_names() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(3, &[]))]);

    h.engine
        .enable(
            &ct(ARTICLE),
            None,
            Some(vec![" news ".into(), "".into(), "news".into(), "blog".into()]),
        )
        .await
        .unwrap();

    let binding = h.engine.binding(&ct(ARTICLE)).await.unwrap();
    assert_eq!(binding.index_names, IndexNames::sanitize(["news", "blog"]));
    assert_eq!(h.remote.documents("news").len(), 3);
    assert_eq!(h.remote.documents("blog").len(), 3);
}

#[tokio::test]
async fn enable_blank_index_names_fall_back_to_stored_names() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(2, &[]))]);
    h.store.set_index_names(&ct(ARTICLE), ["stored"]).await.unwrap();

    h.engine
        .enable(&ct(ARTICLE), None, Some(vec!["  ".into()]))
        .await
        .unwrap();

    assert_eq!(h.remote.index_names(), vec!["stored".to_string()]);
}

#[tokio::test]
async fn enable_twice_is_idempotent() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(12, &[4]))]);
    let fields = Some(vec!["title".to_string()]);
    let names = Some(vec!["news".to_string(), "news".to_string()]);

    h.engine
        .enable(&ct(ARTICLE), fields.clone(), names.clone())
        .await
        .unwrap();
    let first = h.engine.binding(&ct(ARTICLE)).await.unwrap();
    let first_docs = h.remote.documents("news");

    h.engine.enable(&ct(ARTICLE), fields, names).await.unwrap();
    let second = h.engine.binding(&ct(ARTICLE)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.index_names.len(), 1);
    assert_eq!(h.remote.documents("news"), first_docs);
    assert_eq!(h.store.indexed_content_types().await.unwrap().len(), 1);
}

#[tokio::test]
async fn enable_splits_searchable_fields_from_metadata() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(1, &[]))]);

    h.engine
        .enable(&ct(ARTICLE), Some(vec!["title".into()]), None)
        .await
        .unwrap();

    let doc = &h.remote.documents("article")[0];
    assert_eq!(doc.id, "article-1");
    assert_eq!(doc.content.get("title"), Some(&json!("Entry 1")));
    assert!(doc.metadata.contains_key("body"));
    assert!(doc.metadata.contains_key("publishedAt"));
    assert!(!doc.content.contains_key("body"));
}

#[tokio::test]
async fn enable_unknown_content_type_fails() {
    let h = harness(vec![]);
    let err = h.engine.enable(&ct(ARTICLE), None, None).await.unwrap_err();
    assert!(matches!(err, SyncError::UnknownContentType(ref c) if c.as_str() == ARTICLE));
}

#[tokio::test]
async fn enable_surfaces_remote_failure_without_binding() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(5, &[]))]);
    h.remote.fail_index("article");

    let err = h.engine.enable(&ct(ARTICLE), None, None).await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteService { .. }));
    assert!(err.report().link.is_some());
    assert_eq!(h.engine.state(&ct(ARTICLE)).await.unwrap(), BindingState::Unbound);
    assert!(!h.engine.is_subscribed(&ct(ARTICLE)).await);
    // Index names persist so a re-run targets the same indexes.
    assert_eq!(
        h.store.stored_index_names(&ct(ARTICLE)).await.unwrap(),
        IndexNames::single("article")
    );
}

#[tokio::test]
async fn enable_moves_content_type_to_bound() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(1, &[]))]);
    assert_eq!(h.engine.state(&ct(ARTICLE)).await.unwrap(), BindingState::Unbound);

    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();

    assert_eq!(h.engine.state(&ct(ARTICLE)).await.unwrap(), BindingState::Bound);
    assert!(h.store.listened_content_types().await.unwrap().contains(&ct(ARTICLE)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enables_keep_every_binding() {
    for _ in 0..10 {
        let h = harness(vec![
            content_type(ARTICLE, "article", entries(30, &[])),
            content_type(TAG, "tag", entries(10, &[])),
            content_type(PAGE, "page", entries(5, &[])),
        ]);
        let (ct_article, ct_tag, ct_page) = (ct(ARTICLE), ct(TAG), ct(PAGE));
        let (a, t, p) = tokio::join!(
            h.engine.enable(&ct_article, None, None),
            h.engine.enable(&ct_tag, None, None),
            h.engine.enable(&ct_page, None, None),
        );
        a.unwrap();
        t.unwrap();
        p.unwrap();

        assert_eq!(h.store.indexed_content_types().await.unwrap().len(), 3);
        assert_eq!(h.store.listened_content_types().await.unwrap().len(), 3);
    }
}

// ── Disable ──────────────────────────────────────────────────────

#[tokio::test]
async fn disable_exclusive_index_drops_it() {
    let h = harness(vec![content_type(PAGE, "page", entries(3, &[]))]);
    h.engine
        .enable(&ct(PAGE), None, Some(vec!["solo".into()]))
        .await
        .unwrap();

    let tasks = h.engine.disable(&ct(PAGE)).await.unwrap();

    assert_eq!(dropped_indexes(&h.remote), vec!["solo".to_string()]);
    assert_eq!(tasks[0].operation, RemoteOperation::DeleteIndex);
    assert!(h.remote.index_names().is_empty());
    assert_eq!(h.engine.state(&ct(PAGE)).await.unwrap(), BindingState::Unbound);
}

#[tokio::test]
async fn disable_shared_index_deletes_documents_only() {
    let h = harness(vec![
        content_type(ARTICLE, "article", entries(120, &[])),
        content_type(TAG, "tag", entries(4, &[])),
    ]);
    let shared = Some(vec!["shared".to_string()]);
    h.engine.enable(&ct(ARTICLE), None, shared.clone()).await.unwrap();
    h.engine.enable(&ct(TAG), None, shared).await.unwrap();
    h.remote.clear_calls();

    h.engine.disable(&ct(ARTICLE)).await.unwrap();

    assert!(dropped_indexes(&h.remote).is_empty());
    let deleted = deleted_ids(&h.remote, "shared");
    assert_eq!(deleted.len(), 120);
    assert!(deleted.iter().all(|id| id.starts_with("article-")));

    let remaining = h.remote.documents("shared");
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().all(|d| d.id.starts_with("tag-")));

    let reports = h.engine.report().await.unwrap();
    let tag = reports.iter().find(|r| r.content_type == ct(TAG)).unwrap();
    assert!(tag.indexed);
    let article = reports.iter().find(|r| r.content_type == ct(ARTICLE)).unwrap();
    assert!(!article.indexed);
}

#[tokio::test]
async fn disable_shared_index_batches_deletes() {
    let h = harness(vec![
        content_type(ARTICLE, "article", entries(230, &[])),
        content_type(TAG, "tag", entries(1, &[])),
    ]);
    let shared = Some(vec!["shared".to_string()]);
    h.engine.enable(&ct(ARTICLE), None, shared.clone()).await.unwrap();
    h.engine.enable(&ct(TAG), None, shared).await.unwrap();
    h.remote.clear_calls();

    h.engine.disable(&ct(ARTICLE)).await.unwrap();

    let sizes: Vec<usize> = h
        .remote
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            RemoteCall::Delete { ids, .. } => Some(ids.len()),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![100, 100, 30]);
}

#[tokio::test]
async fn disable_mixed_shared_and_exclusive_indexes() {
    let h = harness(vec![
        content_type(ARTICLE, "article", entries(2, &[])),
        content_type(TAG, "tag", entries(2, &[])),
    ]);
    h.engine
        .enable(&ct(ARTICLE), None, Some(vec!["shared".into(), "articles-only".into()]))
        .await
        .unwrap();
    h.engine
        .enable(&ct(TAG), None, Some(vec!["shared".into()]))
        .await
        .unwrap();

    h.engine.disable(&ct(ARTICLE)).await.unwrap();

    assert_eq!(dropped_indexes(&h.remote), vec!["articles-only".to_string()]);
    assert_eq!(deleted_ids(&h.remote, "shared").len(), 2);
}

#[tokio::test]
async fn index_shared_with_unbound_content_type_is_dropped() {
    let h = harness(vec![
        content_type(ARTICLE, "article", entries(2, &[])),
        content_type(TAG, "tag", entries(2, &[])),
    ]);
    // TAG names the same index but was never enabled.
    h.store.set_index_names(&ct(TAG), ["shared"]).await.unwrap();
    h.engine
        .enable(&ct(ARTICLE), None, Some(vec!["shared".into()]))
        .await
        .unwrap();

    h.engine.disable(&ct(ARTICLE)).await.unwrap();

    assert_eq!(dropped_indexes(&h.remote), vec!["shared".to_string()]);
}

#[tokio::test]
async fn disable_removes_binding_even_when_remote_fails() {
    let h = harness(vec![content_type(PAGE, "page", entries(2, &[]))]);
    h.engine.enable(&ct(PAGE), None, None).await.unwrap();
    h.remote.fail_index("page");

    let err = h.engine.disable(&ct(PAGE)).await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteService { .. }));
    assert!(h.store.indexed_content_type(&ct(PAGE)).await.unwrap().is_none());
    assert!(!h.engine.is_subscribed(&ct(PAGE)).await);
}

/// An engine over the same store and remote whose repository knows nothing.
fn without_content(h: &Harness) -> SyncEngine {
    SyncEngine::new(
        RuntimeContext::default(),
        h.store.clone(),
        Arc::new(MemoryContentRepository::new()),
        h.remote.clone(),
    )
}

#[tokio::test]
async fn disable_content_type_removed_from_repository() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(3, &[]))]);
    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();

    let engine = without_content(&h);
    engine.bootstrap().await.unwrap();
    let tasks = engine.disable(&ct(ARTICLE)).await.unwrap();

    assert_eq!(tasks[0].operation, RemoteOperation::DeleteIndex);
    assert_eq!(dropped_indexes(&h.remote), vec!["article".to_string()]);
    assert!(h.store.indexed_content_type(&ct(ARTICLE)).await.unwrap().is_none());
    assert!(!engine.is_subscribed(&ct(ARTICLE)).await);
}

#[tokio::test]
async fn disable_removed_content_type_leaves_shared_index() {
    let h = harness(vec![
        content_type(ARTICLE, "article", entries(3, &[])),
        content_type(TAG, "tag", entries(2, &[])),
    ]);
    let shared = Some(vec!["shared".to_string()]);
    h.engine.enable(&ct(ARTICLE), None, shared.clone()).await.unwrap();
    h.engine.enable(&ct(TAG), None, shared).await.unwrap();
    h.remote.clear_calls();

    let tasks = without_content(&h).disable(&ct(ARTICLE)).await.unwrap();

    assert!(tasks.is_empty());
    assert!(h.remote.calls().is_empty());
    assert_eq!(h.remote.index_names(), vec!["shared".to_string()]);
    assert!(h.store.indexed_content_type(&ct(ARTICLE)).await.unwrap().is_none());
    assert!(h.store.indexed_content_type(&ct(TAG)).await.unwrap().is_some());
}

#[tokio::test]
async fn disable_keeps_listened_set() {
    let h = harness(vec![content_type(PAGE, "page", entries(1, &[]))]);
    h.engine.enable(&ct(PAGE), None, None).await.unwrap();
    h.engine.disable(&ct(PAGE)).await.unwrap();

    assert!(h.store.listened_content_types().await.unwrap().contains(&ct(PAGE)));
    assert!(!h.engine.is_subscribed(&ct(PAGE)).await);
}

// ── Reconfigure ──────────────────────────────────────────────────

#[tokio::test]
async fn reconfigure_rebuilds_with_stored_fields_and_names() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(3, &[]))]);
    h.engine
        .enable(&ct(ARTICLE), Some(vec!["title".into()]), Some(vec!["news".into()]))
        .await
        .unwrap();
    h.remote.clear_calls();

    let tasks = h.engine.reconfigure(&ct(ARTICLE)).await.unwrap();

    assert_eq!(dropped_indexes(&h.remote), vec!["news".to_string()]);
    assert_eq!(tasks.first().map(|t| t.operation), Some(RemoteOperation::DeleteIndex));
    assert_eq!(tasks.last().map(|t| t.operation), Some(RemoteOperation::Upsert));

    let binding = h.engine.binding(&ct(ARTICLE)).await.unwrap();
    assert_eq!(binding.searchable_fields, vec!["title".to_string()]);
    assert_eq!(binding.index_names, IndexNames::single("news"));
    assert_eq!(h.remote.documents("news").len(), 3);
}

#[tokio::test]
async fn reconfigure_unbound_content_type_enables_it() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(2, &[]))]);

    h.engine.reconfigure(&ct(ARTICLE)).await.unwrap();

    assert!(dropped_indexes(&h.remote).is_empty());
    assert_eq!(h.engine.state(&ct(ARTICLE)).await.unwrap(), BindingState::Bound);
}

// ── Report ───────────────────────────────────────────────────────

#[tokio::test]
async fn report_lists_every_content_type_and_index() {
    let h = harness(vec![
        content_type(ARTICLE, "article", entries(6, &[1])),
        content_type(TAG, "tag", entries(2, &[])),
    ]);
    h.engine
        .enable(&ct(ARTICLE), None, Some(vec!["a".into(), "b".into()]))
        .await
        .unwrap();
    h.remote.set_pending("a", 3);

    let reports = h.engine.report().await.unwrap();
    assert_eq!(reports.len(), 3);

    let a = reports.iter().find(|r| r.index_name == "a").unwrap();
    assert_eq!(a.collection, "article");
    assert!(a.indexed);
    assert!(a.is_indexing);
    assert_eq!(a.document_count, 5);
    assert_eq!(a.entry_count, 5);
    assert!(a.listened);
    assert_eq!(
        a.fields,
        vec!["body".to_string(), "publishedAt".to_string(), "title".to_string()]
    );

    let b = reports.iter().find(|r| r.index_name == "b").unwrap();
    assert!(b.indexed);
    assert!(!b.is_indexing);

    let tag = reports.iter().find(|r| r.content_type == ct(TAG)).unwrap();
    assert_eq!(tag.index_name, "tag");
    assert!(!tag.indexed);
    assert_eq!(tag.document_count, 0);
    assert_eq!(tag.entry_count, 2);
    assert!(!tag.listened);
}

#[tokio::test]
async fn report_removes_binding_of_missing_index() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(2, &[]))]);
    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();
    h.remote.delete_index("article").await.unwrap();

    let reports = h.engine.report().await.unwrap();

    assert!(!reports[0].indexed);
    assert!(h.store.indexed_content_type(&ct(ARTICLE)).await.unwrap().is_none());
}

#[tokio::test]
async fn report_degrades_failed_stats_to_zero() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(2, &[]))]);
    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();
    h.remote.fail_index("article");

    let reports = h.engine.report().await.unwrap();

    assert!(reports[0].indexed);
    assert_eq!(reports[0].document_count, 0);
    assert!(!reports[0].is_indexing);
}

#[tokio::test]
async fn report_fails_when_indexes_cannot_be_listed() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(2, &[]))]);
    h.engine.enable(&ct(ARTICLE), None, None).await.unwrap();
    h.remote.fail_list_indexes();

    let err = h.engine.report().await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteConnectivity { .. }));
    assert!(err.to_string().starts_with("Could not connect with the search service"));
    // No self-heal against an unknown remote state.
    assert!(h.store.indexed_content_type(&ct(ARTICLE)).await.unwrap().is_some());
}

// ── Bootstrap ────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_reconciles_and_subscribes() {
    let h = harness(vec![
        content_type(ARTICLE, "article", entries(1, &[])),
        content_type(TAG, "tag", entries(1, &[])),
    ]);
    h.store
        .set_credentials(&Credentials::new("https://h", "k"))
        .await
        .unwrap();
    h.store
        .add_or_replace_indexed_content_type(IndexedContentType::new(ct(ARTICLE), vec![]))
        .await
        .unwrap();
    h.store
        .add_or_replace_indexed_content_type(IndexedContentType::new(ct(TAG), vec![]))
        .await
        .unwrap();
    h.store.add_listened_content_type(&ct(PAGE)).await.unwrap();
    h.remote.create_index("article");

    let subscribed = h.engine.bootstrap().await.unwrap();

    assert_eq!(subscribed, vec![ct(ARTICLE)]);
    assert_eq!(h.remote.credentials(), Credentials::new("https://h", "k"));
    assert!(h.store.indexed_content_type(&ct(TAG)).await.unwrap().is_none());
    assert_eq!(
        h.store.listened_content_types().await.unwrap().into_iter().collect::<Vec<_>>(),
        vec![ct(ARTICLE)]
    );
    assert!(h.engine.is_subscribed(&ct(ARTICLE)).await);
}

#[tokio::test]
async fn bootstrap_keeps_binding_with_any_existing_index() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(1, &[]))]);
    h.store.set_index_names(&ct(ARTICLE), ["gone", "kept"]).await.unwrap();
    h.store
        .add_or_replace_indexed_content_type(IndexedContentType::new(ct(ARTICLE), vec![]))
        .await
        .unwrap();
    h.remote.create_index("kept");

    assert_eq!(h.engine.bootstrap().await.unwrap(), vec![ct(ARTICLE)]);
}

#[tokio::test]
async fn bootstrap_skips_reconcile_when_listing_fails() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(1, &[]))]);
    h.store
        .add_or_replace_indexed_content_type(IndexedContentType::new(ct(ARTICLE), vec![]))
        .await
        .unwrap();
    h.remote.fail_list_indexes();

    let subscribed = h.engine.bootstrap().await.unwrap();

    assert_eq!(subscribed, vec![ct(ARTICLE)]);
}

// ── Incremental handlers ─────────────────────────────────────────

async fn enabled(names: &[&str]) -> Harness {
    let h = harness(vec![content_type(ARTICLE, "article", entries(5, &[5]))]);
    h.engine
        .enable(
            &ct(ARTICLE),
            None,
            Some(names.iter().map(|n| n.to_string()).collect()),
        )
        .await
        .unwrap();
    h.remote.clear_calls();
    h
}

fn published(id: u64) -> Entry {
    Entry::new(id)
        .with_field("title", "fresh")
        .published("2024-06-01T00:00:00.000Z")
}

#[tokio::test]
async fn on_create_upserts_to_every_index() {
    let h = enabled(&["a", "b"]).await;

    let outcome = h.engine.on_create(&ct(ARTICLE), &published(42)).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.tasks.len(), 2);
    assert_eq!(upsert_sizes(&h.remote, "a"), vec![1]);
    assert_eq!(upsert_sizes(&h.remote, "b"), vec![1]);
    assert!(h.remote.documents("a").iter().any(|d| d.id == "article-42"));
}

#[tokio::test]
async fn on_create_ignores_unpublished_entry() {
    let h = enabled(&["a"]).await;

    let outcome = h
        .engine
        .on_create(&ct(ARTICLE), &Entry::new(43).with_field("publishedAt", Value::Null))
        .await
        .unwrap();

    assert!(outcome.tasks.is_empty());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn handlers_ignore_unsubscribed_content_type() {
    let h = harness(vec![content_type(ARTICLE, "article", entries(2, &[]))]);

    let outcome = h.engine.on_create(&ct(ARTICLE), &published(1)).await.unwrap();

    assert!(outcome.tasks.is_empty());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn handlers_stop_after_disable() {
    let h = enabled(&["a"]).await;
    h.engine.disable(&ct(ARTICLE)).await.unwrap();
    h.remote.clear_calls();

    h.engine.on_create(&ct(ARTICLE), &published(7)).await.unwrap();
    h.engine
        .on_delete(&ct(ARTICLE), &json!({"id": 1}), None)
        .await
        .unwrap();

    assert!(h.remote.calls().is_empty());
    assert!(h.remote.index_names().is_empty());
}

#[tokio::test]
async fn on_create_many_refetches_by_id() {
    let h = enabled(&["a"]).await;
    for id in [10, 11] {
        h.content.upsert_entry(&ct(ARTICLE), published(id)).await;
    }

    let outcome = h
        .engine
        .on_create_many(&ct(ARTICLE), &[EntryId::new(10), EntryId::new(11), EntryId::new(99)])
        .await
        .unwrap();

    assert_eq!(outcome.tasks.len(), 1);
    assert_eq!(
        h.remote.calls(),
        vec![RemoteCall::Upsert {
            index: "a".to_string(),
            ids: vec!["article-10".to_string(), "article-11".to_string()],
        }]
    );
}

#[tokio::test]
async fn on_update_deletes_unpublished_entry() {
    let h = enabled(&["a", "b"]).await;
    assert!(h.remote.documents("a").iter().any(|d| d.id == "article-2"));

    let unpublished = Entry::new(2).with_field("publishedAt", Value::Null);
    let outcome = h.engine.on_update(&ct(ARTICLE), &unpublished).await.unwrap();

    assert_eq!(outcome.tasks.len(), 2);
    assert_eq!(deleted_ids(&h.remote, "a"), vec!["article-2".to_string()]);
    assert_eq!(deleted_ids(&h.remote, "b"), vec!["article-2".to_string()]);
    assert!(!h.remote.documents("a").iter().any(|d| d.id == "article-2"));
}

#[tokio::test]
async fn on_update_upserts_published_entry() {
    let h = enabled(&["a"]).await;

    h.engine.on_update(&ct(ARTICLE), &published(1)).await.unwrap();

    let doc = h
        .remote
        .documents("a")
        .into_iter()
        .find(|d| d.id == "article-1")
        .unwrap();
    assert_eq!(doc.content.get("title"), Some(&json!("fresh")));
}

#[tokio::test]
async fn on_update_many_syncs_matching_entries() {
    let h = enabled(&["a"]).await;
    h.content
        .upsert_entry(&ct(ARTICLE), published(3).with_field("title", "renamed"))
        .await;
    h.content
        .upsert_entry(&ct(ARTICLE), Entry::new(4).with_field("publishedAt", Value::Null))
        .await;

    let outcome = h
        .engine
        .on_update_many(&ct(ARTICLE), &json!({"id": {"$in": [3, 4]}}))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(upsert_sizes(&h.remote, "a"), vec![1]);
    assert_eq!(deleted_ids(&h.remote, "a"), vec!["article-4".to_string()]);
}

#[tokio::test]
async fn on_delete_reads_ids_from_filter() {
    let h = enabled(&["a"]).await;

    h.engine
        .on_delete(
            &ct(ARTICLE),
            &json!({"id": 1}),
            Some(&json!({"$and": [{"id": {"$in": [2, 3]}}, {"locale": "en"}]})),
        )
        .await
        .unwrap();

    assert_eq!(
        deleted_ids(&h.remote, "a"),
        vec!["article-2".to_string(), "article-3".to_string()]
    );
}

#[tokio::test]
async fn on_delete_falls_back_to_record_id() {
    let h = enabled(&["a"]).await;

    h.engine
        .on_delete(&ct(ARTICLE), &json!({"id": 1, "title": "x"}), Some(&json!({"locale": "en"})))
        .await
        .unwrap();

    assert_eq!(deleted_ids(&h.remote, "a"), vec!["article-1".to_string()]);
}

#[tokio::test]
async fn on_delete_many_without_ids_is_skipped() {
    let h = enabled(&["a"]).await;

    let outcome = h
        .engine
        .on_delete_many(&ct(ARTICLE), &json!({"title": {"$contains": "x"}}))
        .await
        .unwrap();

    assert!(outcome.tasks.is_empty());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn on_delete_many_batches_ids() {
    let h = enabled(&["a"]).await;
    let ids: Vec<u64> = (1..=150).collect();

    let outcome = h
        .engine
        .on_delete_many(&ct(ARTICLE), &json!({"id": {"$in": ids}}))
        .await
        .unwrap();

    assert_eq!(outcome.tasks.len(), 2);
    assert_eq!(deleted_ids(&h.remote, "a").len(), 150);
}

#[tokio::test]
async fn index_failure_does_not_cancel_siblings() {
    let h = enabled(&["ok", "broken"]).await;
    h.remote.fail_index("broken");

    let outcome = h.engine.on_create(&ct(ARTICLE), &published(77)).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.tasks.len(), 1);
    assert_eq!(outcome.tasks[0].index_name, "ok");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index_name, "broken");
    assert!(h.remote.documents("ok").iter().any(|d| d.id == "article-77"));
}
