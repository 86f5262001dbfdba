//! Synchronization engine.
//!
//! Orchestrates the binding store, the content repository and the remote
//! search client. The engine keeps no durable state of its own: bindings live
//! in the store, documents live remotely, and the in-memory subscriptions are
//! rebuilt by [`SyncEngine::bootstrap`].
//!
//! Per content type the engine moves through
//! `Unbound -> Binding -> Bound -> Unbinding -> Unbound`. Commands surface
//! their first error and leave partial state behind; re-running them is the
//! recovery path.

use crate::config::RuntimeContext;
use crate::error::{SyncError, SyncResult};
use crate::mapper::DocumentMapper;
use crate::repository::{ContentRepository, EntryFilter, EntryQuery, PublicationStatus};
use contentsync_remote::{RemoteError, SearchClient, TaskHandle};
use contentsync_store::BindingStore;
use contentsync_types::{
    ContentTypeBinding, ContentTypeId, Credentials, Entry, EntryId, IndexNames,
    IndexedContentType, SearchDocument,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Lifecycle of a content type binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingState {
    Unbound,
    /// `enable` is running.
    Binding,
    Bound,
    /// `disable` is running.
    Unbinding,
}

/// One row of [`SyncEngine::report`]: a content type paired with one of its
/// index names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeReport {
    pub collection: String,
    pub content_type: ContentTypeId,
    pub index_name: String,
    /// The index exists remotely and the content type is bound.
    pub indexed: bool,
    pub is_indexing: bool,
    pub document_count: u64,
    /// Published entries in the CMS.
    pub entry_count: u64,
    pub listened: bool,
    pub fields: Vec<String>,
}

/// A remote call that failed for one index while its siblings went ahead.
#[derive(Debug)]
pub struct IndexFailure {
    pub index_name: String,
    pub error: SyncError,
}

/// Result of an incremental handler.
#[derive(Debug, Default)]
pub struct HandlerOutcome {
    /// Writes accepted by the remote service.
    pub tasks: Vec<TaskHandle>,
    pub failures: Vec<IndexFailure>,
}

impl HandlerOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, results: Vec<(String, SyncResult<TaskHandle>)>) {
        for (index_name, result) in results {
            match result {
                Ok(task) => self.tasks.push(task),
                Err(error) => self.failures.push(IndexFailure { index_name, error }),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Write<'a> {
    Upsert(&'a [SearchDocument]),
    Delete(&'a [String]),
}

/// What an incremental handler needs to know about a subscribed content type.
struct SyncTarget {
    mapper: DocumentMapper,
    index_names: IndexNames,
}

/// Marks a content type as mid-command until dropped.
struct Transition<'a> {
    transitions: &'a Mutex<HashMap<ContentTypeId, BindingState>>,
    content_type: ContentTypeId,
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        lock(self.transitions).remove(&self.content_type);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps remote search indexes in step with CMS content.
pub struct SyncEngine {
    ctx: RuntimeContext,
    store: Arc<BindingStore>,
    content: Arc<dyn ContentRepository>,
    remote: Arc<dyn SearchClient>,
    /// Content types whose lifecycle events are handled in this process.
    subscriptions: RwLock<BTreeSet<ContentTypeId>>,
    transitions: Mutex<HashMap<ContentTypeId, BindingState>>,
}

impl SyncEngine {
    pub fn new(
        ctx: RuntimeContext,
        store: Arc<BindingStore>,
        content: Arc<dyn ContentRepository>,
        remote: Arc<dyn SearchClient>,
    ) -> Self {
        Self {
            ctx,
            store,
            content,
            remote,
            subscriptions: RwLock::new(BTreeSet::new()),
            transitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.ctx
    }

    pub fn store(&self) -> &Arc<BindingStore> {
        &self.store
    }

    pub fn content(&self) -> &Arc<dyn ContentRepository> {
        &self.content
    }

    pub fn remote(&self) -> &Arc<dyn SearchClient> {
        &self.remote
    }

    /// Entries per page, never zero.
    pub fn batch_size(&self) -> usize {
        self.ctx.config.batch_size.max(1)
    }

    fn remote_error(&self, err: RemoteError) -> SyncError {
        SyncError::from_remote(err, &self.ctx.config.reference_url)
    }

    fn begin(&self, content_type: &ContentTypeId, state: BindingState) -> Transition<'_> {
        lock(&self.transitions).insert(content_type.clone(), state);
        Transition {
            transitions: &self.transitions,
            content_type: content_type.clone(),
        }
    }

    async fn collection_name(&self, content_type: &ContentTypeId) -> SyncResult<String> {
        self.content
            .collection_name(content_type)
            .await?
            .ok_or_else(|| SyncError::UnknownContentType(content_type.clone()))
    }

    // ── Credentials ──────────────────────────────────────────────

    /// Stored credentials of the search service.
    pub async fn credentials(&self) -> SyncResult<Credentials> {
        Ok(self.store.credentials().await?)
    }

    /// Persists new credentials and points the client at them. Returns the
    /// previous credentials.
    pub async fn set_credentials(&self, credentials: Credentials) -> SyncResult<Credentials> {
        let previous = self.store.set_credentials(&credentials).await?;
        self.remote.use_credentials(&credentials).await;
        info!("Search service credentials updated for host {}", credentials.host);
        Ok(previous)
    }

    // ── Subscriptions ────────────────────────────────────────────

    pub async fn is_subscribed(&self, content_type: &ContentTypeId) -> bool {
        self.subscriptions.read().await.contains(content_type)
    }

    /// Subscribed content types, sorted.
    pub async fn subscriptions(&self) -> Vec<ContentTypeId> {
        self.subscriptions.read().await.iter().cloned().collect()
    }

    async fn subscribe(&self, content_type: &ContentTypeId) {
        self.subscriptions.write().await.insert(content_type.clone());
    }

    async fn unsubscribe(&self, content_type: &ContentTypeId) {
        self.subscriptions.write().await.remove(content_type);
    }

    // ── Binding state ────────────────────────────────────────────

    pub async fn state(&self, content_type: &ContentTypeId) -> SyncResult<BindingState> {
        let in_flight = lock(&self.transitions).get(content_type).copied();
        if let Some(state) = in_flight {
            return Ok(state);
        }
        Ok(match self.store.indexed_content_type(content_type).await? {
            Some(_) => BindingState::Bound,
            None => BindingState::Unbound,
        })
    }

    /// Binding of a content type as currently stored.
    pub async fn binding(&self, content_type: &ContentTypeId) -> SyncResult<ContentTypeBinding> {
        let collection = self.collection_name(content_type).await?;
        let index_names = self.store.index_names(content_type, &collection).await?;
        let record = self.store.indexed_content_type(content_type).await?;

        Ok(ContentTypeBinding {
            content_type: content_type.clone(),
            indexed: record.is_some(),
            searchable_fields: record.map(|r| r.searchable_fields).unwrap_or_default(),
            index_names,
            listened: self.is_subscribed(content_type).await,
        })
    }

    /// Index names of every other bound content type that also resolve to
    /// one of `names`.
    async fn shared_index_names(
        &self,
        content_type: &ContentTypeId,
        names: &IndexNames,
    ) -> SyncResult<HashSet<String>> {
        let mut shared = HashSet::new();
        for record in self.store.indexed_content_types().await? {
            if &record.content_type == content_type {
                continue;
            }
            let other = self.resolved_index_names(&record.content_type).await?;
            shared.extend(other.iter().filter(|n| names.contains(n)).cloned());
        }
        Ok(shared)
    }

    /// Index names of a content type, even one the repository no longer knows.
    async fn resolved_index_names(&self, content_type: &ContentTypeId) -> SyncResult<IndexNames> {
        match self.content.collection_name(content_type).await? {
            Some(collection) => Ok(self.store.index_names(content_type, &collection).await?),
            None => Ok(self.store.stored_index_names(content_type).await?),
        }
    }

    // ── Remote fan-out ───────────────────────────────────────────

    /// Sends one write to every index concurrently. One index failing does
    /// not cancel the others.
    async fn fan_out(
        &self,
        names: &IndexNames,
        write: Write<'_>,
    ) -> Vec<(String, SyncResult<TaskHandle>)> {
        join_all(names.iter().map(|index| async move {
            let result = match write {
                Write::Upsert(documents) => self.remote.upsert(index, documents).await,
                Write::Delete(ids) => self.remote.delete(index, ids).await,
            }
            .map_err(|e| self.remote_error(e));

            match &result {
                Ok(task) => info!(
                    "Enqueued {} of {} documents on index {}",
                    task.operation, task.document_count, index
                ),
                Err(e) => warn!("Search write on index {} failed: {}", index, e),
            }
            (index.clone(), result)
        }))
        .await
    }

    /// Tasks of a fan-out, or its first error.
    fn first_error(results: Vec<(String, SyncResult<TaskHandle>)>) -> SyncResult<Vec<TaskHandle>> {
        let mut tasks = Vec::with_capacity(results.len());
        for (_, result) in results {
            tasks.push(result?);
        }
        Ok(tasks)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Binds a content type to its indexes and backfills every published
    /// entry.
    ///
    /// Index names resolve to `index_names` when it holds at least one
    /// non-blank name, else to the stored names, else to the collection name.
    /// Calling it again on a bound content type replaces its fields and names
    /// and re-runs the whole backfill.
    pub async fn enable(
        &self,
        content_type: &ContentTypeId,
        searchable_fields: Option<Vec<String>>,
        index_names: Option<Vec<String>>,
    ) -> SyncResult<Vec<TaskHandle>> {
        let _transition = self.begin(content_type, BindingState::Binding);
        let collection = self.collection_name(content_type).await?;

        let names = match index_names
            .map(IndexNames::sanitize)
            .filter(|names| !names.is_empty())
        {
            Some(names) => names,
            None => self.store.index_names(content_type, &collection).await?,
        };
        self.store.set_index_names(content_type, names.iter()).await?;

        let record = IndexedContentType::new(
            content_type.clone(),
            searchable_fields.unwrap_or_default(),
        );
        let mapper = DocumentMapper::new(&collection, record.searchable_fields.clone());

        let total = self
            .content
            .count_entries(content_type, &EntryFilter::All, PublicationStatus::Published)
            .await?;
        info!(
            "Indexing {} published entries of {} into {:?}",
            total,
            content_type,
            names.as_slice()
        );

        let batch_size = self.batch_size();
        let mut tasks = Vec::new();
        let mut start = 0;
        while (start as u64) < total {
            let entries = self
                .content
                .list_entries(content_type, &EntryQuery::page(start, batch_size))
                .await?;
            if entries.is_empty() {
                break;
            }

            let documents = mapper.to_documents(&entries);
            if !documents.is_empty() {
                let results = self.fan_out(&names, Write::Upsert(&documents)).await;
                tasks.extend(Self::first_error(results)?);
            }
            start += batch_size;
        }

        self.store.add_or_replace_indexed_content_type(record).await?;
        self.store.add_listened_content_type(content_type).await?;
        self.subscribe(content_type).await;

        info!("Enabled search sync for {}", content_type);
        Ok(tasks)
    }

    /// Unbinds a content type and removes its documents.
    ///
    /// Indexes shared with another bound content type only lose this content
    /// type's documents; the others are dropped. The binding is removed even
    /// when a remote call fails, and the first failure is returned afterwards.
    /// A content type the repository no longer defines is torn down through
    /// its stored index names.
    pub async fn disable(&self, content_type: &ContentTypeId) -> SyncResult<Vec<TaskHandle>> {
        let _transition = self.begin(content_type, BindingState::Unbinding);
        let collection = self.content.collection_name(content_type).await?;
        let names = self.resolved_index_names(content_type).await?;
        let shared = self.shared_index_names(content_type, &names).await?;
        let shared = &shared;
        let collection = collection.as_deref();

        let results = join_all(names.iter().map(|index| async move {
            let result = if shared.contains(index) {
                match collection {
                    Some(collection) => {
                        debug!("Index {} is shared, deleting {} documents only", index, collection);
                        self.delete_collection_documents(content_type, collection, index)
                            .await
                    }
                    None => {
                        warn!(
                            "{} is no longer defined, leaving its documents in shared index {}",
                            content_type, index
                        );
                        Ok(Vec::new())
                    }
                }
            } else {
                self.remote
                    .delete_index(index)
                    .await
                    .map(|task| {
                        info!("Enqueued deletion of index {}", index);
                        vec![task]
                    })
                    .map_err(|e| self.remote_error(e))
            };
            (index, result)
        }))
        .await;

        let mut tasks = Vec::new();
        let mut first_error = None;
        for (index, result) in results {
            match result {
                Ok(index_tasks) => tasks.extend(index_tasks),
                Err(e) => {
                    warn!("Failed to clear index {} for {}: {}", index, content_type, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        self.store.remove_indexed_content_type(content_type).await?;
        self.unsubscribe(content_type).await;

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Disabled search sync for {}", content_type);
                Ok(tasks)
            }
        }
    }

    /// Deletes the documents of every published entry of a content type from
    /// one index, page by page.
    async fn delete_collection_documents(
        &self,
        content_type: &ContentTypeId,
        collection: &str,
        index: &str,
    ) -> SyncResult<Vec<TaskHandle>> {
        let mapper = DocumentMapper::new(collection, Vec::new());
        let total = self
            .content
            .count_entries(content_type, &EntryFilter::All, PublicationStatus::Published)
            .await?;

        let batch_size = self.batch_size();
        let mut tasks = Vec::new();
        let mut start = 0;
        while (start as u64) < total {
            let entries = self
                .content
                .list_entries(content_type, &EntryQuery::page(start, batch_size))
                .await?;
            if entries.is_empty() {
                break;
            }

            let ids: Vec<String> = entries.iter().map(|e| mapper.document_id(e.id)).collect();
            let task = self
                .remote
                .delete(index, &ids)
                .await
                .map_err(|e| self.remote_error(e))?;
            info!("Enqueued delete of {} documents on index {}", ids.len(), index);
            tasks.push(task);
            start += batch_size;
        }
        Ok(tasks)
    }

    /// Rebuilds a content type's indexes from scratch with its stored fields
    /// and index names.
    pub async fn reconfigure(&self, content_type: &ContentTypeId) -> SyncResult<Vec<TaskHandle>> {
        let record = self.store.indexed_content_type(content_type).await?;
        let stored_names = self.store.stored_index_names(content_type).await?;

        let mut tasks = Vec::new();
        let searchable_fields = match record {
            Some(record) => {
                tasks.extend(self.disable(content_type).await?);
                Some(record.searchable_fields)
            }
            None => None,
        };

        let names = (!stored_names.is_empty()).then(|| stored_names.into_vec());
        tasks.extend(self.enable(content_type, searchable_fields, names).await?);
        Ok(tasks)
    }

    /// Status of every content type against every one of its index names.
    ///
    /// A binding whose index no longer exists remotely is removed on the way.
    /// Fails if the remote index list cannot be read.
    pub async fn report(&self) -> SyncResult<Vec<ContentTypeReport>> {
        let remote_indexes: HashSet<String> = self
            .remote
            .list_indexes()
            .await
            .map_err(|e| self.remote_error(e))?
            .into_iter()
            .collect();
        let listened = self.store.listened_content_types().await?;

        let mut reports = Vec::new();
        for content_type in self.content.content_type_ids().await? {
            let Some(collection) = self.content.collection_name(&content_type).await? else {
                continue;
            };
            let names = self.store.index_names(&content_type, &collection).await?;
            let mut bound = self.store.indexed_content_type(&content_type).await?.is_some();

            if bound && names.iter().any(|n| !remote_indexes.contains(n)) {
                warn!(
                    "Index of {} no longer exists on the search service, removing its binding",
                    content_type
                );
                self.store.remove_indexed_content_type(&content_type).await?;
                bound = false;
            }

            let mut fields = self.content.field_names(&content_type).await?;
            fields.sort();
            let entry_count = self
                .content
                .count_entries(&content_type, &EntryFilter::All, PublicationStatus::Published)
                .await?;

            for index in names.iter() {
                let indexed = bound && remote_indexes.contains(index);
                let info = if indexed {
                    match self.remote.info(index).await {
                        Ok(info) => info,
                        Err(e) => {
                            warn!("Could not read stats of index {}: {}", index, e);
                            Default::default()
                        }
                    }
                } else {
                    Default::default()
                };

                reports.push(ContentTypeReport {
                    collection: collection.clone(),
                    content_type: content_type.clone(),
                    index_name: index.clone(),
                    indexed,
                    is_indexing: info.is_indexing(),
                    document_count: info.document_count,
                    entry_count,
                    listened: listened.contains(&content_type),
                    fields: fields.clone(),
                });
            }
        }
        Ok(reports)
    }

    /// Restores the engine after a process start.
    ///
    /// Applies the stored credentials, drops bindings none of whose indexes
    /// exist remotely, then subscribes every remaining binding. Returns the
    /// subscribed content types.
    pub async fn bootstrap(&self) -> SyncResult<Vec<ContentTypeId>> {
        let credentials = self.store.credentials().await?;
        self.remote.use_credentials(&credentials).await;

        self.reconcile().await?;

        self.store.clear_listened_content_types().await?;
        self.subscriptions.write().await.clear();

        let mut subscribed = Vec::new();
        for record in self.store.indexed_content_types().await? {
            self.store.add_listened_content_type(&record.content_type).await?;
            self.subscribe(&record.content_type).await;
            subscribed.push(record.content_type);
        }

        info!("Subscribed {} content types to lifecycle events", subscribed.len());
        Ok(subscribed)
    }

    async fn reconcile(&self) -> SyncResult<()> {
        let remote_indexes: HashSet<String> = match self.remote.list_indexes().await {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                warn!("Skipping index reconciliation, could not list indexes: {}", e);
                return Ok(());
            }
        };

        for record in self.store.indexed_content_types().await? {
            let names = self.resolved_index_names(&record.content_type).await?;
            if !names.iter().any(|n| remote_indexes.contains(n)) {
                warn!(
                    "No index of {} exists on the search service, removing its binding",
                    record.content_type
                );
                self.store
                    .remove_indexed_content_type(&record.content_type)
                    .await?;
            }
        }
        Ok(())
    }

    // ── Incremental handlers ─────────────────────────────────────

    async fn target(&self, content_type: &ContentTypeId) -> SyncResult<Option<SyncTarget>> {
        if !self.is_subscribed(content_type).await {
            debug!("Ignoring event for unsubscribed content type {}", content_type);
            return Ok(None);
        }
        let collection = self.collection_name(content_type).await?;
        let searchable_fields = self
            .store
            .indexed_content_type(content_type)
            .await?
            .map(|r| r.searchable_fields)
            .unwrap_or_default();
        let index_names = self.store.index_names(content_type, &collection).await?;

        Ok(Some(SyncTarget {
            mapper: DocumentMapper::new(collection, searchable_fields),
            index_names,
        }))
    }

    /// Upserts the published entries and deletes the documents of the
    /// unpublished ones.
    async fn sync_entries(
        &self,
        target: &SyncTarget,
        entries: &[Entry],
        outcome: &mut HandlerOutcome,
    ) {
        let (documents, unpublished) = target.mapper.partition_published(entries);
        if !documents.is_empty() {
            outcome.absorb(
                self.fan_out(&target.index_names, Write::Upsert(&documents))
                    .await,
            );
        }
        if !unpublished.is_empty() {
            outcome.absorb(
                self.fan_out(&target.index_names, Write::Delete(&unpublished))
                    .await,
            );
        }
    }

    /// Re-fetches the entries matching `filter` page by page and syncs them.
    async fn sync_matching(
        &self,
        content_type: &ContentTypeId,
        target: &SyncTarget,
        filter: EntryFilter,
        status: PublicationStatus,
        outcome: &mut HandlerOutcome,
    ) -> SyncResult<()> {
        let total = self.content.count_entries(content_type, &filter, status).await?;
        let batch_size = self.batch_size();
        let mut start = 0;
        while (start as u64) < total {
            let query = EntryQuery::page(start, batch_size)
                .with_filter(filter.clone())
                .with_status(status);
            let entries = self.content.list_entries(content_type, &query).await?;
            if entries.is_empty() {
                break;
            }
            self.sync_entries(target, &entries, outcome).await;
            start += batch_size;
        }
        Ok(())
    }

    async fn delete_ids(&self, target: &SyncTarget, ids: &[EntryId], outcome: &mut HandlerOutcome) {
        for chunk in ids.chunks(self.batch_size()) {
            let document_ids: Vec<String> =
                chunk.iter().map(|id| target.mapper.document_id(*id)).collect();
            outcome.absorb(
                self.fan_out(&target.index_names, Write::Delete(&document_ids))
                    .await,
            );
        }
    }

    /// An entry was created.
    pub async fn on_create(
        &self,
        content_type: &ContentTypeId,
        record: &Entry,
    ) -> SyncResult<HandlerOutcome> {
        let mut outcome = HandlerOutcome::default();
        let Some(target) = self.target(content_type).await? else {
            return Ok(outcome);
        };

        let documents = target.mapper.to_documents(std::slice::from_ref(record));
        if !documents.is_empty() {
            outcome.absorb(
                self.fan_out(&target.index_names, Write::Upsert(&documents))
                    .await,
            );
        }
        Ok(outcome)
    }

    /// Several entries were created; they are re-read by id.
    pub async fn on_create_many(
        &self,
        content_type: &ContentTypeId,
        ids: &[EntryId],
    ) -> SyncResult<HandlerOutcome> {
        let mut outcome = HandlerOutcome::default();
        let Some(target) = self.target(content_type).await? else {
            return Ok(outcome);
        };
        if ids.is_empty() {
            return Ok(outcome);
        }

        self.sync_matching(
            content_type,
            &target,
            EntryFilter::Ids(ids.to_vec()),
            PublicationStatus::Published,
            &mut outcome,
        )
        .await?;
        Ok(outcome)
    }

    /// An entry was updated. An entry that is no longer published loses its
    /// document.
    pub async fn on_update(
        &self,
        content_type: &ContentTypeId,
        record: &Entry,
    ) -> SyncResult<HandlerOutcome> {
        let mut outcome = HandlerOutcome::default();
        let Some(target) = self.target(content_type).await? else {
            return Ok(outcome);
        };

        self.sync_entries(&target, std::slice::from_ref(record), &mut outcome)
            .await;
        Ok(outcome)
    }

    /// Entries matching a `where` clause were updated; published matches are
    /// upserted and unpublished matches deleted.
    pub async fn on_update_many(
        &self,
        content_type: &ContentTypeId,
        where_clause: &Value,
    ) -> SyncResult<HandlerOutcome> {
        let mut outcome = HandlerOutcome::default();
        let Some(target) = self.target(content_type).await? else {
            return Ok(outcome);
        };

        let filter = EntryFilter::Where(where_clause.clone());
        for status in [PublicationStatus::Published, PublicationStatus::Draft] {
            self.sync_matching(content_type, &target, filter.clone(), status, &mut outcome)
                .await?;
        }
        Ok(outcome)
    }

    /// An entry was deleted. Ids come from the delete filter when it names
    /// them, else from the record.
    pub async fn on_delete(
        &self,
        content_type: &ContentTypeId,
        record: &Value,
        where_clause: Option<&Value>,
    ) -> SyncResult<HandlerOutcome> {
        let mut outcome = HandlerOutcome::default();
        let Some(target) = self.target(content_type).await? else {
            return Ok(outcome);
        };

        let mut ids = where_clause.map(delete_filter_ids).unwrap_or_default();
        if ids.is_empty() {
            ids.extend(record.get("id").and_then(EntryId::from_json));
        }
        if ids.is_empty() {
            warn!("Delete event for {} carries no entry id", content_type);
            return Ok(outcome);
        }

        self.delete_ids(&target, &ids, &mut outcome).await;
        Ok(outcome)
    }

    /// Entries matching a delete filter were deleted.
    pub async fn on_delete_many(
        &self,
        content_type: &ContentTypeId,
        where_clause: &Value,
    ) -> SyncResult<HandlerOutcome> {
        let mut outcome = HandlerOutcome::default();
        let Some(target) = self.target(content_type).await? else {
            return Ok(outcome);
        };

        let ids = delete_filter_ids(where_clause);
        if ids.is_empty() {
            warn!(
                "Could not extract entry ids from delete filter of {}, skipping",
                content_type
            );
            return Ok(outcome);
        }

        self.delete_ids(&target, &ids, &mut outcome).await;
        Ok(outcome)
    }
}

/// Entry ids named by a CMS delete filter.
///
/// Recognizes `{"$and": [{"id": {"$in": [..]}}, ..]}`, `{"id": {"$in": [..]}}`
/// and `{"id": 5}`. Anything else yields no ids.
pub fn delete_filter_ids(where_clause: &Value) -> Vec<EntryId> {
    let id_condition = where_clause
        .get("$and")
        .and_then(|and| and.get(0))
        .and_then(|first| first.get("id"))
        .filter(|id| id.get("$in").is_some())
        .or_else(|| where_clause.get("id"));

    match id_condition {
        Some(Value::Object(ops)) => {
            if let Some(list) = ops.get("$in").and_then(Value::as_array) {
                list.iter().filter_map(EntryId::from_json).collect()
            } else {
                ops.get("$eq")
                    .and_then(EntryId::from_json)
                    .into_iter()
                    .collect()
            }
        }
        Some(scalar) => EntryId::from_json(scalar).into_iter().collect(),
        None => Vec::new(),
    }
}
