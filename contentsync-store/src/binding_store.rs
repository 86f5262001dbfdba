//! Typed repository over a [`KeyValueStore`].
//!
//! One method per logical entity: credentials, index names per content type,
//! the indexed content types and the listened content types. Every key is
//! written on its own; there is no transaction spanning two keys. Updates of
//! list-valued keys are serialized so concurrent writers never drop each
//! other's changes.

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;
use contentsync_types::{ContentTypeId, Credentials, IndexNames, IndexedContentType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Key layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prefix of every key written by the store.
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "search".to_string(),
        }
    }
}

/// Persistent store for credentials and content type bindings.
pub struct BindingStore {
    kv: Arc<dyn KeyValueStore>,
    config: StoreConfig,
    /// Held across read-modify-write of list-valued keys.
    list_updates: Mutex<()>,
}

impl BindingStore {
    /// Creates a store with the default key prefix.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(kv, StoreConfig::default())
    }

    /// Creates a store with a custom key layout.
    pub fn with_config(kv: Arc<dyn KeyValueStore>, config: StoreConfig) -> Self {
        Self {
            kv,
            config,
            list_updates: Mutex::new(()),
        }
    }

    /// Returns the key prefix.
    pub fn key_prefix(&self) -> &str {
        &self.config.key_prefix
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.config.key_prefix, suffix)
    }

    fn index_names_key(&self, content_type: &ContentTypeId) -> String {
        self.key(&format!("index_names_{content_type}"))
    }

    // ── Raw access ───────────────────────────────────────────────

    async fn get_raw(&self, key: String) -> StoreResult<Option<Value>> {
        let kv = self.kv.clone();
        tokio::task::spawn_blocking(move || kv.get(&key))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn set_raw(&self, key: String, value: Value) -> StoreResult<Option<Value>> {
        let kv = self.kv.clone();
        tokio::task::spawn_blocking(move || kv.set(&key, value))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn get_as<T: DeserializeOwned>(&self, key: String) -> StoreResult<Option<T>> {
        match self.get_raw(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    async fn set_as<T: Serialize + DeserializeOwned>(
        &self,
        key: String,
        value: &T,
    ) -> StoreResult<Option<T>> {
        let previous = self.set_raw(key, serde_json::to_value(value)?).await?;
        match previous {
            None | Some(Value::Null) => Ok(None),
            Some(v) => Ok(serde_json::from_value(v).ok()),
        }
    }

    // ── Credentials ──────────────────────────────────────────────

    /// Returns the stored credentials. Unset parts read as empty strings.
    pub async fn credentials(&self) -> StoreResult<Credentials> {
        let host: Option<String> = self.get_as(self.key("credentials_host")).await?;
        let api_key: Option<String> = self.get_as(self.key("credentials_api_key")).await?;
        Ok(Credentials {
            host: host.unwrap_or_default(),
            api_key: api_key.unwrap_or_default(),
        })
    }

    /// Replaces the stored credentials, returning the previous ones.
    pub async fn set_credentials(&self, credentials: &Credentials) -> StoreResult<Credentials> {
        let previous_key: Option<String> = self
            .set_as(self.key("credentials_api_key"), &credentials.api_key)
            .await?;
        let previous_host: Option<String> = self
            .set_as(self.key("credentials_host"), &credentials.host)
            .await?;
        debug!("Stored credentials for host {}", credentials.host);
        Ok(Credentials {
            host: previous_host.unwrap_or_default(),
            api_key: previous_key.unwrap_or_default(),
        })
    }

    // ── Index names ──────────────────────────────────────────────

    /// Returns the index names bound to a content type, falling back to the
    /// collection name when nothing usable is stored.
    pub async fn index_names(
        &self,
        content_type: &ContentTypeId,
        collection_name: &str,
    ) -> StoreResult<IndexNames> {
        let stored = self.stored_index_names(content_type).await?;
        if stored.is_empty() {
            return Ok(IndexNames::single(collection_name));
        }
        Ok(stored)
    }

    /// Returns exactly what is stored for a content type (possibly empty).
    pub async fn stored_index_names(&self, content_type: &ContentTypeId) -> StoreResult<IndexNames> {
        let stored: Option<Vec<Value>> = self.get_as(self.index_names_key(content_type)).await?;
        // Non-string members are dropped like blank names.
        let names = stored
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string));
        Ok(IndexNames::sanitize(names))
    }

    /// Stores the index names of a content type after sanitizing them.
    /// Returns the previously stored names.
    pub async fn set_index_names<I, S>(
        &self,
        content_type: &ContentTypeId,
        names: I,
    ) -> StoreResult<IndexNames>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sanitized = IndexNames::sanitize(names);
        let previous: Option<IndexNames> = self
            .set_as(self.index_names_key(content_type), &sanitized)
            .await?;
        Ok(previous.unwrap_or_default())
    }

    /// Clears the stored index names so the default applies again.
    pub async fn clear_index_names(&self, content_type: &ContentTypeId) -> StoreResult<IndexNames> {
        self.set_index_names(content_type, Vec::<String>::new()).await
    }

    // ── Indexed content types ────────────────────────────────────

    /// Returns every content type with a binding record.
    pub async fn indexed_content_types(&self) -> StoreResult<Vec<IndexedContentType>> {
        let records: Option<Vec<IndexedContentType>> =
            self.get_as(self.key("indexed_content_types")).await?;
        Ok(records.unwrap_or_default())
    }

    /// Returns the binding record of a content type, if any.
    pub async fn indexed_content_type(
        &self,
        content_type: &ContentTypeId,
    ) -> StoreResult<Option<IndexedContentType>> {
        Ok(self
            .indexed_content_types()
            .await?
            .into_iter()
            .find(|r| &r.content_type == content_type))
    }

    async fn set_indexed_content_types(&self, records: &[IndexedContentType]) -> StoreResult<()> {
        self.set_raw(self.key("indexed_content_types"), serde_json::to_value(records)?)
            .await?;
        Ok(())
    }

    /// Inserts or replaces the binding record of a content type. Returns the
    /// replaced record.
    pub async fn add_or_replace_indexed_content_type(
        &self,
        record: IndexedContentType,
    ) -> StoreResult<Option<IndexedContentType>> {
        let _guard = self.list_updates.lock().await;
        let mut records = self.indexed_content_types().await?;
        let previous = records
            .iter()
            .position(|r| r.content_type == record.content_type)
            .map(|pos| records.remove(pos));
        records.push(record);
        self.set_indexed_content_types(&records).await?;
        Ok(previous)
    }

    /// Removes the binding record of a content type. Returns the removed
    /// record, or `None` if there was none.
    pub async fn remove_indexed_content_type(
        &self,
        content_type: &ContentTypeId,
    ) -> StoreResult<Option<IndexedContentType>> {
        let _guard = self.list_updates.lock().await;
        let mut records = self.indexed_content_types().await?;
        let Some(pos) = records.iter().position(|r| &r.content_type == content_type) else {
            return Ok(None);
        };
        let removed = records.remove(pos);
        self.set_indexed_content_types(&records).await?;
        debug!("Removed binding record for {}", content_type);
        Ok(Some(removed))
    }

    // ── Listened content types ───────────────────────────────────

    /// Returns the content types subscribed to lifecycle events.
    pub async fn listened_content_types(&self) -> StoreResult<BTreeSet<ContentTypeId>> {
        let listened: Option<Vec<ContentTypeId>> =
            self.get_as(self.key("listened_content_types")).await?;
        Ok(listened.unwrap_or_default().into_iter().collect())
    }

    /// Adds a content type to the listened set. Returns the updated set.
    pub async fn add_listened_content_type(
        &self,
        content_type: &ContentTypeId,
    ) -> StoreResult<BTreeSet<ContentTypeId>> {
        let _guard = self.list_updates.lock().await;
        let mut listened = self.listened_content_types().await?;
        if listened.insert(content_type.clone()) {
            let list: Vec<ContentTypeId> = listened.iter().cloned().collect();
            self.set_as(self.key("listened_content_types"), &list).await?;
        }
        Ok(listened)
    }

    /// Empties the listened set. Returns the content types it held.
    pub async fn clear_listened_content_types(&self) -> StoreResult<BTreeSet<ContentTypeId>> {
        let _guard = self.list_updates.lock().await;
        let previous: Option<Vec<ContentTypeId>> = self
            .set_as(self.key("listened_content_types"), &Vec::<ContentTypeId>::new())
            .await?;
        Ok(previous.unwrap_or_default().into_iter().collect())
    }
}
