//! In-memory content repository backed by a JSON snapshot.

use super::{
    ContentRepository, EntryFilter, EntryQuery, EntrySort, PublicationStatus, RepositoryError,
    RepositoryResult,
};
use async_trait::async_trait;
use contentsync_types::{ContentTypeId, Entry, EntryId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;

/// Serialized content of a CMS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    #[serde(default)]
    pub content_types: Vec<ContentTypeSnapshot>,
}

/// One content type inside a [`ContentSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeSnapshot {
    pub uid: ContentTypeId,
    pub collection_name: String,
    /// Declared attributes. Derived from the entries when empty.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl ContentTypeSnapshot {
    pub fn new(uid: impl Into<ContentTypeId>, collection_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            collection_name: collection_name.into(),
            fields: Vec::new(),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Collection {
    name: String,
    fields: Vec<String>,
    entries: BTreeMap<EntryId, Entry>,
}

impl Collection {
    fn from_snapshot(snapshot: ContentTypeSnapshot) -> Self {
        let mut fields = snapshot.fields;
        if fields.is_empty() {
            for entry in &snapshot.entries {
                for key in entry.fields.keys() {
                    if !fields.contains(key) {
                        fields.push(key.clone());
                    }
                }
            }
        }
        fields.sort();
        fields.dedup();

        Self {
            name: snapshot.collection_name,
            fields,
            entries: snapshot.entries.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    fn select<'a>(
        &'a self,
        filter: &'a EntryFilter,
        status: PublicationStatus,
    ) -> impl DoubleEndedIterator<Item = &'a Entry> + 'a {
        self.entries
            .values()
            .filter(move |e| match status {
                PublicationStatus::Published => e.is_published(),
                PublicationStatus::Draft => !e.is_published(),
            })
            .filter(move |e| matches_filter(e, filter))
    }
}

/// Content repository holding every entry in memory.
#[derive(Debug, Default)]
pub struct MemoryContentRepository {
    collections: RwLock<BTreeMap<ContentTypeId, Collection>>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ContentSnapshot) -> Self {
        let collections = snapshot
            .content_types
            .into_iter()
            .map(|ct| (ct.uid.clone(), Collection::from_snapshot(ct)))
            .collect();
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Loads a snapshot from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepositoryError::Backend(format!("{}: {e}", path.display())))?;
        let snapshot: ContentSnapshot = serde_json::from_str(&raw)
            .map_err(|e| RepositoryError::Backend(format!("{}: {e}", path.display())))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Adds a content type, replacing any previous one with the same uid.
    #[must_use]
    pub fn with_content_type(mut self, snapshot: ContentTypeSnapshot) -> Self {
        self.collections
            .get_mut()
            .insert(snapshot.uid.clone(), Collection::from_snapshot(snapshot));
        self
    }

    /// Inserts or replaces an entry. Returns `false` for an unknown content type.
    pub async fn upsert_entry(&self, content_type: &ContentTypeId, entry: Entry) -> bool {
        let mut collections = self.collections.write().await;
        match collections.get_mut(content_type) {
            Some(collection) => {
                collection.entries.insert(entry.id, entry);
                true
            }
            None => false,
        }
    }

    /// Removes entries and returns the ones that existed.
    pub async fn remove_entries(&self, content_type: &ContentTypeId, ids: &[EntryId]) -> Vec<Entry> {
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(content_type) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| collection.entries.remove(id))
            .collect()
    }

    /// Current content as a snapshot.
    pub async fn snapshot(&self) -> ContentSnapshot {
        let collections = self.collections.read().await;
        ContentSnapshot {
            content_types: collections
                .iter()
                .map(|(uid, c)| ContentTypeSnapshot {
                    uid: uid.clone(),
                    collection_name: c.name.clone(),
                    fields: c.fields.clone(),
                    entries: c.entries.values().cloned().collect(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn content_type_ids(&self) -> RepositoryResult<Vec<ContentTypeId>> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn collection_name(&self, content_type: &ContentTypeId) -> RepositoryResult<Option<String>> {
        Ok(self
            .collections
            .read()
            .await
            .get(content_type)
            .map(|c| c.name.clone()))
    }

    async fn field_names(&self, content_type: &ContentTypeId) -> RepositoryResult<Vec<String>> {
        Ok(self
            .collections
            .read()
            .await
            .get(content_type)
            .map(|c| c.fields.clone())
            .unwrap_or_default())
    }

    async fn count_entries(
        &self,
        content_type: &ContentTypeId,
        filter: &EntryFilter,
        status: PublicationStatus,
    ) -> RepositoryResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(content_type)
            .map_or(0, |c| c.select(filter, status).count() as u64))
    }

    async fn list_entries(
        &self,
        content_type: &ContentTypeId,
        query: &EntryQuery,
    ) -> RepositoryResult<Vec<Entry>> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(content_type) else {
            return Ok(Vec::new());
        };

        let selected = collection.select(&query.filter, query.status);
        let page: Vec<Entry> = match query.sort {
            EntrySort::IdAsc => selected.skip(query.start).take(query.limit).cloned().collect(),
            EntrySort::IdDesc => selected.rev().skip(query.start).take(query.limit).cloned().collect(),
        };
        Ok(page)
    }
}

fn matches_filter(entry: &Entry, filter: &EntryFilter) -> bool {
    match filter {
        EntryFilter::All => true,
        EntryFilter::Ids(ids) => ids.contains(&entry.id),
        EntryFilter::Where(clause) => matches_where(entry, clause),
    }
}

/// Evaluates the subset of CMS `where` clauses the engine forwards:
/// `$and`, `$or`, and per-field equality, `$eq`, `$ne`, `$in`, `$notIn`.
fn matches_where(entry: &Entry, clause: &Value) -> bool {
    let Value::Object(conditions) = clause else {
        return clause.is_null();
    };

    conditions.iter().all(|(key, condition)| match key.as_str() {
        "$and" => condition
            .as_array()
            .is_some_and(|all| all.iter().all(|c| matches_where(entry, c))),
        "$or" => condition
            .as_array()
            .is_some_and(|any| any.iter().any(|c| matches_where(entry, c))),
        field => {
            let value = if field == "id" {
                Some(Value::from(entry.id.get()))
            } else {
                entry.fields.get(field).cloned()
            };
            matches_condition(value.as_ref(), condition)
        }
    })
}

fn matches_condition(value: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) => {
            ops.iter().all(|(op, operand)| apply_operator(value, op, operand))
        }
        expected => values_equal(value, expected),
    }
}

fn apply_operator(value: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$eq" => values_equal(value, operand),
        "$ne" => !values_equal(value, operand),
        "$in" => operand
            .as_array()
            .is_some_and(|list| list.iter().any(|v| values_equal(value, v))),
        "$notIn" => operand
            .as_array()
            .is_none_or(|list| !list.iter().any(|v| values_equal(value, v))),
        "$null" => operand.as_bool().unwrap_or(true) == matches!(value, None | Some(Value::Null)),
        _ => false,
    }
}

/// Equality that treats `5` and `"5"` alike, as CMS query builders do for ids.
fn values_equal(value: Option<&Value>, expected: &Value) -> bool {
    let value = value.unwrap_or(&Value::Null);
    if value == expected {
        return true;
    }
    match (value, expected) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim() == n.to_string()
        }
        _ => false,
    }
}
