//! CMS entries.

use crate::ids::EntryId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the publication timestamp. `null` or absent means draft.
pub const PUBLISHED_AT_FIELD: &str = "publishedAt";

/// A single entry of a content type, as read from the content repository.
///
/// The raw primary key lives in `id`; every other attribute, including the
/// publication marker, lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Primary key.
    pub id: EntryId,
    /// All other attributes.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entry {
    /// Creates an entry with no fields.
    pub fn new(id: u64) -> Self {
        Self {
            id: EntryId::new(id),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Marks the entry as published at the given timestamp.
    #[must_use]
    pub fn published(self, at: impl Into<String>) -> Self {
        self.with_field(PUBLISHED_AT_FIELD, at.into())
    }

    /// Returns whether the entry carries a publication timestamp.
    pub fn is_published(&self) -> bool {
        !matches!(self.fields.get(PUBLISHED_AT_FIELD), None | Some(Value::Null))
    }

    /// Parses an entry from an arbitrary JSON record. The record must be an
    /// object with an `id` that is a non-negative integer (or numeric string).
    pub fn from_json(value: Value) -> crate::Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(crate::Error::NotAnObject);
        };
        let raw_id = fields
            .remove("id")
            .ok_or_else(|| crate::Error::InvalidEntryId("missing".to_string()))?;
        let id = EntryId::from_json(&raw_id)
            .ok_or_else(|| crate::Error::InvalidEntryId(raw_id.to_string()))?;
        Ok(Self { id, fields })
    }
}
