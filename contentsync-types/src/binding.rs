//! Bindings between content types and remote indexes.

use crate::ids::ContentTypeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, duplicate-free list of remote index names.
///
/// Every constructor sanitizes: names are trimmed, empty names are dropped
/// and only the first occurrence of a name is kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IndexNames(Vec<String>);

impl IndexNames {
    /// Builds a sanitized list from arbitrary names.
    pub fn sanitize<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let trimmed = name.as_ref().trim();
            if trimmed.is_empty() || out.iter().any(|n| n == trimmed) {
                continue;
            }
            out.push(trimmed.to_string());
        }
        Self(out)
    }

    /// A list holding a single name (sanitized like any other).
    pub fn single(name: impl AsRef<str>) -> Self {
        Self::sanitize([name])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for IndexNames {
    fn from(names: Vec<String>) -> Self {
        Self::sanitize(names)
    }
}

impl From<IndexNames> for Vec<String> {
    fn from(names: IndexNames) -> Self {
        names.0
    }
}

impl<'a> IntoIterator for &'a IndexNames {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The persisted record marking a content type as indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedContentType {
    pub content_type: ContentTypeId,
    /// Empty means every field is searchable.
    #[serde(default)]
    pub searchable_fields: Vec<String>,
}

impl IndexedContentType {
    pub fn new(content_type: ContentTypeId, searchable_fields: Vec<String>) -> Self {
        Self {
            content_type,
            searchable_fields: dedup_fields(searchable_fields),
        }
    }
}

/// Full view of a content type's binding, assembled from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeBinding {
    pub content_type: ContentTypeId,
    pub searchable_fields: Vec<String>,
    pub index_names: IndexNames,
    /// Subscribed to lifecycle events in this process.
    pub listened: bool,
    /// A binding record exists in the store.
    pub indexed: bool,
}

/// Removes duplicate field names, keeping the first occurrence.
pub(crate) fn dedup_fields(fields: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        if !out.contains(&field) {
            out.push(field);
        }
    }
    out
}

/// Credentials for the remote search service.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Base URL of the search service.
    #[serde(default)]
    pub host: String,
    /// Bearer token.
    #[serde(default)]
    pub api_key: String,
}

impl Credentials {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
        }
    }

    /// Whether a host has been configured at all.
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}
