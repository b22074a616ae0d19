//! Transient folder-listing entries.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// One immediate child of a listed prefix.
///
/// Folders are synthetic: they are common prefixes grouped by the listing
/// delimiter, not stored objects. Entries are produced per request and
/// never persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ListingEntry {
    /// Display name relative to the listed prefix (no slashes).
    pub name: String,

    /// Full storage key (folders keep their trailing slash).
    pub key: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Payload size; folders have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

impl ListingEntry {
    pub fn folder(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            kind: EntryKind::Folder,
            size: None,
        }
    }

    pub fn file(name: impl Into<String>, key: impl Into<String>, size: i64) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            kind: EntryKind::File,
            size: Some(size),
        }
    }
}
