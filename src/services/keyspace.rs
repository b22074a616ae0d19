//! Key Namespace Mapper — bidirectional mapping between logical folder
//! paths and the store's flat key space.
//!
//! Keys have the shape `{ownerBucketLabel}/{repoName}/{relativePath...}`,
//! forward-slash delimited regardless of the client OS. Folders are not
//! stored; they are inferred from common prefixes at listing time.

use crate::{
    models::listing::ListingEntry,
    services::blob_store::{BlobStore, StoreResult},
};

/// Label namespacing one owner's repositories inside the shared keyspace.
///
/// Derived from the display name and numeric id, e.g. `JaneDoe-1`. Slashes
/// and whitespace are stripped from the name parts so the label is always a
/// single key segment. Renaming a user does not migrate existing keys.
pub fn owner_bucket_label(first_name: &str, last_name: &str, owner_id: i64) -> String {
    let clean = |s: &str| {
        s.chars()
            .filter(|c| !c.is_whitespace() && *c != '/' && *c != '\\')
            .collect::<String>()
    };
    format!("{}{}-{}", clean(first_name), clean(last_name), owner_id)
}

/// Normalize a client-supplied relative path into forward-slash segments,
/// dropping empty, `.` and `..` segments (anti-traversal).
pub fn normalize_relative_path(relative_path: &str) -> String {
    relative_path
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical storage key for one file inside a repository.
///
/// The result has no leading slash and no double slashes, and always stays
/// within the `ownerLabel/repoName/` prefix.
pub fn to_storage_key(owner_label: &str, repo_name: &str, relative_path: &str) -> String {
    let safe_path = normalize_relative_path(relative_path);
    if safe_path.is_empty() {
        format!("{}/{}", owner_label, repo_name)
    } else {
        format!("{}/{}/{}", owner_label, repo_name, safe_path)
    }
}

/// The key prefix covering every object of one repository.
pub fn repo_prefix(owner_label: &str, repo_name: &str) -> String {
    format!("{}/{}/", owner_label, repo_name)
}

/// Normalize a listing prefix to end with the delimiter (when non-empty).
pub fn normalize_prefix(prefix: &str) -> String {
    if !prefix.is_empty() && !prefix.ends_with('/') {
        format!("{}/", prefix)
    } else {
        prefix.to_string()
    }
}

/// List the immediate children under `prefix`: synthetic folders first
/// (one per common prefix), then files, each group in the store's native
/// key order. The prefix's own marker object, if any, is excluded.
pub async fn list_children(store: &BlobStore, prefix: &str) -> StoreResult<Vec<ListingEntry>> {
    let prefix = normalize_prefix(prefix);
    let listed = store.list(&prefix, Some("/")).await?;

    let mut items: Vec<ListingEntry> = listed
        .common_prefixes
        .iter()
        .map(|full| {
            let name = full
                .strip_prefix(prefix.as_str())
                .unwrap_or(full)
                .trim_end_matches('/');
            ListingEntry::folder(name, full.clone())
        })
        .collect();

    items.extend(
        listed
            .objects
            .iter()
            .filter(|obj| obj.key != prefix)
            .map(|obj| {
                let name = obj.key.strip_prefix(prefix.as_str()).unwrap_or(&obj.key);
                ListingEntry::file(name, obj.key.clone(), obj.size_bytes)
            }),
    );

    Ok(items)
}
