//! Metadata row for one stored object (blob payloads live on disk).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for a single object, addressed by its globally unique key.
///
/// Re-uploading the same key overwrites this row (and the payload) rather
/// than creating a second entry.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct StoredObject {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Full storage key, e.g. `JaneDoe-1/demo/sub/b.txt`.
    pub key: String,

    /// Last key segment, kept for display.
    pub filename: String,

    /// Content type (MIME type), when the uploader declared one.
    pub content_type: Option<String>,

    /// Payload size in bytes.
    pub size_bytes: i64,

    /// Hex MD5 of the payload.
    pub etag: String,

    /// Timestamp of the last write to this key.
    pub last_modified: DateTime<Utc>,
}
