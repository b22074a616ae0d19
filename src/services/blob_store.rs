//! BlobStore — flat-keyspace object storage backed by SQLite for metadata
//! and local disk for payloads. Payloads are sharded beneath
//! `base_path/{shard}/{shard}/{key}` to keep directory fan-out bounded.
//!
//! The store knows nothing about repositories or owners; it speaks keys,
//! prefixes and delimiters only. Key semantics live in `keyspace`.

use crate::models::object::StoredObject;
use bytes::Bytes;
use chrono::Utc;
use md5::Context;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    collections::BTreeSet,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
pub struct ListResult {
    pub objects: Vec<StoredObject>,
    pub common_prefixes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{key}` not found")]
    ObjectNotFound { key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Durable object storage with four operations: put, get, list, delete-many.
///
/// Each operation is individually atomic (one upsert, one rename) but there
/// are no transactions spanning several of them; callers own any
/// cross-operation consistency.
#[derive(Clone)]
pub struct BlobStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl BlobStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects keys that begin with `/` or contain `..`. The key mapper
    /// sanitizes caller input before keys reach here; this is the last
    /// line of defense.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StoreError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") || key.contains("//") {
            return Err(StoreError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(key) and returns the first two bytes as lowercase
    /// hexadecimal strings (00–ff).
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified payload path:
    /// `base_path/{shard}/{shard}/{key}`. Parent directories may not exist yet.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    async fn fetch_object(&self, key: &str) -> StoreResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(
            "SELECT id, key, filename, content_type, size_bytes, etag, last_modified
             FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::ObjectNotFound {
                key: key.to_string(),
            },
            other => StoreError::Sqlx(other),
        })
    }

    /// Write an object payload to disk and upsert its metadata row.
    ///
    /// - Writes to a temporary file, fsyncs, then renames into place.
    /// - Re-putting an existing key overwrites (no duplicate rows).
    /// - Cleans up the temp file when the metadata upsert fails.
    pub async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> StoreResult<StoredObject> {
        self.ensure_key_safe(key)?;

        let file_path = self.object_path(key);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| StoreError::Io(io::Error::other("object path missing parent")))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut digest = Context::new();
        digest.consume(&body);
        if let Err(err) = file.write_all(&body).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        let filename = key.rsplit('/').next().unwrap_or(key).to_string();
        let etag = format!("{:x}", digest.compute());
        let size_bytes = body.len() as i64;

        let insert_result = sqlx::query_as::<_, StoredObject>(
            r#"
            INSERT INTO objects (id, key, filename, content_type, size_bytes, etag, last_modified)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                filename = excluded.filename,
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            RETURNING id, key, filename, content_type, size_bytes, etag, last_modified
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key)
        .bind(&filename)
        .bind(content_type)
        .bind(size_bytes)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(obj) => Ok(obj),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    /// Fetch an object for reading.
    ///
    /// Returns metadata and an opened File handle. Reports ObjectNotFound
    /// when metadata exists but the physical file is missing.
    pub async fn get_reader(&self, key: &str) -> StoreResult<(StoredObject, File)> {
        self.ensure_key_safe(key)?;
        let object = self.fetch_object(key).await?;

        let file_path = self.object_path(key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::ObjectNotFound {
                    key: key.to_string(),
                }
            } else {
                StoreError::Io(err)
            }
        })?;

        Ok((object, file))
    }

    /// List immediate matches under `prefix`.
    ///
    /// With a delimiter, keys containing the delimiter past the prefix are
    /// grouped into synthetic common prefixes (S3 list semantics); other
    /// keys come back as objects. Both groups are in key order.
    pub async fn list(&self, prefix: &str, delimiter: Option<&str>) -> StoreResult<ListResult> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, key, filename, content_type, size_bytes, etag, last_modified
             FROM objects",
        );
        if !prefix.is_empty() {
            builder.push(" WHERE key LIKE ");
            builder.push_bind(format!("{}%", escape_like(prefix)));
            builder.push(" ESCAPE '\\'");
        }
        builder.push(" ORDER BY key ASC");

        let rows: Vec<StoredObject> = builder.build_query_as().fetch_all(&*self.db).await?;

        let mut objects = Vec::new();
        let mut common_prefixes = BTreeSet::new();
        for obj in rows {
            if let Some(delim) = delimiter {
                if let Some(grouped) = compute_common_prefix(&obj.key, prefix, delim) {
                    common_prefixes.insert(grouped);
                    continue;
                }
            }
            objects.push(obj);
        }

        Ok(ListResult {
            objects,
            common_prefixes: common_prefixes.into_iter().collect(),
        })
    }

    /// Enumerate all keys under `prefix`, deepest included.
    pub async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM objects WHERE key LIKE ? ESCAPE '\\' ORDER BY key ASC",
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&*self.db)
        .await?;
        Ok(keys)
    }

    /// Bulk-delete objects by key: metadata rows in one statement, payload
    /// files best-effort afterwards. Returns the number of rows removed.
    pub async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("DELETE FROM objects WHERE key IN (");
        let mut separated = builder.separated(", ");
        for key in keys {
            separated.push_bind(key.as_str());
        }
        builder.push(")");
        let result = builder.build().execute(&*self.db).await?;

        for key in keys {
            let file_path = self.object_path(key);
            match fs::remove_file(&file_path).await {
                Ok(_) => debug!("removed physical file {}", file_path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("file {} already missing", file_path.display());
                }
                Err(err) => {
                    debug!("failed to remove {}: {}", file_path.display(), err);
                }
            }
            if let Some(parent) = file_path.parent() {
                self.prune_empty_dirs(parent).await;
            }
        }

        Ok(result.rows_affected())
    }

    /// Recursively remove empty directories up to the store root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

/// Escape SQL LIKE wildcards so a prefix only ever matches literally.
/// Owner labels and repo names may legitimately contain `_` (and `%`);
/// without this, `my_app/` would also match `myxapp/`.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Compute a synthetic "common prefix" for delimiter-grouped listings.
///
/// Returns Some(prefix) when the key belongs to a grouped prefix under the
/// requested one, otherwise None.
fn compute_common_prefix(key: &str, requested_prefix: &str, delimiter: &str) -> Option<String> {
    let after_prefix = key.strip_prefix(requested_prefix)?;

    let pos = after_prefix.find(delimiter)?;
    let mut combined = String::with_capacity(requested_prefix.len() + pos + delimiter.len());
    combined.push_str(requested_prefix);
    combined.push_str(&after_prefix[..pos + delimiter.len()]);
    Some(combined)
}
