//! Repository Registry — CRUD-lite lifecycle for repository metadata.
//!
//! The `repos` table is authoritative for existence and ownership. Create
//! and delete are two-phase against the object store: the row always moves
//! first, storage objects follow best-effort. A delete whose storage
//! cleanup fails leaves orphaned objects behind; that residual risk is
//! accepted and not retried.

use crate::{
    config::RepoNameScope,
    models::{principal::Principal, repo::Repo},
    services::{
        blob_store::{BlobStore, StoreError},
        keyspace,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("repository `{0}` already exists")]
    NameTaken(String),
    #[error("repository not found")]
    RepoNotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Clone)]
pub struct RepoRegistry {
    db: Arc<SqlitePool>,
    store: BlobStore,
    name_scope: RepoNameScope,
}

impl RepoRegistry {
    pub fn new(db: Arc<SqlitePool>, store: BlobStore, name_scope: RepoNameScope) -> Self {
        Self {
            db,
            store,
            name_scope,
        }
    }

    /// Create a repository for the calling user.
    ///
    /// Fails with NameTaken when a repository with that name already exists
    /// in the configured scope (global namespace or per owner). The check
    /// is a lookup rather than a constraint, so two concurrent creates may
    /// both pass it. No storage objects are created: an empty repository
    /// has zero backing objects until the first push.
    pub async fn create(&self, principal: &Principal, repo_name: &str) -> RegistryResult<Repo> {
        let existing: Option<i64> = match self.name_scope {
            RepoNameScope::Global => {
                sqlx::query_scalar("SELECT id FROM repos WHERE repo_name = ?")
                    .bind(repo_name)
                    .fetch_optional(&*self.db)
                    .await?
            }
            RepoNameScope::PerOwner => {
                sqlx::query_scalar("SELECT id FROM repos WHERE repo_name = ? AND user_id = ?")
                    .bind(repo_name)
                    .bind(principal.id)
                    .fetch_optional(&*self.db)
                    .await?
            }
        };
        if existing.is_some() {
            return Err(RegistryError::NameTaken(repo_name.to_string()));
        }

        let repo = sqlx::query_as::<_, Repo>(
            "INSERT INTO repos (user_id, repo_name, created_at) VALUES (?, ?, ?)
             RETURNING id, user_id, repo_name, created_at",
        )
        .bind(principal.id)
        .bind(repo_name)
        .bind(chrono::Utc::now())
        .fetch_one(&*self.db)
        .await?;

        debug!("created repository `{}` (id {})", repo.repo_name, repo.id);
        Ok(repo)
    }

    /// All repositories owned by the given user, data-layer order.
    pub async fn list_for_owner(&self, owner_id: i64) -> RegistryResult<Vec<Repo>> {
        let repos = sqlx::query_as::<_, Repo>(
            "SELECT id, user_id, repo_name, created_at FROM repos WHERE user_id = ?",
        )
        .bind(owner_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(repos)
    }

    /// Look up a repository by id alone (used by ingest, which only needs
    /// existence).
    pub async fn find_by_id(&self, repo_id: i64) -> RegistryResult<Repo> {
        sqlx::query_as::<_, Repo>(
            "SELECT id, user_id, repo_name, created_at FROM repos WHERE id = ?",
        )
        .bind(repo_id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(RegistryError::RepoNotFound)
    }

    /// Delete a repository and best-effort clean up its storage prefix.
    ///
    /// The row must match `(owner, id, name)` in one statement — the
    /// compound match prevents deleting another user's repository by
    /// guessing an id. After the row is gone, every key under the
    /// owner/repo prefix is enumerated and bulk-deleted; zero keys skip the
    /// bulk-delete call. Cleanup failure does not roll the row back.
    pub async fn delete(
        &self,
        principal: &Principal,
        repo_id: i64,
        repo_name: &str,
    ) -> RegistryResult<()> {
        let result =
            sqlx::query("DELETE FROM repos WHERE user_id = ? AND id = ? AND repo_name = ?")
                .bind(principal.id)
                .bind(repo_id)
                .bind(repo_name)
                .execute(&*self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::RepoNotFound);
        }

        let owner_label = keyspace::owner_bucket_label(
            &principal.first_name,
            &principal.last_name,
            principal.id,
        );
        let prefix = keyspace::repo_prefix(&owner_label, repo_name);

        match self.store.list_keys(&prefix).await {
            Ok(keys) if keys.is_empty() => {
                debug!("no objects under `{}`; skipping bulk delete", prefix);
            }
            Ok(keys) => match self.store.delete_many(&keys).await {
                Ok(removed) => debug!("removed {} objects under `{}`", removed, prefix),
                Err(err) => {
                    warn!("storage cleanup under `{}` failed: {}", prefix, err);
                }
            },
            Err(err) => {
                warn!("listing `{}` for cleanup failed: {}", prefix, err);
            }
        }

        Ok(())
    }
}
