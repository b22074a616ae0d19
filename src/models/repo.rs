//! Repository registry row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One repository owned by exactly one user.
///
/// The registry row is the source of truth for existence and ownership;
/// the object store merely holds keys under the repository's prefix.
/// Rows are created and deleted, never updated in place.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    /// Generated numeric id.
    pub id: i64,

    /// Owning user's id.
    pub user_id: i64,

    /// Display name; uniqueness is checked at create time, not constrained.
    pub repo_name: String,

    /// When the repository was created.
    pub created_at: DateTime<Utc>,
}
