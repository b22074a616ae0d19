//! Shared application state handed to every handler.

use crate::services::{blob_store::BlobStore, registry::RepoRegistry, reviewer::CodeReviewer};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Process-wide singletons: the SQLite pool, the object store and the
/// external reviewer client. All cheaply cloneable; each request borrows a
/// pooled connection per call, no extra locking needed.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub store: BlobStore,
    pub registry: RepoRegistry,
    pub reviewer: CodeReviewer,
}
