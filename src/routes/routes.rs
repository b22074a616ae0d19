//! Route table for the repository file manager.
//!
//! ## Structure
//! - **Health endpoints** (unauthenticated)
//!   - `GET    /healthz` — liveness
//!   - `GET    /readyz`  — readiness (DB + disk probes)
//!
//! - **Repository endpoints** (bearer-token auth)
//!   - `POST   /repos` — create repository
//!   - `GET    /get/repos` — list caller's repositories
//!   - `POST   /repos/{repoId}/push` — multipart batch upload
//!   - `GET    /repos/fetch/{*prefix}` — list folder contents
//!   - `GET    /repos/file-content/{*prefix}` — file + annotations
//!   - `DELETE /repos/delete/{repoId}/{repoName}` — delete repo + objects
//!
//! The wildcard `{*prefix}` carries nested keys like `JaneDoe-1/demo/sub/b.txt`;
//! handlers re-validate it segment by segment before use.

use crate::{
    handlers::{
        auth::require_auth,
        health_handlers::{healthz, readyz},
        repo_handlers::{
            create_repo, delete_repo, fetch_file_content, fetch_listing, list_repos, push_files,
        },
    },
    state::AppState,
};
use axum::{
    Router, middleware,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Ingest batches can carry whole project trees.
const PUSH_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Build and return the router for all endpoints.
///
/// Repository routes share the auth middleware; health endpoints stay open.
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/repos", post(create_repo))
        .route("/get/repos", get(list_repos))
        .route(
            "/repos/{repoId}/push",
            post(push_files).layer(DefaultBodyLimit::max(PUSH_BODY_LIMIT)),
        )
        .route("/repos/fetch/{*prefix}", get(fetch_listing))
        .route("/repos/file-content/{*prefix}", get(fetch_file_content))
        .route("/repos/delete/{repoId}/{repoName}", delete(delete_repo))
        .layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(protected)
}
