//! HTTP handlers for the repository surface: registry CRUD, bulk ingest,
//! prefix listing and the annotated file view.
//!
//! Validation runs before any store call. Store and reviewer internals are
//! logged server-side; clients only ever see the safe envelope.

use crate::{
    errors::ApiError,
    models::principal::Principal,
    services::keyspace,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncReadExt;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepoReq {
    pub repo_name: String,
}

/// POST `/repos` — create a repository for the caller.
pub async fn create_repo(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateRepoReq>,
) -> Result<impl IntoResponse, ApiError> {
    let repo_name = payload.repo_name.trim();
    if repo_name.is_empty() {
        return Err(ApiError::validation("repoName is required"));
    }
    if repo_name.contains('/') || repo_name.contains('\\') || repo_name.contains("..") {
        return Err(ApiError::validation("repoName contains invalid characters"));
    }

    let repo = state.registry.create(&principal, repo_name).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Repository created successfully",
        "repoId": repo.id,
        "userId": repo.user_id,
        "repoName": repo.repo_name,
    })))
}

/// GET `/get/repos` — list the caller's repositories.
pub async fn list_repos(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let repos = state.registry.list_for_owner(principal.id).await?;
    Ok(Json(json!({ "success": true, "repos": repos })))
}

/// POST `/repos/{repoId}/push` — multipart batch upload.
///
/// Expects positionally paired `paths` text fields and `files` file parts.
/// Uploads run concurrently; a partial failure reports the failed paths
/// while already-persisted files stay put (keys are deterministic, so
/// retrying only the failed paths is safe).
pub async fn push_files(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(repo_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let repo_id: i64 = repo_id
        .parse()
        .map_err(|_| ApiError::validation("Invalid repoId"))?;

    let mut paths: Vec<String> = Vec::new();
    let mut files: Vec<(Option<String>, Bytes)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::debug!("malformed multipart body: {}", err);
        ApiError::validation("Malformed multipart body")
    })? {
        match field.name() {
            Some("paths") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::validation("Invalid file paths provided"))?;
                paths.push(text);
            }
            Some("files") => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::validation("Could not read uploaded file"))?;
                files.push((content_type, data));
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(ApiError::validation("No files uploaded"));
    }
    if paths.len() != files.len() {
        return Err(ApiError::validation("Invalid file paths provided"));
    }
    ensure_pushable_paths(&paths)?;

    let repo = state.registry.find_by_id(repo_id).await?;
    let owner_label = keyspace::owner_bucket_label(
        &principal.first_name,
        &principal.last_name,
        repo.user_id,
    );

    let uploads = paths
        .iter()
        .zip(files)
        .map(|(relative_path, (content_type, data))| {
            let key = keyspace::to_storage_key(&owner_label, &repo.repo_name, relative_path);
            let store = state.store.clone();
            let relative_path = relative_path.clone();
            async move {
                tracing::debug!("uploading `{}`", key);
                store
                    .put(&key, data, content_type)
                    .await
                    .map_err(|err| (relative_path, err))
            }
        });

    let results = futures::future::join_all(uploads).await;
    let failed: Vec<String> = results
        .into_iter()
        .filter_map(|result| result.err())
        .map(|(path, err)| {
            tracing::error!("upload of `{}` failed: {}", path, err);
            path
        })
        .collect();

    if !failed.is_empty() {
        let body = Json(json!({
            "success": false,
            "errorCode": "UPLOAD_FAILED",
            "message": "Some files failed to upload",
            "failed": failed,
        }));
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, body).into_response());
    }

    Ok(Json(json!({
        "success": true,
        "message": "All files uploaded successfully",
    }))
    .into_response())
}

/// GET `/repos/fetch/{*prefix}` — list the immediate children of a folder.
pub async fn fetch_listing(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let prefix = validated_prefix(&prefix)?;

    let items = keyspace::list_children(&state.store, &prefix)
        .await
        .map_err(|err| {
            tracing::error!("listing `{}` failed: {}", prefix, err);
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "LIST_FAILED",
                "Failed to list files",
            )
        })?;

    Ok(Json(json!({ "success": true, "items": items })))
}

/// GET `/repos/file-content/{*prefix}` — file content plus reviewer
/// annotations. A reviewer failure degrades to an empty annotation set;
/// the content is still served.
pub async fn fetch_file_content(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = validated_prefix(&prefix)?;

    let (object, mut file) = state.store.get_reader(&key).await?;
    let mut raw = Vec::with_capacity(object.size_bytes.max(0) as usize);
    file.read_to_end(&mut raw).await.map_err(|err| {
        tracing::error!("reading `{}` failed: {}", key, err);
        ApiError::internal()
    })?;
    let file_content = String::from_utf8_lossy(&raw).into_owned();

    let ai_suggestions = state.reviewer.review(&object.filename, &file_content).await;

    Ok(Json(json!({
        "success": true,
        "fileName": object.filename,
        "model": state.reviewer.model(),
        "fileContent": file_content,
        "aiSuggestions": ai_suggestions,
    })))
}

/// DELETE `/repos/delete/{repoId}/{repoName}` — remove the registry row,
/// then best-effort delete every object under the repo's prefix.
pub async fn delete_repo(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((repo_id, repo_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let repo_id: i64 = repo_id
        .parse()
        .map_err(|_| ApiError::validation("Invalid repoId"))?;

    state.registry.delete(&principal, repo_id, &repo_name).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Repository deleted successfully!",
    })))
}

/// Reject declared paths that normalize to nothing (e.g. `"../"`): such a
/// path would resolve to the bare `owner/repo` key, a file entry shadowing
/// the repository folder itself.
fn ensure_pushable_paths(paths: &[String]) -> Result<(), ApiError> {
    for path in paths {
        if keyspace::normalize_relative_path(path).is_empty() {
            return Err(ApiError::validation("Invalid file paths provided"));
        }
    }
    Ok(())
}

/// Validate a wildcard-captured prefix as an explicit segment list before
/// use: no empty, `.`, `..` or backslash-bearing segments.
fn validated_prefix(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::validation("A path is required"));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    for segment in &segments {
        if segment.is_empty()
            || *segment == "."
            || *segment == ".."
            || segment.contains('\\')
            || segment.bytes().any(|b| b.is_ascii_control())
        {
            return Err(ApiError::validation("Invalid path segment"));
        }
    }
    Ok(segments.join("/"))
}
