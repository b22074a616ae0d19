//! API error envelope shared by all handlers.
//!
//! Every failure leaving the service is `{success: false, errorCode,
//! message}` with an HTTP status from the taxonomy: validation (400),
//! unauthorized (401), not-found (404), conflict (409), everything else
//! (500). Internal error text is logged server-side and never leaked.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{blob_store::StoreError, registry::RegistryError};

/// A client-safe error carrying the HTTP status and a stable error code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: msg.into(),
        }
    }

    /// 400 — malformed or missing request fields.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
    }

    /// 404 — repository or file key absent.
    pub fn not_found(error_code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_code, msg)
    }

    /// 409 — duplicate repository name.
    pub fn conflict(error_code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, error_code, msg)
    }

    /// 500 — unexpected/internal; the caller logs the real cause.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "SERVER_ERROR",
            "Internal Server Error",
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "errorCode": self.error_code,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ObjectNotFound { key } => {
                tracing::debug!("object `{}` not found", key);
                ApiError::not_found("FILE_NOT_FOUND", "File not found")
            }
            StoreError::InvalidObjectKey => ApiError::validation("Invalid file path"),
            other => {
                tracing::error!("storage failure: {}", other);
                ApiError::internal()
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NameTaken(_) => {
                ApiError::conflict("REPO_FOUND", "Repository already exists")
            }
            RegistryError::RepoNotFound => {
                ApiError::not_found("REPO_NOT_FOUND", "Repository not found!")
            }
            other => {
                tracing::error!("registry failure: {}", other);
                ApiError::internal()
            }
        }
    }
}
