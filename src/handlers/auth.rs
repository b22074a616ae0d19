//! Bearer-token auth middleware.
//!
//! Looks the token up in the `users` table and injects the matching
//! `Principal` as a request extension; everything else is rejected with
//! 401 before any core logic runs. Token issuance happens out of band.

use crate::{errors::ApiError, models::principal::Principal, state::AppState};
use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(unauthorized)?;

    let principal = sqlx::query_as::<_, Principal>(
        "SELECT id, first_name, last_name FROM users WHERE api_token = ?",
    )
    .bind(token)
    .fetch_optional(&*state.db)
    .await
    .map_err(|err| {
        tracing::error!("auth lookup failed: {}", err);
        ApiError::internal()
    })?
    .ok_or_else(unauthorized)?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn unauthorized() -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        "Authentication required",
    )
}
