//! Authenticated caller identity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The authenticated user attached to a request by the auth middleware.
///
/// Core functions take the principal as an explicit parameter; nothing
/// reads it from ambient state.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}
