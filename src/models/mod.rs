//! Core data models for the repository file manager.
//!
//! Registry and object rows map to SQLite tables via `sqlx::FromRow`;
//! listing entries and annotations are transient API shapes serialized
//! with `serde`.

pub mod annotation;
pub mod listing;
pub mod object;
pub mod principal;
pub mod repo;
