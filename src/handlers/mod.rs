pub mod auth;
pub mod health_handlers;
pub mod repo_handlers;
