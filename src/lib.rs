//! Repository file manager: a relational registry of user repositories plus
//! an object store mapping hierarchical folder paths onto a flat key
//! namespace, with an external code-review annotator on file views.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
