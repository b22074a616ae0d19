pub mod blob_store;
pub mod keyspace;
pub mod registry;
pub mod reviewer;
