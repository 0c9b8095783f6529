//! SQLite attachment index with FTS5 full-text search.
//!
//! This module provides:
//! - The schema version gate and destructive rebuild
//! - Full-text records and per-resource index times
//! - Query building for the FTS5 `MATCH` operator

mod query;
mod schema;
mod store;

pub use query::{build_column_match, build_match_expression, escape_fts5_term};
pub use schema::SchemaManager;
pub use store::{IndexStatus, IndexStore, SearchMatch};
