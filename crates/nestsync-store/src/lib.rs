//! nestsync store - SQLite persistence for nested reconciliation
//!
//! Provides:
//! - Schema file loading (YAML) and entity table creation
//! - Migrations framework for the bookkeeping tables
//! - Generic row repository and the SQLite association collaborator
//! - Sync journal recording each reconciliation

pub mod db;
pub mod errors;
pub mod journal;
pub mod migrations;
pub mod repo;
pub mod schema_loader;
pub mod tables;

// Re-export key types
pub use errors::Result;
pub use journal::JournalEntry;
pub use repo::{SqliteAssociation, SqliteRepo, SqliteSource};
