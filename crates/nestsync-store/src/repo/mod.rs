//! Repository layer: generic row access and the association collaborator

mod association;
mod sqlite_repo;
mod values;

pub use association::{SqliteAssociation, SqliteSource};
pub use sqlite_repo::SqliteRepo;

/// Quote an SQL identifier, doubling any embedded quote
pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
