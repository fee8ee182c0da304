//! Embedded SQL migrations
//!
//! Bookkeeping tables only; entity tables come from the schema file
//! (see [`crate::tables`]).

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// Get all embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_sync_journal",
            sql: include_str!("../../migrations/001_sync_journal.sql"),
        },
        Migration {
            id: "002_sync_journal_run_index",
            sql: include_str!("../../migrations/002_sync_journal_run_index.sql"),
        },
    ]
}
