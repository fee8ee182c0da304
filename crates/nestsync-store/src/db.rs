//! Database connection management
//!
//! Opening, configuring and bootstrapping SQLite connections

use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use crate::tables::ensure_tables;
use nestsync_core::Schema;
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path).map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Foreign keys on, WAL journaling
pub fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;

    // In-memory databases keep their "memory" journal mode.
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(from_rusqlite)?;

    Ok(())
}

/// Apply migrations and create every schema table that is missing
pub fn bootstrap(conn: &mut Connection, schema: &Schema) -> Result<()> {
    apply_migrations(conn)?;
    ensure_tables(conn, schema)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestsync_core::model::EntityDef;

    #[test]
    fn test_bootstrap_is_idempotent() {
        let mut conn = open_in_memory().unwrap();
        let schema = Schema::new().with_entity(EntityDef::new("project", &["name"]));
        bootstrap(&mut conn, &schema).unwrap();
        bootstrap(&mut conn, &schema).unwrap();
    }
}
