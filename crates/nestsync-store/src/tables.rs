//! Entity tables from the schema
//!
//! Every entity gets `id INTEGER PRIMARY KEY AUTOINCREMENT` plus one untyped
//! column per declared column; SQLite's dynamic typing stores whatever JSON
//! scalar the caller submitted.

use crate::errors::{from_rusqlite, Result};
use crate::repo::quote;
use nestsync_core::model::{EntityDef, Schema, ID_COLUMN};
use rusqlite::Connection;

/// Create every missing entity table, plus an index on each foreign key
///
/// Existing tables are left as they are; use
/// [`SqliteRepo::table_columns`](crate::repo::SqliteRepo::table_columns) to
/// inspect them.
///
/// # Errors
///
/// Returns a persistence error if any statement fails.
pub fn ensure_tables(conn: &Connection, schema: &Schema) -> Result<()> {
    for entity in &schema.entities {
        conn.execute_batch(&create_table_sql(entity))
            .map_err(from_rusqlite)?;
    }

    for assoc in &schema.associations {
        let foreign_key = assoc.foreign_key();
        conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
            quote(&format!("idx_{}_{}", assoc.child, foreign_key)),
            quote(&assoc.child),
            quote(&foreign_key)
        ))
        .map_err(from_rusqlite)?;
    }

    tracing::debug!(
        entities = schema.entities.len(),
        associations = schema.associations.len(),
        "entity tables ensured"
    );
    Ok(())
}

fn create_table_sql(entity: &EntityDef) -> String {
    let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(ID_COLUMN))];
    columns.extend(entity.columns.iter().map(|c| quote(c)));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        quote(&entity.name),
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::SqliteRepo;
    use nestsync_core::model::AssociationDef;
    use std::collections::BTreeSet;

    fn schema() -> Schema {
        Schema::new()
            .with_entity(EntityDef::new("project", &["name"]))
            .with_entity(EntityDef::new("task", &["project_id", "name", "position"]))
            .with_association(AssociationDef::new("project", "tasks", "task"))
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&EntityDef::new("task", &["project_id", "name"]));
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"task\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"project_id\", \"name\");"
        );
    }

    #[test]
    fn test_create_table_sql_escapes_quotes() {
        let sql = create_table_sql(&EntityDef::new("odd\"name", &["a\"b"]));
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"odd\"\"name\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"a\"\"b\");"
        );
    }

    #[test]
    fn test_ensure_tables_creates_columns() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_tables(&conn, &schema()).unwrap();

        let columns = SqliteRepo::table_columns(&conn, "task").unwrap();
        let expected: BTreeSet<String> = ["id", "project_id", "name", "position"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(columns, expected);
    }

    #[test]
    fn test_table_columns_of_missing_table_is_empty() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteRepo::table_columns(&conn, "nothing").unwrap().is_empty());
    }
}
