//! SQLite repository for schema-described records
//!
//! Generic row access: every method takes the `EntityDef` (or table name)
//! it works on. Methods accept `&Connection`, so they run equally on a
//! `Transaction` through deref. Results use the domain error type so the
//! association collaborator can surface them to the reconciler unchanged.

use std::collections::BTreeSet;

use crate::errors::sync_persistence;
use crate::repo::quote;
use crate::repo::values::{from_sql, id_from_sql, id_to_sql, to_sql};
use nestsync_core::errors::{Result, SyncError};
use nestsync_core::model::{AssociationDef, EntityDef, Schema, ID_COLUMN, POSITION_COLUMN};
use nestsync_core::{Attributes, ChildRecord, RecordId};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

/// SQLite repository for entity rows
pub struct SqliteRepo;

impl SqliteRepo {
    /// Column names of `table`, from `PRAGMA table_info` (empty if no such table)
    pub fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote(table)))
            .map_err(|e| sync_persistence("table_columns", e))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| sync_persistence("table_columns", e))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .map_err(|e| sync_persistence("table_columns", e))?;
        Ok(columns)
    }

    /// Insert a row, returning its allocated id
    pub fn insert_record(
        conn: &Connection,
        def: &EntityDef,
        attributes: &Attributes,
    ) -> Result<RecordId> {
        Self::validate(conn, def, attributes)?;

        let sql = if attributes.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(&def.name))
        } else {
            let columns: Vec<String> = attributes.keys().map(|k| quote(k)).collect();
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(&def.name),
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        let values: Vec<SqlValue> = attributes.iter().map(|(_, v)| to_sql(v)).collect();

        conn.execute(&sql, params_from_iter(values))
            .map_err(|e| sync_persistence("insert_record", e))?;
        Ok(RecordId::Int(conn.last_insert_rowid()))
    }

    /// Write `attributes` over an existing row
    ///
    /// `attributes` must be the complete set to validate (required columns
    /// absent from it are reported blank); use [`SqliteRepo::save_record`] to
    /// merge a partial update first.
    pub fn update_record(
        conn: &Connection,
        def: &EntityDef,
        id: &RecordId,
        attributes: &Attributes,
    ) -> Result<()> {
        Self::validate(conn, def, attributes)?;

        let not_found = || SyncError::NotFound {
            entity: def.name.clone(),
            id: id.to_string(),
        };

        if attributes.is_empty() {
            return match Self::get_record(conn, def, id)? {
                Some(_) => Ok(()),
                None => Err(not_found()),
            };
        }

        let assignments: Vec<String> = attributes
            .keys()
            .enumerate()
            .map(|(i, k)| format!("{} = ?{}", quote(k), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote(&def.name),
            assignments.join(", "),
            quote(ID_COLUMN),
            assignments.len() + 1
        );
        let mut values: Vec<SqlValue> = attributes.iter().map(|(_, v)| to_sql(v)).collect();
        values.push(id_to_sql(id));

        let changed = conn
            .execute(&sql, params_from_iter(values))
            .map_err(|e| sync_persistence("update_record", e))?;
        if changed == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    /// Insert when `id` is `None`, otherwise merge `attributes` into the
    /// stored row and write it back
    pub fn save_record(
        conn: &Connection,
        def: &EntityDef,
        id: Option<&RecordId>,
        attributes: &Attributes,
    ) -> Result<RecordId> {
        match id {
            None => Self::insert_record(conn, def, attributes),
            Some(id) => {
                let mut merged =
                    Self::get_record(conn, def, id)?.ok_or_else(|| SyncError::NotFound {
                        entity: def.name.clone(),
                        id: id.to_string(),
                    })?;
                merged.merge(attributes);
                Self::update_record(conn, def, id, &merged)?;
                Ok(id.clone())
            }
        }
    }

    /// Get a row's declared columns by id
    pub fn get_record(
        conn: &Connection,
        def: &EntityDef,
        id: &RecordId,
    ) -> Result<Option<Attributes>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            quote(&def.name),
            quote(ID_COLUMN)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| sync_persistence("get_record", e))?;
        let names = column_names(&stmt);
        stmt.query_row([id_to_sql(id)], |row| Ok(read_row(row, &names, def).1))
            .optional()
            .map_err(|e| sync_persistence("get_record", e))
    }

    /// Children of `parent_id` through `assoc`, ordered by `position` when
    /// the child has one, then by id
    pub fn list_children(
        conn: &Connection,
        schema: &Schema,
        assoc: &AssociationDef,
        parent_id: &RecordId,
    ) -> Result<Vec<ChildRecord>> {
        let child = schema.entity(&assoc.child)?;
        let columns = Self::table_columns(conn, &child.name)?;
        let order = if child.has_position_column() && columns.contains(POSITION_COLUMN) {
            format!("{}, {}", quote(POSITION_COLUMN), quote(ID_COLUMN))
        } else {
            quote(ID_COLUMN)
        };
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {}",
            quote(&child.name),
            quote(&assoc.foreign_key()),
            order
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| sync_persistence("list_children", e))?;
        let names = column_names(&stmt);
        let rows = stmt
            .query_map([id_to_sql(parent_id)], |row| Ok(read_row(row, &names, child)))
            .map_err(|e| sync_persistence("list_children", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sync_persistence("list_children", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, attributes)| id.map(|id| ChildRecord::persisted(id, attributes)))
            .collect())
    }

    /// Ids of rows in `table` whose `foreign_key` equals `parent_id`
    pub fn child_ids(
        conn: &Connection,
        table: &str,
        foreign_key: &str,
        parent_id: &RecordId,
    ) -> Result<Vec<RecordId>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY {}",
            quote(ID_COLUMN),
            quote(table),
            quote(foreign_key),
            quote(ID_COLUMN)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| sync_persistence("child_ids", e))?;
        let ids = stmt
            .query_map([id_to_sql(parent_id)], |row| Ok(id_from_sql(row.get_ref(0)?)))
            .map_err(|e| sync_persistence("child_ids", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sync_persistence("child_ids", e))?;
        Ok(ids.into_iter().flatten().collect())
    }

    /// Delete the listed rows that still belong to `parent_id`
    pub fn delete_children(
        conn: &Connection,
        table: &str,
        foreign_key: &str,
        parent_id: &RecordId,
        ids: &[RecordId],
    ) -> Result<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
            quote(table),
            quote(ID_COLUMN),
            quote(foreign_key)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| sync_persistence("delete_children", e))?;
        let mut removed = 0;
        for id in ids {
            removed += stmt
                .execute([id_to_sql(id), id_to_sql(parent_id)])
                .map_err(|e| sync_persistence("delete_children", e))?;
        }
        Ok(removed)
    }

    /// Number of rows in `table`
    pub fn count(conn: &Connection, table: &str) -> Result<usize> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", quote(table)), [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n.max(0) as usize)
        .map_err(|e| sync_persistence("count", e))
    }

    /// Schema validation, then a check that every attribute is a real column
    fn validate(conn: &Connection, def: &EntityDef, attributes: &Attributes) -> Result<()> {
        def.validate_attributes(attributes)?;
        let columns = Self::table_columns(conn, &def.name)?;
        if columns.is_empty() {
            return Err(SyncError::Persistence {
                op: "validate".to_string(),
                message: format!("table '{}' does not exist", def.name),
            });
        }
        if let Some(missing) = attributes.keys().find(|k| !columns.contains(*k)) {
            return Err(SyncError::UnknownAttribute {
                entity: def.name.clone(),
                attribute: missing.clone(),
            });
        }
        Ok(())
    }
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

/// Split a `SELECT *` row into its id and the entity's declared columns
fn read_row(row: &Row<'_>, names: &[String], def: &EntityDef) -> (Option<RecordId>, Attributes) {
    let mut id = None;
    let mut attributes = Attributes::new();
    for (index, name) in names.iter().enumerate() {
        let Ok(value) = row.get_ref(index) else {
            continue;
        };
        if name == ID_COLUMN {
            id = id_from_sql(value);
        } else if def.has_column(name) {
            attributes.set(name.clone(), from_sql(value));
        }
    }
    (id, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ensure_tables;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .with_entity(EntityDef::new("project", &["name"]).with_required(&["name"]))
            .with_entity(EntityDef::new("task", &["project_id", "name", "position"]))
            .with_association(AssociationDef::new("project", "tasks", "task"))
    }

    fn setup() -> (Connection, Schema) {
        let conn = Connection::open_in_memory().unwrap();
        let schema = schema();
        ensure_tables(&conn, &schema).unwrap();
        (conn, schema)
    }

    fn attrs(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => Attributes::from(map),
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let (conn, schema) = setup();
        let project = schema.entity("project").unwrap();

        let id = SqliteRepo::insert_record(&conn, project, &attrs(json!({"name": "P"}))).unwrap();
        assert_eq!(id, RecordId::Int(1));

        let row = SqliteRepo::get_record(&conn, project, &id).unwrap().unwrap();
        assert_eq!(row.get("name"), Some(&json!("P")));
        assert!(!row.contains_key("id"));
    }

    #[test]
    fn test_get_missing_is_none() {
        let (conn, schema) = setup();
        let project = schema.entity("project").unwrap();
        assert!(SqliteRepo::get_record(&conn, project, &RecordId::Int(5))
            .unwrap()
            .is_none());
        assert!(SqliteRepo::get_record(&conn, project, &RecordId::Key("abc".to_string()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_save_record_merges() {
        let (conn, schema) = setup();
        let task = schema.entity("task").unwrap();
        let id = SqliteRepo::insert_record(
            &conn,
            task,
            &attrs(json!({"project_id": 1, "name": "a", "position": 0})),
        )
        .unwrap();

        SqliteRepo::save_record(&conn, task, Some(&id), &attrs(json!({"name": "b"}))).unwrap();

        let row = SqliteRepo::get_record(&conn, task, &id).unwrap().unwrap();
        assert_eq!(row.get("name"), Some(&json!("b")));
        assert_eq!(row.get("position"), Some(&json!(0)));
    }

    #[test]
    fn test_update_missing_row_is_not_found() {
        let (conn, schema) = setup();
        let project = schema.entity("project").unwrap();
        let err = SqliteRepo::update_record(
            &conn,
            project,
            &RecordId::Int(9),
            &attrs(json!({"name": "x"})),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[test]
    fn test_required_validation() {
        let (conn, schema) = setup();
        let project = schema.entity("project").unwrap();
        let err =
            SqliteRepo::insert_record(&conn, project, &attrs(json!({"name": null}))).unwrap_err();
        assert!(matches!(err, SyncError::RecordInvalid { .. }));
        assert_eq!(SqliteRepo::count(&conn, "project").unwrap(), 0);
    }

    #[test]
    fn test_stale_table_rejects_new_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE project (id INTEGER PRIMARY KEY AUTOINCREMENT)")
            .unwrap();
        let project = EntityDef::new("project", &["name"]);

        let err =
            SqliteRepo::insert_record(&conn, &project, &attrs(json!({"name": "P"}))).unwrap_err();
        assert!(matches!(err, SyncError::UnknownAttribute { ref attribute, .. } if attribute == "name"));
    }

    #[test]
    fn test_list_children_orders_by_position() {
        let (conn, schema) = setup();
        let task = schema.entity("task").unwrap();
        for (name, position) in [("c", 2), ("a", 0), ("b", 1)] {
            SqliteRepo::insert_record(
                &conn,
                task,
                &attrs(json!({"project_id": 1, "name": name, "position": position})),
            )
            .unwrap();
        }
        SqliteRepo::insert_record(&conn, task, &attrs(json!({"project_id": 2, "name": "x"})))
            .unwrap();

        let assoc = schema.association("project", "tasks").unwrap();
        let names: Vec<_> = SqliteRepo::list_children(&conn, &schema, assoc, &RecordId::Int(1))
            .unwrap()
            .into_iter()
            .map(|c| c.attributes.get("name").cloned().unwrap())
            .collect();
        assert_eq!(names, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn test_delete_children_is_scoped_to_parent() {
        let (conn, schema) = setup();
        let task = schema.entity("task").unwrap();
        let mine = SqliteRepo::insert_record(&conn, task, &attrs(json!({"project_id": 1})))
            .unwrap();
        let theirs = SqliteRepo::insert_record(&conn, task, &attrs(json!({"project_id": 2})))
            .unwrap();

        let removed = SqliteRepo::delete_children(
            &conn,
            "task",
            "project_id",
            &RecordId::Int(1),
            &[mine, theirs.clone()],
        )
        .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            SqliteRepo::child_ids(&conn, "task", "project_id", &RecordId::Int(2)).unwrap(),
            vec![theirs]
        );
    }
}
