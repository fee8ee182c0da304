//! Read a parent back with its has-many children

use std::collections::BTreeMap;

use nestsync_core::errors::{ExError, ExErrorKind};
use nestsync_core::{Attributes, ChildRecord, RecordId, Schema};
use nestsync_store::errors::Result;
use nestsync_store::SqliteRepo;
use rusqlite::Connection;
use serde::Serialize;

/// A parent row and the children of each of its associations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedRecord {
    pub entity: String,
    pub id: RecordId,
    pub attributes: Attributes,
    /// Association name to children, ordered by `position` when the child
    /// entity has one, else by id
    pub children: BTreeMap<String, Vec<ChildRecord>>,
}

/// Load `entity` `id` and every association declared on it
///
/// # Errors
///
/// Returns `EntityNotFound` for unknown entities, `NotFound` when the row
/// does not exist, or a persistence error.
pub fn load_with_children(
    conn: &Connection,
    schema: &Schema,
    entity: &str,
    id: &RecordId,
) -> Result<LoadedRecord> {
    let def = schema.entity(entity)?;
    let attributes = SqliteRepo::get_record(conn, def, id)?.ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("load_with_children")
            .with_entity(entity)
            .with_record_id(id.to_string())
            .with_message(format!("{} with id={} not found", entity, id))
    })?;

    let mut children = BTreeMap::new();
    for assoc in schema.associations.iter().filter(|a| a.parent == entity) {
        let rows = SqliteRepo::list_children(conn, schema, assoc, id)?;
        children.insert(assoc.name.clone(), rows);
    }

    Ok(LoadedRecord {
        entity: entity.to_string(),
        id: id.clone(),
        attributes,
        children,
    })
}
