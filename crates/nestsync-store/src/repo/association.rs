//! SQLite implementation of the association collaborator
//!
//! [`SqliteSource`] borrows a connection (usually the engine's open
//! transaction) and hands out [`SqliteAssociation`] handles scoped to one
//! persisted parent.

use crate::repo::sqlite_repo::SqliteRepo;
use nestsync_core::errors::{Result, SyncError};
use nestsync_core::model::{AssociationDef, EntityDef, Schema, POSITION_COLUMN};
use nestsync_core::{Association, AssociationCatalog, AssociationSource, Attributes, ChildRecord, RecordId};
use rusqlite::Connection;

/// Opens association handles over a connection
pub struct SqliteSource<'c> {
    conn: &'c Connection,
    schema: &'c Schema,
}

impl<'c> SqliteSource<'c> {
    pub fn new(conn: &'c Connection, schema: &'c Schema) -> Self {
        Self { conn, schema }
    }
}

impl AssociationSource for SqliteSource<'_> {
    fn open<'s>(
        &'s mut self,
        entity: &str,
        association: &str,
        parent_id: &RecordId,
    ) -> Result<Box<dyn Association + 's>> {
        let def = self.schema.association(entity, association)?.clone();
        let parent = self.schema.entity(entity)?;
        if SqliteRepo::get_record(self.conn, parent, parent_id)?.is_none() {
            return Err(SyncError::NotFound {
                entity: entity.to_string(),
                id: parent_id.to_string(),
            });
        }

        let child = self.schema.entity(&def.child)?.clone();
        let columns = SqliteRepo::table_columns(self.conn, &child.name)?;
        let foreign_key = def.foreign_key();
        if !columns.contains(&foreign_key) {
            return Err(SyncError::InvalidSchema {
                reason: format!(
                    "table '{}' has no foreign key column '{}'",
                    child.name, foreign_key
                ),
            });
        }
        let has_position = child.has_position_column() && columns.contains(POSITION_COLUMN);

        Ok(Box::new(SqliteAssociation {
            conn: self.conn,
            def,
            child,
            foreign_key,
            has_position,
            parent_id: parent_id.clone(),
        }))
    }
}

impl AssociationCatalog for SqliteSource<'_> {
    fn has_association(&self, entity: &str, association: &str) -> bool {
        self.schema.has_association(entity, association)
    }
}

/// One parent's children in SQLite
pub struct SqliteAssociation<'c> {
    conn: &'c Connection,
    def: AssociationDef,
    child: EntityDef,
    foreign_key: String,
    has_position: bool,
    parent_id: RecordId,
}

impl Association for SqliteAssociation<'_> {
    fn child_entity(&self) -> &str {
        &self.child.name
    }

    fn name(&self) -> &str {
        &self.def.name
    }

    fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    fn has_position_column(&self) -> bool {
        self.has_position
    }

    fn current_ids(&self) -> Result<Vec<RecordId>> {
        SqliteRepo::child_ids(self.conn, &self.child.name, &self.foreign_key, &self.parent_id)
    }

    fn find(&self, id: &RecordId) -> Result<ChildRecord> {
        let not_found = || SyncError::RecordNotFound {
            entity: self.child.name.clone(),
            association: self.def.name.clone(),
            id: id.to_string(),
        };

        let row = SqliteRepo::get_record(self.conn, &self.child, id)?.ok_or_else(not_found)?;
        let owner = row
            .get(&self.foreign_key)
            .and_then(|v| RecordId::from_value(v).ok().flatten());
        if owner.as_ref() != Some(&self.parent_id) {
            return Err(not_found());
        }
        Ok(ChildRecord::persisted(id.clone(), row))
    }

    fn build(&self) -> ChildRecord {
        let mut attributes = Attributes::new();
        attributes.set(self.foreign_key.clone(), self.parent_id.to_value());
        ChildRecord::new_record(attributes)
    }

    fn save(&mut self, record: &mut ChildRecord) -> Result<RecordId> {
        match &record.id {
            Some(id) => {
                SqliteRepo::update_record(self.conn, &self.child, id, &record.attributes)?;
                Ok(id.clone())
            }
            None => {
                let id = SqliteRepo::insert_record(self.conn, &self.child, &record.attributes)?;
                record.id = Some(id.clone());
                Ok(id)
            }
        }
    }

    fn delete_ids(&mut self, ids: &[RecordId]) -> Result<usize> {
        SqliteRepo::delete_children(
            self.conn,
            &self.child.name,
            &self.foreign_key,
            &self.parent_id,
            ids,
        )
    }
}
