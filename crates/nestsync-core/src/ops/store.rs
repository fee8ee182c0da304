use std::collections::{BTreeMap, HashMap};

use super::association::{Association, AssociationCatalog, AssociationSource};
use crate::errors::{Result, SyncError};
use crate::model::{AssociationDef, Attributes, ChildRecord, RecordId, Schema};

/// In-memory store for schema-described records
///
/// A plain HashMap-of-BTreeMaps persistence layer implementing the
/// association contracts. Not thread-safe and without transactions: callers
/// wanting all-or-nothing work on a clone (see [`crate::apply::apply_save`]).
#[derive(Debug, Clone)]
pub struct Store {
    schema: Schema,
    /// Entity name to table
    pub(crate) tables: HashMap<String, Table>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    rows: BTreeMap<RecordId, Attributes>,
    last_id: i64,
}

impl Store {
    /// Create an empty store with one table per schema entity
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the schema fails validation.
    pub fn new(schema: Schema) -> Result<Self> {
        schema.validate()?;
        let tables = schema
            .entities
            .iter()
            .map(|e| (e.name.clone(), Table::default()))
            .collect();
        Ok(Self { schema, tables })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Insert a record, allocating the next integer id
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound`, `UnknownAttribute` or `RecordInvalid`.
    pub fn insert_record(&mut self, entity: &str, attributes: Attributes) -> Result<RecordId> {
        let def = self.schema.entity(entity)?;
        def.validate_attributes(&attributes)?;
        let table = self.table_mut(entity)?;
        table.last_id += 1;
        let id = RecordId::Int(table.last_id);
        table.rows.insert(id.clone(), attributes);
        Ok(id)
    }

    /// Insert a record under a caller-chosen id (e.g. a UUID key)
    ///
    /// # Errors
    ///
    /// Same as [`Store::insert_record`], plus `InvalidId` if the id is taken.
    pub fn insert_record_with_id(
        &mut self,
        entity: &str,
        id: RecordId,
        attributes: Attributes,
    ) -> Result<()> {
        let def = self.schema.entity(entity)?;
        def.validate_attributes(&attributes)?;
        let table = self.table_mut(entity)?;
        if table.rows.contains_key(&id) {
            return Err(SyncError::InvalidId {
                reason: format!("{} with id={} already exists", entity, id),
            });
        }
        if let RecordId::Int(i) = id {
            table.last_id = table.last_id.max(i);
        }
        table.rows.insert(id, attributes);
        Ok(())
    }

    /// Replace the stored attributes of an existing record
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist, plus the validation
    /// errors of [`Store::insert_record`].
    pub fn update_record(
        &mut self,
        entity: &str,
        id: &RecordId,
        attributes: Attributes,
    ) -> Result<()> {
        let def = self.schema.entity(entity)?;
        def.validate_attributes(&attributes)?;
        let row = self
            .table_mut(entity)?
            .rows
            .get_mut(id)
            .ok_or_else(|| SyncError::NotFound {
                entity: entity.to_string(),
                id: id.to_string(),
            })?;
        *row = attributes;
        Ok(())
    }

    /// Insert when `id` is `None`, otherwise merge `attributes` into the
    /// existing record
    ///
    /// # Errors
    ///
    /// See [`Store::insert_record`] and [`Store::update_record`].
    pub fn save_record(
        &mut self,
        entity: &str,
        id: Option<&RecordId>,
        attributes: Attributes,
    ) -> Result<RecordId> {
        match id {
            None => self.insert_record(entity, attributes),
            Some(id) => {
                let mut merged = self.get_record(entity, id)?.clone();
                merged.merge(&attributes);
                self.update_record(entity, id, merged)?;
                Ok(id.clone())
            }
        }
    }

    /// Get a record by id
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `NotFound`.
    pub fn get_record(&self, entity: &str, id: &RecordId) -> Result<&Attributes> {
        self.table(entity)?
            .rows
            .get(id)
            .ok_or_else(|| SyncError::NotFound {
                entity: entity.to_string(),
                id: id.to_string(),
            })
    }

    /// Children of `parent_id` through `association`, ordered by position
    /// when the child entity has one, then by id
    ///
    /// # Errors
    ///
    /// Returns `AssociationNotFound` or `EntityNotFound`.
    pub fn list_children(
        &self,
        entity: &str,
        association: &str,
        parent_id: &RecordId,
    ) -> Result<Vec<ChildRecord>> {
        let def = self.schema.association(entity, association)?;
        let foreign_key = def.foreign_key();
        let mut children: Vec<ChildRecord> = self
            .table(&def.child)?
            .rows
            .iter()
            .filter(|(_, row)| belongs_to(row, &foreign_key, parent_id))
            .map(|(id, row)| ChildRecord::persisted(id.clone(), row.clone()))
            .collect();

        if self.schema.entity(&def.child)?.has_position_column() {
            children.sort_by_key(|c| {
                c.attributes
                    .get(crate::model::POSITION_COLUMN)
                    .and_then(|v| v.as_i64())
                    .unwrap_or(i64::MAX)
            });
        }
        Ok(children)
    }

    /// Number of rows in `entity` (0 for unknown entities)
    pub fn count(&self, entity: &str) -> usize {
        self.tables.get(entity).map_or(0, |t| t.rows.len())
    }

    fn table(&self, entity: &str) -> Result<&Table> {
        self.tables
            .get(entity)
            .ok_or_else(|| SyncError::EntityNotFound {
                entity: entity.to_string(),
            })
    }

    fn table_mut(&mut self, entity: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(entity)
            .ok_or_else(|| SyncError::EntityNotFound {
                entity: entity.to_string(),
            })
    }
}

fn belongs_to(row: &Attributes, foreign_key: &str, parent_id: &RecordId) -> bool {
    row.get(foreign_key)
        .and_then(|v| RecordId::from_value(v).ok().flatten())
        .is_some_and(|id| &id == parent_id)
}

/// Association handle over the in-memory store
pub struct StoreAssociation<'s> {
    store: &'s mut Store,
    def: AssociationDef,
    foreign_key: String,
    has_position: bool,
    parent_id: RecordId,
}

impl Association for StoreAssociation<'_> {
    fn child_entity(&self) -> &str {
        &self.def.child
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
        Ok(self
            .store
            .table(&self.def.child)?
            .rows
            .iter()
            .filter(|(_, row)| belongs_to(row, &self.foreign_key, &self.parent_id))
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn find(&self, id: &RecordId) -> Result<ChildRecord> {
        self.store
            .table(&self.def.child)?
            .rows
            .get(id)
            .filter(|row| belongs_to(row, &self.foreign_key, &self.parent_id))
            .map(|row| ChildRecord::persisted(id.clone(), row.clone()))
            .ok_or_else(|| SyncError::RecordNotFound {
                entity: self.def.child.clone(),
                association: self.def.name.clone(),
                id: id.to_string(),
            })
    }

    fn build(&self) -> ChildRecord {
        let mut attributes = Attributes::new();
        attributes.set(self.foreign_key.clone(), self.parent_id.to_value());
        ChildRecord::new_record(attributes)
    }

    fn save(&mut self, record: &mut ChildRecord) -> Result<RecordId> {
        match &record.id {
            Some(id) => {
                self.store
                    .update_record(&self.def.child, id, record.attributes.clone())?;
                Ok(id.clone())
            }
            None => {
                let id = self
                    .store
                    .insert_record(&self.def.child, record.attributes.clone())?;
                record.id = Some(id.clone());
                Ok(id)
            }
        }
    }

    fn delete_ids(&mut self, ids: &[RecordId]) -> Result<usize> {
        let foreign_key = self.foreign_key.clone();
        let parent_id = self.parent_id.clone();
        let table = self.store.table_mut(&self.def.child)?;
        let mut removed = 0;
        for id in ids {
            let owned = table
                .rows
                .get(id)
                .is_some_and(|row| belongs_to(row, &foreign_key, &parent_id));
            if owned {
                table.rows.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl AssociationSource for Store {
    fn open<'s>(
        &'s mut self,
        entity: &str,
        association: &str,
        parent_id: &RecordId,
    ) -> Result<Box<dyn Association + 's>> {
        let def = self.schema.association(entity, association)?.clone();
        self.get_record(entity, parent_id)?;
        let has_position = self.schema.entity(&def.child)?.has_position_column();
        let foreign_key = def.foreign_key();
        Ok(Box::new(StoreAssociation {
            store: self,
            def,
            foreign_key,
            has_position,
            parent_id: parent_id.clone(),
        }))
    }
}

impl AssociationCatalog for Store {
    fn has_association(&self, entity: &str, association: &str) -> bool {
        self.schema.has_association(entity, association)
    }
}
