//! Entity and association definitions
//!
//! A `Schema` describes the tables the host persistence layer knows about,
//! the has-many associations between them, and which associations accept
//! nested attributes. It is usually loaded from a YAML file by the store
//! crate, but can be built in code for tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::attributes::Attributes;
use crate::config::{NestedConfig, NestedRegistry};
use crate::errors::{Result, SyncError};
use crate::ops::association::AssociationCatalog;

/// Primary key column of every entity
pub const ID_COLUMN: &str = "id";

/// Ordinal column; children get their payload index written here when present
pub const POSITION_COLUMN: &str = "position";

/// A table and its assignable columns (the `id` column is implicit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    pub columns: Vec<String>,
    /// Columns that must be present and non-blank on every save
    #[serde(default)]
    pub required: Vec<String>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            required: Vec::new(),
        }
    }

    pub fn with_required(mut self, required: &[&str]) -> Self {
        self.required = required.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn has_position_column(&self) -> bool {
        self.has_column(POSITION_COLUMN)
    }

    /// Reject unknown columns and blank required columns
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` for the first undeclared key, otherwise
    /// `RecordInvalid` listing every blank required column.
    pub fn validate_attributes(&self, attributes: &Attributes) -> Result<()> {
        if let Some(unknown) = attributes.keys().find(|k| !self.has_column(k)) {
            return Err(SyncError::UnknownAttribute {
                entity: self.name.clone(),
                attribute: unknown.clone(),
            });
        }

        let errors: Vec<String> = self
            .required
            .iter()
            .filter(|column| attributes.is_blank_at(column))
            .map(|column| format!("{} can't be blank", column))
            .collect();
        if !errors.is_empty() {
            return Err(SyncError::RecordInvalid {
                entity: self.name.clone(),
                errors,
            });
        }
        Ok(())
    }
}

/// A has-many association from `parent` to `child`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDef {
    pub parent: String,
    pub name: String,
    pub child: String,
    /// Column on the child referencing the parent's id
    /// (defaults to `<parent>_id`)
    #[serde(default)]
    pub foreign_key: Option<String>,
}

impl AssociationDef {
    pub fn new(parent: impl Into<String>, name: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
            child: child.into(),
            foreign_key: None,
        }
    }

    pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn foreign_key(&self) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_id", self.parent))
    }
}

/// One nested-attributes declaration as written in a schema file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedDecl {
    pub entity: String,
    pub association: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub delete: Option<bool>,
}

impl NestedDecl {
    pub fn to_config(&self) -> NestedConfig {
        let mut config = NestedConfig::new(self.association.clone());
        if let Some(from) = &self.from {
            config = config.from(from.clone());
        }
        if let Some(delete) = self.delete {
            config = config.delete(delete);
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
    #[serde(default)]
    pub nested: Vec<NestedDecl>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_association(mut self, association: AssociationDef) -> Self {
        self.associations.push(association);
        self
    }

    pub fn with_nested(mut self, decl: NestedDecl) -> Self {
        self.nested.push(decl);
        self
    }

    /// Look up an entity by name
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if no entity has this name.
    pub fn entity(&self, name: &str) -> Result<&EntityDef> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| SyncError::EntityNotFound {
                entity: name.to_string(),
            })
    }

    /// Look up a has-many association declared on `parent`
    ///
    /// # Errors
    ///
    /// Returns `AssociationNotFound` if `parent` has no association `name`.
    pub fn association(&self, parent: &str, name: &str) -> Result<&AssociationDef> {
        self.associations
            .iter()
            .find(|a| a.parent == parent && a.name == name)
            .ok_or_else(|| SyncError::AssociationNotFound {
                entity: parent.to_string(),
                association: name.to_string(),
            })
    }

    /// Check internal consistency
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for duplicate entities, reserved or duplicate
    /// columns, required columns that are not columns, associations whose
    /// parent/child is unknown or whose foreign key is not a child column,
    /// and nested declarations that name an unknown association.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| SyncError::InvalidSchema { reason };

        let mut names = BTreeSet::new();
        for entity in &self.entities {
            if entity.name.trim().is_empty() || !is_identifier(&entity.name) {
                return Err(invalid(format!("invalid entity name '{}'", entity.name)));
            }
            if !names.insert(entity.name.as_str()) {
                return Err(invalid(format!("entity '{}' defined twice", entity.name)));
            }
            let mut columns = BTreeSet::new();
            for column in &entity.columns {
                if column == ID_COLUMN {
                    return Err(invalid(format!(
                        "entity '{}' must not declare the implicit '{}' column",
                        entity.name, ID_COLUMN
                    )));
                }
                if !is_identifier(column) {
                    return Err(invalid(format!(
                        "invalid column name '{}' on '{}'",
                        column, entity.name
                    )));
                }
                if !columns.insert(column.as_str()) {
                    return Err(invalid(format!(
                        "column '{}' defined twice on '{}'",
                        column, entity.name
                    )));
                }
            }
            for required in &entity.required {
                if !entity.has_column(required) {
                    return Err(invalid(format!(
                        "required column '{}' is not a column of '{}'",
                        required, entity.name
                    )));
                }
            }
        }

        for assoc in &self.associations {
            let child = self.entity(&assoc.child).map_err(|_| {
                invalid(format!(
                    "association '{}.{}' targets unknown entity '{}'",
                    assoc.parent, assoc.name, assoc.child
                ))
            })?;
            self.entity(&assoc.parent).map_err(|_| {
                invalid(format!(
                    "association '{}' declared on unknown entity '{}'",
                    assoc.name, assoc.parent
                ))
            })?;
            let foreign_key = assoc.foreign_key();
            if !child.has_column(&foreign_key) {
                return Err(invalid(format!(
                    "foreign key '{}' is not a column of '{}'",
                    foreign_key, child.name
                )));
            }
        }

        for decl in &self.nested {
            self.association(&decl.entity, &decl.association)?;
        }

        Ok(())
    }

    /// Build the nested-attributes registry from the `nested` section
    ///
    /// # Errors
    ///
    /// Returns `AssociationNotFound` or `DuplicateDeclaration` as raised by
    /// [`NestedRegistry::declare`].
    pub fn registry(&self) -> Result<NestedRegistry> {
        let mut registry = NestedRegistry::new();
        for decl in &self.nested {
            registry.declare(self, &decl.entity, decl.to_config())?;
        }
        Ok(registry)
    }
}

impl AssociationCatalog for Schema {
    fn has_association(&self, entity: &str, association: &str) -> bool {
        self.association(entity, association).is_ok()
    }
}

/// Names end up in generated SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is allowed.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
