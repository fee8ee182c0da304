//! Nested-attributes declarations
//!
//! A declaration says: "when an `entity` record is saved, reconcile its
//! `association` children from the payload held under `from`". Declarations
//! are collected once at setup into a [`NestedRegistry`] that is passed to
//! whatever code runs the after-save hook.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::{Result, SyncError};
use crate::ops::association::AssociationCatalog;

/// Configuration for one nested association
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedConfig {
    association: String,
    from: String,
    delete: bool,
}

impl NestedConfig {
    /// Defaults: payload read from `_<association>`, missing children deleted
    pub fn new(association: impl Into<String>) -> Self {
        let association = association.into();
        Self {
            from: format!("_{}", association),
            association,
            delete: true,
        }
    }

    /// Name of the transient attribute holding the submitted payload
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Whether children absent from the payload are deleted
    pub fn delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn association(&self) -> &str {
        &self.association
    }

    pub fn from_attribute(&self) -> &str {
        &self.from
    }

    pub fn deletes_missing(&self) -> bool {
        self.delete
    }

    /// Name of the after-save callback that reconciles this association
    pub fn callback_name(&self) -> String {
        format!("reconcile_{}", self.association)
    }
}

/// Read-only view of a declaration, as exposed to callers for introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub entity: String,
    pub association: String,
    pub from: String,
    pub callback: String,
    pub delete: bool,
}

/// Declarations per parent entity, in declaration order
#[derive(Debug, Clone, Default)]
pub struct NestedRegistry {
    declarations: BTreeMap<String, Vec<NestedConfig>>,
}

impl NestedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare nested attributes for `entity`
    ///
    /// # Errors
    ///
    /// * `AssociationNotFound` - if `catalog` has no such association on `entity`
    /// * `DuplicateDeclaration` - if the association is already declared
    pub fn declare(
        &mut self,
        catalog: &dyn AssociationCatalog,
        entity: &str,
        config: NestedConfig,
    ) -> Result<()> {
        if !catalog.has_association(entity, config.association()) {
            return Err(SyncError::AssociationNotFound {
                entity: entity.to_string(),
                association: config.association().to_string(),
            });
        }

        let configs = self.declarations.entry(entity.to_string()).or_default();
        if configs
            .iter()
            .any(|c| c.association() == config.association())
        {
            return Err(SyncError::DuplicateDeclaration {
                entity: entity.to_string(),
                association: config.association().to_string(),
            });
        }

        tracing::debug!(
            entity,
            association = config.association(),
            from = config.from_attribute(),
            delete = config.deletes_missing(),
            "nested attributes declared"
        );
        configs.push(config);
        Ok(())
    }

    /// Configuration of one declared association
    pub fn config(&self, entity: &str, association: &str) -> Option<&NestedConfig> {
        self.configs_for(entity)
            .iter()
            .find(|c| c.association() == association)
    }

    /// All configurations for `entity` in declaration order
    pub fn configs_for(&self, entity: &str) -> &[NestedConfig] {
        self.declarations
            .get(entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Flattened view of every declaration, ordered by entity
    pub fn declarations(&self) -> Vec<Declaration> {
        self.declarations
            .iter()
            .flat_map(|(entity, configs)| {
                configs.iter().map(move |c| Declaration {
                    entity: entity.clone(),
                    association: c.association().to_string(),
                    from: c.from_attribute().to_string(),
                    callback: c.callback_name(),
                    delete: c.deletes_missing(),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.values().all(Vec::is_empty)
    }
}
