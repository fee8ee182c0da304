//! Functional-boundary save for the in-memory store
//!
//! [`apply_save`] persists a parent record and runs its nested
//! reconciliations against a working copy of the store. The caller's store is
//! only replaced when everything succeeded, which gives the in-memory backend
//! the same all-or-nothing behaviour a database transaction gives SQLite.
//!
//! ```
//! use nestsync_core::apply::{apply_save, SaveCommand};
//! use nestsync_core::model::{AssociationDef, EntityDef, Payload, Schema};
//! use nestsync_core::{NestedConfig, NestedRegistry, Store, SubmittedForm};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .with_entity(EntityDef::new("project", &["name"]))
//!     .with_entity(EntityDef::new("task", &["project_id", "name"]))
//!     .with_association(AssociationDef::new("project", "tasks", "task"));
//! let mut registry = NestedRegistry::new();
//! registry.declare(&schema, "project", NestedConfig::new("tasks")).unwrap();
//! let store = Store::new(schema).unwrap();
//!
//! let mut form = SubmittedForm::new();
//! form.set("_tasks", Payload::from_json("_tasks", json!([{"name": "write docs"}])).unwrap());
//! let cmd = SaveCommand::create("project", [("name", json!("Docs"))].into_iter().collect())
//!     .with_form(form);
//!
//! let (store, saved) = apply_save(&store, &registry, cmd).unwrap();
//! assert_eq!(store.count("task"), 1);
//! assert_eq!(saved.outcome.reports[0].report.created.len(), 1);
//! ```

use std::time::Instant;

use crate::config::NestedRegistry;
use crate::errors::Result;
use crate::form::SubmittedForm;
use crate::hooks::{run_after_save, AfterSaveOutcome};
use crate::model::{Attributes, RecordId};
use crate::ops::Store;
use crate::{log_op_end, log_op_error, log_op_start};

/// A parent save with its submitted nested payloads
#[derive(Debug, Clone)]
pub struct SaveCommand {
    pub entity: String,
    /// `None` creates a new parent
    pub id: Option<RecordId>,
    pub attributes: Attributes,
    pub form: SubmittedForm,
}

impl SaveCommand {
    pub fn create(entity: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            entity: entity.into(),
            id: None,
            attributes,
            form: SubmittedForm::new(),
        }
    }

    pub fn update(entity: impl Into<String>, id: RecordId, attributes: Attributes) -> Self {
        Self {
            entity: entity.into(),
            id: Some(id),
            attributes,
            form: SubmittedForm::new(),
        }
    }

    pub fn with_form(mut self, form: SubmittedForm) -> Self {
        self.form = form;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AppliedSave {
    /// Id of the saved parent
    pub id: RecordId,
    pub outcome: AfterSaveOutcome,
}

/// Save a parent and reconcile its nested associations
///
/// Returns the new store state; `state` itself is never modified, so on error
/// the caller still holds the unchanged previous state.
///
/// # Errors
///
/// Returns any error from saving the parent (validation, unknown parent id)
/// or from the after-save reconciliations.
pub fn apply_save(
    state: &Store,
    registry: &NestedRegistry,
    cmd: SaveCommand,
) -> Result<(Store, AppliedSave)> {
    let start = Instant::now();
    let SaveCommand {
        entity,
        id,
        attributes,
        mut form,
    } = cmd;
    log_op_start!("apply_save", entity = entity.as_str());

    let mut working = state.clone();
    let result = working
        .save_record(&entity, id.as_ref(), attributes)
        .and_then(|id| {
            let outcome = run_after_save(registry, &mut working, &entity, &id, &mut form)?;
            Ok(AppliedSave { id, outcome })
        });

    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(applied) => {
            log_op_end!(
                "apply_save",
                duration_ms = duration_ms,
                entity = entity.as_str(),
                parent_id = %applied.id
            );
            Ok((working, applied))
        }
        Err(err) => {
            log_op_error!(
                "apply_save",
                err.clone(),
                duration_ms = duration_ms,
                entity = entity.as_str()
            );
            Err(err)
        }
    }
}
