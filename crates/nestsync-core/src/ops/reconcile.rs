//! Nested child reconciliation
//!
//! Brings a parent's has-many children in line with a submitted payload:
//! entries with an id update that child, entries without one create a child,
//! and (unless disabled) children not referenced by any entry are deleted.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Instant;

use super::association::Association;
use crate::config::NestedConfig;
use crate::errors::Result;
use crate::model::{Payload, RecordId, ID_COLUMN, POSITION_COLUMN};
use crate::{log_op_end, log_op_error, log_op_skipped, log_op_start};

/// What one reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Children inserted, in payload order
    pub created: Vec<RecordId>,
    /// Existing children updated, in payload order
    pub updated: Vec<RecordId>,
    /// Children removed because no entry referenced them
    pub deleted: Vec<RecordId>,
    /// Unreferenced children left in place because deletion is disabled
    pub retained: Vec<RecordId>,
    /// Blank entries ignored
    pub skipped_blank: usize,
}

impl ReconcileReport {
    /// True when the pass neither created nor deleted a child
    ///
    /// Updates are not counted: a rerun that rewrites the same children in
    /// place is structurally unchanged even though `updated` is non-empty.
    pub fn is_structural_noop(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }
}

/// Reconcile `association` against `payload`
///
/// A `None` payload means the caller did not submit nested fields for this
/// association; nothing is read or written.
///
/// For every non-blank entry, in order:
/// 1. the foreign key is set to `parent_id` and, when the child entity has a
///    `position` column, `position` is set to the entry's index (blank entries
///    still consume an index);
/// 2. an entry with a non-blank `id` updates that child, which must belong to
///    the parent; any other entry creates a new child.
///
/// Afterwards, if `config` deletes missing children, every child that existed
/// before the pass and was not referenced is deleted.
///
/// # Errors
///
/// * `InvalidId` - an entry's `id` cannot be normalized
/// * `RecordNotFound` - an entry's `id` is not a child of the parent
/// * `RecordInvalid` / `UnknownAttribute` - a child failed validation
/// * `Persistence` - the underlying store failed
///
/// The first error aborts the pass. Writes already made are not undone here;
/// run the pass inside the parent save's transaction for all-or-nothing.
pub fn reconcile(
    association: &mut dyn Association,
    parent_id: &RecordId,
    payload: Option<&Payload>,
    config: &NestedConfig,
) -> Result<ReconcileReport> {
    let Some(payload) = payload else {
        log_op_skipped!(
            "reconcile",
            association = config.association(),
            from = config.from_attribute(),
            parent_id = %parent_id
        );
        return Ok(ReconcileReport::default());
    };

    let start = Instant::now();
    log_op_start!(
        "reconcile",
        association = config.association(),
        parent_id = %parent_id,
        entries = payload.len(),
        delete = config.deletes_missing()
    );

    let result = reconcile_entries(association, parent_id, payload, config);
    let duration_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(report) => {
            log_op_end!(
                "reconcile",
                duration_ms = duration_ms,
                association = config.association(),
                parent_id = %parent_id,
                created = report.created.len(),
                updated = report.updated.len(),
                deleted = report.deleted.len(),
                skipped_blank = report.skipped_blank
            );
        }
        Err(err) => {
            log_op_error!(
                "reconcile",
                err.clone(),
                duration_ms = duration_ms,
                association = config.association(),
                parent_id = %parent_id
            );
        }
    }

    result
}

fn reconcile_entries(
    association: &mut dyn Association,
    parent_id: &RecordId,
    payload: &Payload,
    config: &NestedConfig,
) -> Result<ReconcileReport> {
    let mut unreferenced: BTreeSet<RecordId> = association.current_ids()?.into_iter().collect();
    let with_position = association.has_position_column();
    let foreign_key = association.foreign_key().to_string();
    let mut report = ReconcileReport::default();

    for (index, entry) in payload.iter().enumerate() {
        if entry.is_blank() {
            report.skipped_blank += 1;
            continue;
        }

        let mut attributes = entry.clone();
        let submitted_id = match attributes.remove(ID_COLUMN) {
            Some(raw) => RecordId::from_value(&raw)?,
            None => None,
        };
        attributes.set(foreign_key.clone(), parent_id.to_value());
        if with_position {
            attributes.set(POSITION_COLUMN, Value::from(index as u64));
        }

        let mut record = match &submitted_id {
            Some(id) => association.find(id)?,
            None => association.build(),
        };
        let created = record.is_new_record();
        record.assign(&attributes);
        let id = association.save(&mut record)?;

        tracing::debug!(
            association = association.name(),
            child_id = %id,
            index,
            created,
            "child saved"
        );

        unreferenced.remove(&id);
        if created {
            report.created.push(id);
        } else {
            report.updated.push(id);
        }
    }

    let leftover: Vec<RecordId> = unreferenced.into_iter().collect();
    if config.deletes_missing() {
        if !leftover.is_empty() {
            association.delete_ids(&leftover)?;
        }
        report.deleted = leftover;
    } else {
        report.retained = leftover;
    }

    Ok(report)
}
