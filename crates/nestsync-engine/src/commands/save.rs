//! Parent save with nested reconciliation
//!
//! ## Pipeline (one transaction):
//! 1. Insert or merge-update the parent row
//! 2. Run every nested declaration for the entity (after-save hook)
//! 3. Journal each reconciliation that ran
//! 4. Commit
//!
//! Any error drops the transaction, so a child failing validation leaves
//! neither the parent change nor the earlier children behind.

use std::time::Instant;

use nestsync_core::errors::{ExError, ExErrorKind};
use nestsync_core::{
    log_op_end, log_op_error, log_op_start, run_after_save, AfterSaveOutcome, Attributes,
    NestedRegistry, RecordId, Schema, SubmittedForm,
};
use nestsync_core_types::SaveContext;
use nestsync_store::errors::{from_rusqlite, Result};
use nestsync_store::journal::record_sync;
use nestsync_store::{SqliteRepo, SqliteSource};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parent save with its submitted nested payloads
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub entity: String,
    /// `None` creates a new parent
    pub id: Option<RecordId>,
    pub attributes: Attributes,
    pub form: SubmittedForm,
    pub context: SaveContext,
}

/// Wire shape of a save: `{"attributes": {...}, "nested": {"<from>": payload}}`
#[derive(Debug, Default, Deserialize)]
struct FormInput {
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    nested: Option<Value>,
}

impl SaveRequest {
    pub fn new(entity: impl Into<String>, id: Option<RecordId>, attributes: Attributes) -> Self {
        Self {
            entity: entity.into(),
            id,
            attributes,
            form: SubmittedForm::new(),
            context: SaveContext::new(),
        }
    }

    pub fn with_form(mut self, form: SubmittedForm) -> Self {
        self.form = form;
        self
    }

    pub fn with_context(mut self, context: SaveContext) -> Self {
        self.context = context;
        self
    }

    /// Build a request from form JSON
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the document does not have the form shape,
    /// or `InvalidPayload` if a nested payload cannot be decoded.
    pub fn from_form_json(
        entity: impl Into<String>,
        id: Option<RecordId>,
        value: Value,
    ) -> Result<Self> {
        let input: FormInput = serde_json::from_value(value).map_err(|e| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_form")
                .with_message(e.to_string())
        })?;
        let form = match input.nested {
            Some(nested) => SubmittedForm::from_json(nested)?,
            None => SubmittedForm::new(),
        };
        Ok(Self::new(entity, id, input.attributes).with_form(form))
    }
}

/// Result of a committed save
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub entity: String,
    pub id: RecordId,
    /// True when the parent row was inserted by this save
    pub created: bool,
    pub run_id: String,
    pub outcome: AfterSaveOutcome,
    /// Journal rows written, one per reconciliation that ran
    pub journal_ids: Vec<i64>,
}

/// Save a parent and reconcile its nested associations atomically
///
/// # Errors
///
/// Returns the first error from the parent save, any reconciliation or the
/// journal, tagged with the run's correlation ids. Nothing is committed.
pub fn save_with_nested(
    conn: &mut Connection,
    schema: &Schema,
    registry: &NestedRegistry,
    request: SaveRequest,
) -> Result<SaveOutcome> {
    let start = Instant::now();
    let run_id = request.context.run_id.clone();
    let trace_id = request.context.trace_id.clone();
    log_op_start!(
        "save_with_nested",
        entity = request.entity.as_str(),
        run_id = run_id.as_str()
    );

    let entity = request.entity.clone();
    let result = run_save(conn, schema, registry, request).map_err(|err| {
        let err = err.with_run_id(run_id.clone());
        match trace_id {
            Some(trace_id) => err.with_trace_id(trace_id),
            None => err,
        }
    });

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(saved) => {
            log_op_end!(
                "save_with_nested",
                duration_ms = duration_ms,
                entity = entity.as_str(),
                parent_id = %saved.id,
                run_id = run_id.as_str(),
                created = saved.created
            );
        }
        Err(err) => {
            log_op_error!(
                "save_with_nested",
                err.clone(),
                duration_ms = duration_ms,
                entity = entity.as_str(),
                run_id = run_id.as_str()
            );
        }
    }
    result
}

fn run_save(
    conn: &mut Connection,
    schema: &Schema,
    registry: &NestedRegistry,
    request: SaveRequest,
) -> Result<SaveOutcome> {
    let SaveRequest {
        entity,
        id,
        attributes,
        mut form,
        context,
    } = request;
    let def = schema.entity(&entity)?;

    let tx = conn.transaction().map_err(from_rusqlite)?;

    let created = id.is_none();
    let id = SqliteRepo::save_record(&tx, def, id.as_ref(), &attributes)?;

    let outcome = {
        let mut source = SqliteSource::new(&tx, schema);
        run_after_save(registry, &mut source, &entity, &id, &mut form)?
    };

    let mut journal_ids = Vec::new();
    for report in outcome.reports.iter().filter(|r| r.ran) {
        journal_ids.push(record_sync(&tx, &context, &entity, &id, report)?);
    }

    tx.commit().map_err(from_rusqlite)?;

    Ok(SaveOutcome {
        entity,
        id,
        created,
        run_id: context.run_id.as_str().to_string(),
        outcome,
        journal_ids,
    })
}
