//! After-save hook runner
//!
//! Called by the caller's own save logic once the parent row is persisted.
//! Runs every declared reconciliation for the parent entity, in declaration
//! order, reading the matching payloads from the form and clearing it after.

use serde::Serialize;

use crate::config::NestedRegistry;
use crate::errors::Result;
use crate::form::SubmittedForm;
use crate::model::RecordId;
use crate::ops::association::AssociationSource;
use crate::ops::reconcile::{reconcile, ReconcileReport};

/// Lifecycle of the nested sync for one save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Parent saved, hook not yet run
    Pending,
    /// Hook completed
    Done,
}

/// Report for one declared association
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationReport {
    pub association: String,
    pub callback: String,
    /// False when no payload was submitted and the association was left alone
    pub ran: bool,
    pub report: ReconcileReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AfterSaveOutcome {
    pub state: SyncState,
    pub reports: Vec<AssociationReport>,
}

impl AfterSaveOutcome {
    pub fn pending() -> Self {
        Self {
            state: SyncState::Pending,
            reports: Vec::new(),
        }
    }

    pub fn report_for(&self, association: &str) -> Option<&AssociationReport> {
        self.reports.iter().find(|r| r.association == association)
    }
}

/// Run the nested reconciliations declared for `entity`
///
/// Each declaration reads the payload under its own `from` name, so several
/// associations may share one transient attribute. On success the form is
/// left empty, so payloads never outlive the save.
///
/// # Errors
///
/// Propagates the first error from opening an association or reconciling it;
/// later associations are not run.
pub fn run_after_save(
    registry: &NestedRegistry,
    source: &mut dyn AssociationSource,
    entity: &str,
    parent_id: &RecordId,
    form: &mut SubmittedForm,
) -> Result<AfterSaveOutcome> {
    let mut outcome = AfterSaveOutcome::pending();

    let configs = registry.configs_for(entity);
    for config in configs {
        let payload = form.raw(config.from_attribute());
        let ran = payload.is_some();
        let report = match payload {
            Some(payload) => {
                let mut association = source.open(entity, config.association(), parent_id)?;
                reconcile(association.as_mut(), parent_id, Some(payload), config)?
            }
            None => ReconcileReport::default(),
        };
        outcome.reports.push(AssociationReport {
            association: config.association().to_string(),
            callback: config.callback_name(),
            ran,
            report,
        });
    }

    let undeclared: Vec<&String> = form
        .attribute_names()
        .filter(|name| !configs.iter().any(|c| c.from_attribute() == name.as_str()))
        .collect();
    if !undeclared.is_empty() {
        tracing::warn!(
            entity,
            ?undeclared,
            "discarding payloads with no nested declaration"
        );
    }
    form.clear();
    outcome.state = SyncState::Done;
    Ok(outcome)
}
