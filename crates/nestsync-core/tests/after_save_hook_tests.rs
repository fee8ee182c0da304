//! After-save hook tests
//!
//! ## Scenarios Covered
//!
//! 1. Declared associations run in declaration order with their own config
//! 2. Associations without a payload are reported but not touched
//! 3. Custom `from` names are honoured
//! 4. The form is consumed, including undeclared payloads
//! 5. The first failing association stops the hook
//! 6. Two associations declared with the same `from` both read its payload

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{attrs, payload, project_registry, project_schema, store_with_tasks, task_names};
use nestsync_core::model::{AssociationDef, EntityDef, Schema};
use nestsync_core::{
    run_after_save, NestedConfig, NestedRegistry, RecordId, Store, SubmittedForm, SyncError,
    SyncState,
};
use serde_json::json;

#[test]
fn test_hook_runs_declarations_in_order() {
    // GIVEN a project with tasks A, B
    let (mut store, project) = store_with_tasks(&["A", "B"]);
    let registry = project_registry(&project_schema());

    // WHEN both payloads are submitted
    let mut form = SubmittedForm::new();
    form.set("_tasks", payload("_tasks", json!([{"id": 2, "name": "B"}])));
    form.set("note_rows", payload("note_rows", json!([{"body": "hello"}])));
    let outcome = run_after_save(&registry, &mut store, "project", &project, &mut form).unwrap();

    // THEN both ran, in declaration order
    assert_eq!(outcome.state, SyncState::Done);
    let names: Vec<&str> = outcome.reports.iter().map(|r| r.association.as_str()).collect();
    assert_eq!(names, vec!["tasks", "notes"]);
    assert_eq!(outcome.reports[0].callback, "reconcile_tasks");
    assert!(outcome.reports.iter().all(|r| r.ran));

    let tasks = outcome.report_for("tasks").unwrap();
    assert_eq!(tasks.report.deleted, vec![RecordId::Int(1)]);
    assert_eq!(task_names(&store, &project), vec!["B"]);
    assert_eq!(store.count("note"), 1);
}

#[test]
fn test_missing_payload_leaves_association_alone() {
    let (mut store, project) = store_with_tasks(&["A", "B"]);
    let registry = project_registry(&project_schema());

    let mut form = SubmittedForm::new();
    form.set("note_rows", payload("note_rows", json!([{"body": "only notes"}])));
    let outcome = run_after_save(&registry, &mut store, "project", &project, &mut form).unwrap();

    let tasks = outcome.report_for("tasks").unwrap();
    assert!(!tasks.ran);
    assert_eq!(tasks.report, Default::default());
    assert_eq!(task_names(&store, &project), vec!["A", "B"]);
}

#[test]
fn test_default_from_name_is_ignored_for_custom_declaration() {
    let (mut store, project) = store_with_tasks(&[]);
    let registry = project_registry(&project_schema());

    // notes are declared with from = note_rows, so _notes is undeclared
    let mut form = SubmittedForm::new();
    form.set("_notes", payload("_notes", json!([{"body": "lost"}])));
    let outcome = run_after_save(&registry, &mut store, "project", &project, &mut form).unwrap();

    assert!(!outcome.report_for("notes").unwrap().ran);
    assert_eq!(store.count("note"), 0);
    assert!(form.is_empty());
}

#[test]
fn test_form_is_consumed() {
    let (mut store, project) = store_with_tasks(&["A"]);
    let registry = project_registry(&project_schema());

    let mut form = SubmittedForm::new();
    form.set("_tasks", payload("_tasks", json!([{"id": 1, "name": "A2"}])));
    run_after_save(&registry, &mut store, "project", &project, &mut form).unwrap();

    assert!(form.is_empty());
    assert!(form.raw("_tasks").is_none());
}

#[test]
fn test_undeclared_entity_runs_nothing() {
    let (mut store, project) = store_with_tasks(&["A"]);
    let registry = project_registry(&project_schema());

    let mut form = SubmittedForm::new();
    form.set("_tasks", payload("_tasks", json!([])));
    let outcome = run_after_save(&registry, &mut store, "task", &RecordId::Int(1), &mut form).unwrap();

    assert!(outcome.reports.is_empty());
    assert_eq!(outcome.state, SyncState::Done);
    assert_eq!(task_names(&store, &project), vec!["A"]);
}

#[test]
fn test_failing_association_stops_later_ones() {
    let (mut store, project) = store_with_tasks(&["A"]);
    let registry = project_registry(&project_schema());

    let mut form = SubmittedForm::new();
    form.set("_tasks", payload("_tasks", json!([{"id": 42, "name": "ghost"}])));
    form.set("note_rows", payload("note_rows", json!([{"body": "never"}])));
    let err = run_after_save(&registry, &mut store, "project", &project, &mut form).unwrap_err();

    assert!(matches!(err, SyncError::RecordNotFound { ref id, .. } if id == "42"));
    assert_eq!(store.count("note"), 0);
}

#[test]
fn test_unsaved_parent_cannot_be_reconciled() {
    let (mut store, _) = store_with_tasks(&[]);
    let registry = project_registry(&project_schema());

    let mut form = SubmittedForm::new();
    form.set("_tasks", payload("_tasks", json!([{"name": "orphan"}])));
    let err = run_after_save(&registry, &mut store, "project", &RecordId::Int(7), &mut form)
        .unwrap_err();

    assert!(matches!(err, SyncError::NotFound { .. }));
    assert_eq!(store.count("task"), 0);
}

#[test]
fn test_shared_from_feeds_every_declaration() {
    // GIVEN tasks and labels both declared to read the "rows" attribute
    let schema = Schema::new()
        .with_entity(EntityDef::new("project", &["name"]))
        .with_entity(EntityDef::new("task", &["project_id", "name"]))
        .with_entity(EntityDef::new("label", &["project_id", "name"]))
        .with_association(AssociationDef::new("project", "tasks", "task"))
        .with_association(AssociationDef::new("project", "labels", "label"));
    let mut registry = NestedRegistry::new();
    registry
        .declare(&schema, "project", NestedConfig::new("tasks").from("rows"))
        .unwrap();
    registry
        .declare(&schema, "project", NestedConfig::new("labels").from("rows"))
        .unwrap();
    let mut store = Store::new(schema).unwrap();
    let project = store
        .insert_record("project", attrs(json!({"name": "P"})))
        .unwrap();

    // WHEN one payload is submitted under "rows"
    let mut form = SubmittedForm::new();
    form.set("rows", payload("rows", json!([{"name": "shared"}])));
    let outcome = run_after_save(&registry, &mut store, "project", &project, &mut form).unwrap();

    // THEN both associations ran against it and the form is cleared
    assert!(outcome.report_for("tasks").unwrap().ran);
    assert!(outcome.report_for("labels").unwrap().ran);
    assert_eq!(store.count("task"), 1);
    assert_eq!(store.count("label"), 1);
    assert!(form.is_empty());
}
