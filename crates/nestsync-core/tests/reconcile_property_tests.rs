//! Property tests for reconciliation invariants

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{payload, store_with_tasks, task_names};
use nestsync_core::{reconcile, AssociationSource, NestedConfig, Payload, RecordId};
use proptest::prelude::*;
use serde_json::{json, Value};

/// A payload entry: blank, new child, or reference to an existing child
#[derive(Debug, Clone)]
enum Entry {
    Blank,
    New(String),
    Existing(i64, String),
}

fn entry_strategy(existing: i64) -> impl Strategy<Value = Entry> {
    prop_oneof![
        Just(Entry::Blank),
        "[a-z]{1,8}".prop_map(Entry::New),
        (1..=existing, "[a-z]{1,8}").prop_map(|(id, name)| Entry::Existing(id, name)),
    ]
}

fn to_json(entries: &[Entry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| match e {
                Entry::Blank => json!({"name": "", "done": null}),
                Entry::New(name) => json!({"name": name}),
                Entry::Existing(id, name) => json!({"id": id, "name": name}),
            })
            .collect(),
    )
}

fn run(entries: &[Entry], delete: bool) -> (nestsync_core::ReconcileReport, Vec<String>, usize) {
    let (mut store, project) = store_with_tasks(&["a", "b", "c", "d"]);
    let config = NestedConfig::new("tasks").delete(delete);
    let submitted: Payload = payload("_tasks", to_json(entries));
    let mut assoc = store.open("project", "tasks", &project).unwrap();
    let report = reconcile(assoc.as_mut(), &project, Some(&submitted), &config).unwrap();
    drop(assoc);
    let names = task_names(&store, &project);
    let count = store.count("task");
    (report, names, count)
}

proptest! {
    #[test]
    fn prop_child_count_follows_payload(
        entries in prop::collection::vec(entry_strategy(4), 0..12),
        delete in any::<bool>()
    ) {
        let (report, _, count) = run(&entries, delete);

        let new = entries.iter().filter(|e| matches!(e, Entry::New(_))).count();
        let mut referenced: Vec<i64> = entries
            .iter()
            .filter_map(|e| match e { Entry::Existing(id, _) => Some(*id), _ => None })
            .collect();
        referenced.sort_unstable();
        referenced.dedup();

        prop_assert_eq!(report.created.len(), new);
        let expected = if delete { referenced.len() + new } else { 4 + new };
        prop_assert_eq!(count, expected);
    }

    #[test]
    fn prop_blank_entries_are_inert(
        entries in prop::collection::vec(entry_strategy(4), 0..12)
    ) {
        let without_blanks: Vec<Entry> = entries
            .iter()
            .filter(|e| !matches!(e, Entry::Blank))
            .cloned()
            .collect();

        let (with, _, with_count) = run(&entries, true);
        let (without, _, without_count) = run(&without_blanks, true);

        prop_assert_eq!(with.skipped_blank, entries.len() - without_blanks.len());
        prop_assert_eq!(with_count, without_count);
        prop_assert_eq!(with.deleted, without.deleted);
        prop_assert_eq!(with.created.len(), without.created.len());
    }

    #[test]
    fn prop_positions_are_payload_indices(
        entries in prop::collection::vec(entry_strategy(4), 0..12)
    ) {
        let (mut store, project) = store_with_tasks(&["a", "b", "c", "d"]);
        let config = NestedConfig::new("tasks");
        let submitted = payload("_tasks", to_json(&entries));
        let mut assoc = store.open("project", "tasks", &project).unwrap();
        reconcile(assoc.as_mut(), &project, Some(&submitted), &config).unwrap();
        drop(assoc);

        // The last entry naming a child decides its position.
        for (index, entry) in entries.iter().enumerate() {
            if let Entry::Existing(id, _) = entry {
                let last = entries
                    .iter()
                    .rposition(|e| matches!(e, Entry::Existing(other, _) if other == id));
                if last == Some(index) {
                    let row = store.get_record("task", &RecordId::Int(*id)).unwrap();
                    prop_assert_eq!(row.get("position"), Some(&json!(index)));
                }
            }
        }
    }

    #[test]
    fn prop_rerun_with_ids_is_structural_noop(
        names in prop::collection::vec("[a-z]{1,8}", 0..8)
    ) {
        let (mut store, project) = store_with_tasks(&[]);
        let config = NestedConfig::new("tasks");
        let fresh: Vec<Entry> = names.iter().cloned().map(Entry::New).collect();
        let submitted = payload("_tasks", to_json(&fresh));
        let mut assoc = store.open("project", "tasks", &project).unwrap();
        let first = reconcile(assoc.as_mut(), &project, Some(&submitted), &config).unwrap();
        drop(assoc);
        let before = task_names(&store, &project);

        let again: Vec<Entry> = first
            .created
            .iter()
            .zip(&names)
            .map(|(id, name)| Entry::Existing(id.as_i64().unwrap(), name.clone()))
            .collect();
        let submitted = payload("_tasks", to_json(&again));
        let mut assoc = store.open("project", "tasks", &project).unwrap();
        let second = reconcile(assoc.as_mut(), &project, Some(&submitted), &config).unwrap();
        drop(assoc);

        prop_assert!(second.is_structural_noop());
        prop_assert_eq!(task_names(&store, &project), before);
    }
}
