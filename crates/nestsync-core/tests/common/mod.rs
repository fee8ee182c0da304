use nestsync_core::model::{AssociationDef, EntityDef, Schema};
use nestsync_core::{Attributes, NestedConfig, NestedRegistry, Payload, RecordId, Store};
use serde_json::Value;

/// project has_many tasks (positioned) and notes (unpositioned)
#[allow(dead_code)]
pub fn project_schema() -> Schema {
    Schema::new()
        .with_entity(EntityDef::new("project", &["name"]).with_required(&["name"]))
        .with_entity(
            EntityDef::new("task", &["project_id", "name", "done", "position"])
                .with_required(&["name"]),
        )
        .with_entity(EntityDef::new("note", &["project_id", "body"]))
        .with_association(AssociationDef::new("project", "tasks", "task"))
        .with_association(AssociationDef::new("project", "notes", "note"))
}

/// Registry with tasks (default config) and notes (delete disabled)
#[allow(dead_code)]
pub fn project_registry(schema: &Schema) -> NestedRegistry {
    let mut registry = NestedRegistry::new();
    registry
        .declare(schema, "project", NestedConfig::new("tasks"))
        .unwrap();
    registry
        .declare(
            schema,
            "project",
            NestedConfig::new("notes").from("note_rows").delete(false),
        )
        .unwrap();
    registry
}

#[allow(dead_code)]
pub fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => Attributes::from(map),
        other => panic!("expected an object, got {}", other),
    }
}

#[allow(dead_code)]
pub fn payload(from: &str, value: Value) -> Payload {
    Payload::from_json(from, value).unwrap()
}

/// Store holding one project with the named tasks, in order
#[allow(dead_code)]
pub fn store_with_tasks(names: &[&str]) -> (Store, RecordId) {
    let mut store = Store::new(project_schema()).unwrap();
    let project = store
        .insert_record("project", attrs(serde_json::json!({"name": "P"})))
        .unwrap();
    for (index, name) in names.iter().enumerate() {
        store
            .insert_record(
                "task",
                attrs(serde_json::json!({
                    "project_id": project.to_value(),
                    "name": name,
                    "position": index,
                })),
            )
            .unwrap();
    }
    (store, project)
}

/// Task names under `project`, in list order
#[allow(dead_code)]
pub fn task_names(store: &Store, project: &RecordId) -> Vec<String> {
    store
        .list_children("project", "tasks", project)
        .unwrap()
        .into_iter()
        .filter_map(|c| c.attributes.get("name").and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}
