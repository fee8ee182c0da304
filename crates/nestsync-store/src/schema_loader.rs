//! Schema file loading
//!
//! Parses the YAML schema file (entities, associations, nested declarations)
//! and validates it before anything touches the database.

use crate::errors::{io_error, schema_error, Result};
use nestsync_core::{NestedRegistry, Schema};
use std::fs;
use std::path::Path;

/// Load and validate a schema file
///
/// # Errors
///
/// Returns an IO error if the file cannot be read, otherwise the errors of
/// [`parse_schema`].
pub fn load_schema(path: &Path) -> Result<Schema> {
    let content = fs::read_to_string(path).map_err(|e| io_error("load_schema", e))?;
    parse_schema(&content)
}

/// Parse and validate a schema from YAML text
///
/// # Errors
///
/// Returns `InvalidSchema` on malformed YAML or a schema that fails
/// [`Schema::validate`].
pub fn parse_schema(content: &str) -> Result<Schema> {
    let schema: Schema = serde_yaml::from_str(content)
        .map_err(|e| schema_error(&format!("YAML parse error: {}", e)))?;
    schema.validate()?;
    Ok(schema)
}

/// Load a schema file and build its nested-attributes registry
///
/// # Errors
///
/// See [`load_schema`]; also fails on duplicate nested declarations.
pub fn load_schema_and_registry(path: &Path) -> Result<(Schema, NestedRegistry)> {
    let schema = load_schema(path)?;
    let registry = schema.registry()?;
    Ok((schema, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestsync_core::ExErrorKind;

    const PROJECT_YAML: &str = r#"
entities:
  - name: project
    columns: [name]
    required: [name]
  - name: task
    columns: [project_id, name, position]
associations:
  - parent: project
    name: tasks
    child: task
nested:
  - entity: project
    association: tasks
    from: task_rows
    delete: false
"#;

    #[test]
    fn test_parse_schema_with_nested_section() {
        let schema = parse_schema(PROJECT_YAML).unwrap();
        assert_eq!(schema.entities.len(), 2);

        let registry = schema.registry().unwrap();
        let config = registry.config("project", "tasks").unwrap();
        assert_eq!(config.from_attribute(), "task_rows");
        assert!(!config.deletes_missing());
    }

    #[test]
    fn test_malformed_yaml_is_invalid_schema() {
        let err = parse_schema("entities: [").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidSchema);
    }

    #[test]
    fn test_unknown_foreign_key_is_rejected() {
        let yaml = r#"
entities:
  - name: project
    columns: [name]
  - name: task
    columns: [owner_id]
associations:
  - parent: project
    name: tasks
    child: task
"#;
        let err = parse_schema(yaml).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidSchema);
    }

    #[test]
    fn test_nested_declaration_for_unknown_association() {
        let yaml = r#"
entities:
  - name: project
    columns: [name]
nested:
  - entity: project
    association: tasks
"#;
        let err = parse_schema(yaml).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::AssociationNotFound);
    }
}
