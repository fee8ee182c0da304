//! Engine-level commands for database operations.

use crate::commands::load::{load_with_children, LoadedRecord};
use crate::commands::save::{save_with_nested, SaveOutcome, SaveRequest};
use nestsync_core::{NestedRegistry, RecordId, Schema};
use nestsync_store::errors::Result;
use rusqlite::Connection;

/// Engine-level commands that require a database connection.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Save a parent and reconcile its nested associations.
    Save(SaveRequest),
    /// Read a parent with its children.
    Load { entity: String, id: RecordId },
}

/// Result of applying an engine command.
#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    Saved(SaveOutcome),
    Loaded(LoadedRecord),
}

/// Apply an engine command against an open connection.
///
/// # Errors
///
/// Returns whatever the dispatched command returns.
pub fn apply_engine_command(
    cmd: EngineCommand,
    conn: &mut Connection,
    schema: &Schema,
    registry: &NestedRegistry,
) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::Save(request) => {
            save_with_nested(conn, schema, registry, request).map(EngineCommandResult::Saved)
        }
        EngineCommand::Load { entity, id } => {
            load_with_children(conn, schema, &entity, &id).map(EngineCommandResult::Loaded)
        }
    }
}
