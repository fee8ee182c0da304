//! Save command
//!
//! Usage: nestsync save --db <PATH> --schema <YAML> --entity <NAME> [--id <ID>] --input <JSON>
//!
//! The input file holds `{"attributes": {...}, "nested": {"<from>": [...]}}`;
//! `-` reads it from stdin.

use clap::Args;
use nestsync_core::RecordId;
use nestsync_core_types::{SaveContext, TraceId};
use nestsync_engine::commands::engine_command::{
    apply_engine_command, EngineCommand, EngineCommandResult,
};
use nestsync_engine::commands::save::SaveRequest;
use nestsync_store::{db, schema_loader};
use std::io::Read;
use std::path::PathBuf;

use super::StoreArgs;

#[derive(Debug, Args)]
pub struct SaveArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Parent entity name
    #[arg(long)]
    pub entity: String,

    /// Id of an existing parent to update; omit to create
    #[arg(long)]
    pub id: Option<String>,

    /// Form JSON file, or `-` for stdin
    #[arg(long)]
    pub input: PathBuf,

    /// Trace id to record with the journal rows
    #[arg(long)]
    pub trace_id: Option<String>,
}

/// Execute save command
pub fn execute(args: SaveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (schema, registry) = schema_loader::load_schema_and_registry(&args.store.schema)?;
    let mut conn = db::open(&args.store.db)?;
    db::bootstrap(&mut conn, &schema)?;

    let raw = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.input)?
    };
    let form: serde_json::Value = serde_json::from_str(&raw)?;

    let id = match args.id.as_deref() {
        Some(text) => Some(RecordId::parse(text).ok_or("--id must not be blank")?),
        None => None,
    };
    let mut context = SaveContext::new();
    if let Some(trace_id) = args.trace_id {
        context = context.with_trace_id(TraceId::from_string(trace_id));
    }
    let request = SaveRequest::from_form_json(args.entity, id, form)?.with_context(context);

    match apply_engine_command(EngineCommand::Save(request), &mut conn, &schema, &registry)? {
        EngineCommandResult::Saved(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        EngineCommandResult::Loaded(_) => Err("unexpected load result from save".into()),
    }
}
