//! Show command
//!
//! Usage: nestsync show --db <PATH> --schema <YAML> --entity <NAME> --id <ID>

use clap::Args;
use nestsync_core::RecordId;
use nestsync_engine::commands::load::load_with_children;
use nestsync_store::{db, schema_loader};

use super::StoreArgs;

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Entity name
    #[arg(long)]
    pub entity: String,

    /// Record id
    #[arg(long)]
    pub id: String,
}

/// Execute show command
pub fn execute(args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema_loader::load_schema(&args.store.schema)?;
    let conn = db::open(&args.store.db)?;
    let id = RecordId::parse(&args.id).ok_or("--id must not be blank")?;

    let loaded = load_with_children(&conn, &schema, &args.entity, &id)?;
    println!("{}", serde_json::to_string_pretty(&loaded)?);
    Ok(())
}
