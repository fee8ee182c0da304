//! Database initialization
//!
//! Usage: nestsync init --db <PATH> --schema <YAML>

use clap::Args;
use nestsync_store::{db, schema_loader};

use super::StoreArgs;

#[derive(Debug, Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

/// Execute init command
pub fn execute(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema_loader::load_schema(&args.store.schema)?;
    if let Some(parent) = args.store.db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = db::open(&args.store.db)?;
    db::bootstrap(&mut conn, &schema)?;

    println!(
        "Initialized {} ({} entities)",
        args.store.db.display(),
        schema.entities.len()
    );
    Ok(())
}
