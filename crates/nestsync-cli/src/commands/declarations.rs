//! Declarations command
//!
//! Usage: nestsync declarations --schema <YAML>

use clap::Args;
use nestsync_store::schema_loader;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DeclarationsArgs {
    /// YAML schema file
    #[arg(long)]
    pub schema: PathBuf,
}

/// Print every nested declaration with its effective `from`, callback and
/// delete setting
pub fn execute(args: DeclarationsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_, registry) = schema_loader::load_schema_and_registry(&args.schema)?;
    println!("{}", serde_json::to_string_pretty(&registry.declarations())?);
    Ok(())
}
