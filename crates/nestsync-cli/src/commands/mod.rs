pub mod declarations;
pub mod init;
pub mod save;
pub mod show;

use clap::Args;
use std::path::PathBuf;

/// Database and schema locations shared by the data commands
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// SQLite database file
    #[arg(long)]
    pub db: PathBuf,

    /// YAML schema file (entities, associations, nested declarations)
    #[arg(long)]
    pub schema: PathBuf,
}
