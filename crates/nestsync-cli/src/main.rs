//! nestsync CLI
//!
//! Command-line interface for saving records with nested children into a
//! SQLite database described by a YAML schema file

use clap::{Parser, Subcommand};
use nestsync_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "nestsync")]
#[command(about = "nestsync - nested has-many reconciliation over SQLite", long_about = None)]
struct Cli {
    /// Log profile: development, production or test (logs go to stderr)
    #[arg(long, global = true, default_value = "production")]
    log: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create entity tables and apply migrations
    Init(commands::init::InitArgs),
    /// Save a record and its nested children from a form JSON file
    Save(commands::save::SaveArgs),
    /// Print a record with its children as JSON
    Show(commands::show::ShowArgs),
    /// List nested-attributes declarations from a schema file
    Declarations(commands::declarations::DeclarationsArgs),
}

fn main() {
    let cli = Cli::parse();
    init(cli.log);

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args),
        Commands::Save(args) => commands::save::execute(args),
        Commands::Show(args) => commands::show::execute(args),
        Commands::Declarations(args) => commands::declarations::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
