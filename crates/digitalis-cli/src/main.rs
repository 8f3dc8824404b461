//! Digitalis CLI
//!
//! Command-line interface for the Digitalis schema subsystem

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use digitalis_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "digitalis")]
#[command(about = "Digitalis - versioned schema migrations over SQLite", long_about = None)]
struct Cli {
    /// SQLite database file (created when missing)
    #[arg(long, global = true, default_value = "digitalis.db")]
    db: PathBuf,

    /// TOML schema configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs to stderr: dev or production
    #[arg(long, global = true)]
    log: Option<Profile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Schema module operations
    Schema(commands::schema::SchemaArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Some(profile) = cli.log {
        logging_facility::init(profile);
    }

    let global = commands::GlobalArgs {
        db: cli.db,
        config: cli.config,
    };
    let result = match cli.command {
        Commands::Schema(args) => commands::schema::execute(&global, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
