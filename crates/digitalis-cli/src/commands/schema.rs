//! Schema module commands
//!
//! Usage:
//!   digitalis schema status --module <SLUG>
//!   digitalis schema migrate --module <SLUG> --dir <DIR> [--target <N>]
//!   digitalis schema uninstall --module <SLUG> [--drop-table <NAME>]... [--clear-log]
//!   digitalis schema unlock --module <SLUG>
//!   digitalis schema log --module <SLUG>

use std::path::PathBuf;

use clap::{Args, Subcommand};
use digitalis_store::migrations::{Migration, SqlDirModule};
use digitalis_store::schema::Table;
use digitalis_store::{
    db, MigrateOutcome, MigrationRunner, SchemaConfig, SchemaModule, SqliteOptionStore,
    UninstallOutcome,
};

use super::GlobalArgs;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommand,
}

#[derive(Debug, Subcommand)]
pub enum SchemaCommand {
    /// Show installed version and lock state
    Status(ModuleArg),
    /// Apply pending migrations from a directory of NNN_name.sql files
    Migrate(MigrateArgs),
    /// Remove the version record, optionally dropping tables
    Uninstall(UninstallArgs),
    /// Delete a stuck migration lock
    Unlock(ModuleArg),
    /// Print the persisted run log as JSON lines
    Log(ModuleArg),
}

#[derive(Debug, Args)]
pub struct ModuleArg {
    /// Module slug
    #[arg(long)]
    pub module: String,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Module slug
    #[arg(long)]
    pub module: String,

    /// Directory holding the module's migrations
    #[arg(long)]
    pub dir: PathBuf,

    /// Stop at this version instead of the highest file
    #[arg(long)]
    pub target: Option<i64>,
}

#[derive(Debug, Args)]
pub struct UninstallArgs {
    /// Module slug
    #[arg(long)]
    pub module: String,

    /// Unprefixed table name to drop; repeatable
    #[arg(long = "drop-table")]
    pub drop_tables: Vec<String>,

    /// Delete the module's run log as well
    #[arg(long)]
    pub clear_log: bool,
}

/// Module built from the command line for uninstall
struct NamedTables {
    slug: String,
    tables: Vec<String>,
}

impl SchemaModule for NamedTables {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn target_version(&self) -> i64 {
        0
    }

    fn tables(&self) -> Vec<Table> {
        self.tables
            .iter()
            .map(|name| Table::new(name.clone(), name.clone()))
            .collect()
    }

    fn migrations(&self) -> Vec<(i64, Box<dyn Migration>)> {
        Vec::new()
    }
}

/// Execute schema command
pub fn execute(global: &GlobalArgs, args: SchemaArgs) -> CommandResult {
    let config = match &global.config {
        Some(path) => SchemaConfig::load(path)?,
        None => SchemaConfig::default(),
    };

    let conn = db::open(&global.db)?;
    db::configure(&conn)?;
    let store = SqliteOptionStore::new(&conn)?;
    let runner = MigrationRunner::new(&conn, store, config);

    match args.command {
        SchemaCommand::Status(arg) => status(&runner, &arg.module),
        SchemaCommand::Migrate(args) => migrate(&runner, args),
        SchemaCommand::Uninstall(args) => uninstall(&runner, args),
        SchemaCommand::Unlock(arg) => unlock(&runner, &arg.module),
        SchemaCommand::Log(arg) => print_log(&runner, &arg.module),
    }
}

fn status(runner: &MigrationRunner<'_, SqliteOptionStore<'_>>, module: &str) -> CommandResult {
    println!("module: {}", module);
    println!("installed_version: {}", runner.installed_version(module)?);

    match runner.lock_holder(module)? {
        None => println!("lock: free"),
        Some(since) => {
            let age = chrono::Utc::now().timestamp() - since;
            let ttl = i64::try_from(runner.config().lock_ttl_secs).unwrap_or(i64::MAX);
            let state = if age >= ttl { "stale" } else { "held" };
            println!("lock: {} (acquired {}s ago)", state, age);
        }
    }
    Ok(())
}

fn migrate(runner: &MigrationRunner<'_, SqliteOptionStore<'_>>, args: MigrateArgs) -> CommandResult {
    let mut module = SqlDirModule::load(&args.module, &args.dir)?;
    if let Some(target) = args.target {
        module = module.with_target(target);
    }

    match runner.migrate_module(&module)? {
        MigrateOutcome::UpToDate { version } => {
            println!("{} is up to date at version {}", args.module, version);
        }
        MigrateOutcome::Locked => {
            println!("{} is locked by another run; skipped", args.module);
        }
        MigrateOutcome::Migrated { from, to, applied } => {
            let applied: Vec<String> = applied.iter().map(i64::to_string).collect();
            println!(
                "✓ Migrated {} from {} to {} (applied: {})",
                args.module,
                from,
                to,
                applied.join(", ")
            );
        }
    }
    Ok(())
}

fn uninstall(
    runner: &MigrationRunner<'_, SqliteOptionStore<'_>>,
    args: UninstallArgs,
) -> CommandResult {
    let drop_tables = !args.drop_tables.is_empty();
    let module = NamedTables {
        slug: args.module.clone(),
        tables: args.drop_tables,
    };

    match runner.uninstall_module(&module, drop_tables, args.clear_log)? {
        UninstallOutcome::Uninstalled { dropped } => {
            println!("✓ Uninstalled {}", args.module);
            for table in dropped {
                println!("  dropped {}", table);
            }
        }
        UninstallOutcome::Locked => {
            println!("{} is locked by another run; skipped", args.module);
        }
    }
    Ok(())
}

fn unlock(runner: &MigrationRunner<'_, SqliteOptionStore<'_>>, module: &str) -> CommandResult {
    if runner.force_unlock(module)? {
        println!("✓ Lock removed for {}", module);
    } else {
        println!("{} was not locked", module);
    }
    Ok(())
}

fn print_log(runner: &MigrationRunner<'_, SqliteOptionStore<'_>>, module: &str) -> CommandResult {
    for entry in runner.log(module).entries()? {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}
