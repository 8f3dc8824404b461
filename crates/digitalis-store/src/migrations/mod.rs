//! Migration framework
//!
//! Provides:
//! - `Migration` / `SchemaModule` traits and version validation
//! - `SchemaContext` handed to each migration
//! - Lease lock and capped run log over the option store
//! - `MigrationRunner` for migrate and uninstall
//! - Migrations loaded from `NNN_name.sql` files

mod context;
mod lock;
mod log;
mod module;
mod runner;
mod sql_file;

pub use context::SchemaContext;
pub use lock::MigrationLock;
pub use log::{LogEntry, LogLevel, MigrationLog};
pub use module::{validate_migrations, Migration, SchemaModule};
pub use runner::{MigrateOutcome, MigrationRunner, UninstallOutcome};
pub use sql_file::{compute_checksum, SqlDirModule, SqlFileMigration};
