//! Digitalis Store - schema descriptors, migrations and option storage
//!
//! Provides:
//! - Options-style key/value store (`OptionStore`) over SQLite or memory
//! - Declarative table descriptors rendered to MySQL or SQLite DDL
//! - Versioned migrations applied under a TTL lease lock
//! - A capped, persisted run log per schema module
//! - TOML-loaded `SchemaConfig`

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod options;
pub mod schema;

// Re-export key types
pub use config::SchemaConfig;
pub use errors::Result;
pub use migrations::{MigrateOutcome, MigrationRunner, SchemaContext, SchemaModule, UninstallOutcome};
pub use options::{MemoryOptionStore, OptionStore, SqliteOptionStore};
