//! Error handling for digitalis-store
//!
//! Wraps digitalis-core ExError with store-specific helpers

use digitalis_core::errors::{DigitalisError, ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// A statement the driver rejected, carrying the statement text
pub fn sql_failed(statement: &str, err: rusqlite::Error) -> ExError {
    ExError::from(DigitalisError::SqlFailed {
        statement: statement.to_string(),
        message: err.to_string(),
    })
    .with_op("execute_sql")
}

/// Wrap the failure of one migration's `up` step
pub fn migration_error(module: &str, version: i64, name: &str, source: ExError) -> ExError {
    ExError::from(DigitalisError::MigrationFailed {
        module: module.to_string(),
        version,
        message: format!("Migration {} ({}) failed", version, name),
    })
    .with_op("migrate_module")
    .with_source(source)
}

/// Create an unregistered table error
pub fn table_not_registered(slug: &str) -> ExError {
    ExError::from(DigitalisError::TableNotRegistered {
        slug: slug.to_string(),
    })
    .with_op("resolve_table")
}

/// Create a configuration error
pub fn invalid_config(reason: impl Into<String>) -> ExError {
    ExError::from(DigitalisError::InvalidConfig {
        reason: reason.into(),
    })
    .with_op("load_config")
}

/// Create an error for a slug rejected by `SchemaConfig::validate_slug`
pub fn invalid_slug(slug: &str, reason: impl Into<String>) -> ExError {
    ExError::from(DigitalisError::InvalidModuleSlug {
        slug: slug.to_string(),
        reason: reason.into(),
    })
    .with_op("validate_slug")
}

/// Create a serialization error for a stored option value
pub fn corrupt_option(key: &str, err: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("read_option")
        .with_entity_id(key)
        .with_message(format!("Stored value is not valid: {}", err))
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
