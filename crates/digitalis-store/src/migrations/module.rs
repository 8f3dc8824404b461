//! Migration and schema-module traits

use digitalis_core::errors::{DigitalisError, ExError};

use super::context::SchemaContext;
use crate::errors::Result;
use crate::schema::Table;

/// One versioned schema step
pub trait Migration {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Any failure aborts the run; the installed version stays at the
    /// previous step.
    fn up(&self, ctx: &SchemaContext<'_>) -> Result<()>;
}

/// A named group of tables and the migrations that build them
pub trait SchemaModule {
    fn slug(&self) -> &str;

    fn target_version(&self) -> i64;

    /// Descriptors registered before any migration runs.
    fn tables(&self) -> Vec<Table> {
        Vec::new()
    }

    /// `(version, migration)` pairs in any order.
    fn migrations(&self) -> Vec<(i64, Box<dyn Migration>)>;
}

/// Reject versions below 1 and duplicates, then sort ascending.
///
/// # Errors
///
/// `ERR_INVALID_MIGRATION_VERSION` or `ERR_DUPLICATE_MIGRATION_VERSION`.
pub fn validate_migrations(
    module: &str,
    mut migrations: Vec<(i64, Box<dyn Migration>)>,
) -> Result<Vec<(i64, Box<dyn Migration>)>> {
    if let Some((version, _)) = migrations.iter().find(|(v, _)| *v < 1) {
        return Err(ExError::from(DigitalisError::InvalidMigrationVersion {
            module: module.to_string(),
            version: *version,
        })
        .with_op("validate_migrations"));
    }

    migrations.sort_by_key(|(version, _)| *version);

    if let Some(pair) = migrations.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(ExError::from(DigitalisError::DuplicateMigrationVersion {
            module: module.to_string(),
            version: pair[0].0,
        })
        .with_op("validate_migrations"));
    }

    Ok(migrations)
}
