//! Migrations loaded from `NNN_name.sql` files

use std::path::{Path, PathBuf};

use digitalis_core::errors::{DigitalisError, ExError, ExErrorKind};
use sha2::{Digest, Sha256};

use super::context::SchemaContext;
use super::module::{Migration, SchemaModule};
use crate::errors::{io_error, Result};

/// SHA-256 of the file contents, hex encoded
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFileMigration {
    pub version: i64,
    pub name: String,
    pub path: PathBuf,
    pub sql: String,
    pub checksum: String,
}

impl SqlFileMigration {
    /// # Errors
    ///
    /// Unreadable file or a name without a numeric `NNN_` prefix.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (version, name) = parse_file_name(path)?;
        let sql = std::fs::read_to_string(path).map_err(|e| io_error("load_migration", e))?;
        Ok(Self {
            version,
            name,
            path: path.to_path_buf(),
            checksum: compute_checksum(&sql),
            sql,
        })
    }

    /// Every `*.sql` file in `dir`, ascending by version.
    ///
    /// # Errors
    ///
    /// Unreadable directory or file, a bad file name, or two files with
    /// the same version.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Self>> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| io_error("load_migrations", e))?;

        let mut migrations = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error("load_migrations", e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                migrations.push(Self::load(&path)?);
            }
        }
        migrations.sort_by_key(|m| m.version);

        let module = dir.display().to_string();
        if let Some(pair) = migrations.windows(2).find(|p| p[0].version == p[1].version) {
            return Err(ExError::from(DigitalisError::DuplicateMigrationVersion {
                module,
                version: pair[0].version,
            })
            .with_op("load_migrations")
            .with_entity_id(pair[1].path.display().to_string()));
        }
        Ok(migrations)
    }
}

fn parse_file_name(path: &Path) -> Result<(i64, String)> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let (digits, name) = stem.split_once('_').unwrap_or((stem, ""));

    match digits.parse::<i64>() {
        Ok(version) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            Ok((version, name.to_string()))
        }
        _ => Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("load_migration")
            .with_entity_id(path.display().to_string())
            .with_message("Migration files must be named NNN_name.sql")),
    }
}

impl Migration for SqlFileMigration {
    fn name(&self) -> &str {
        &self.name
    }

    fn up(&self, ctx: &SchemaContext<'_>) -> Result<()> {
        tracing::debug!(
            version = self.version,
            checksum = %self.checksum,
            path = %self.path.display(),
            "running sql migration"
        );
        ctx.execute_batch(&ctx.expand(&self.sql))
    }
}

/// A directory of SQL migrations treated as one module
#[derive(Debug, Clone)]
pub struct SqlDirModule {
    slug: String,
    target: i64,
    migrations: Vec<SqlFileMigration>,
}

impl SqlDirModule {
    /// Target defaults to the highest file version.
    ///
    /// # Errors
    ///
    /// As [`SqlFileMigration::load_dir`].
    pub fn load(slug: impl Into<String>, dir: impl AsRef<Path>) -> Result<Self> {
        let migrations = SqlFileMigration::load_dir(dir)?;
        let target = migrations.last().map_or(0, |m| m.version);
        Ok(Self {
            slug: slug.into(),
            target,
            migrations,
        })
    }

    pub fn with_target(mut self, target: i64) -> Self {
        self.target = target;
        self
    }

    pub fn files(&self) -> &[SqlFileMigration] {
        &self.migrations
    }
}

impl SchemaModule for SqlDirModule {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn target_version(&self) -> i64 {
        self.target
    }

    fn migrations(&self) -> Vec<(i64, Box<dyn Migration>)> {
        self.migrations
            .iter()
            .map(|m| (m.version, Box::new(m.clone()) as Box<dyn Migration>))
            .collect()
    }
}
