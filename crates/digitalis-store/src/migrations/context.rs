//! Capability object handed to each migration's `up`

use rusqlite::{Connection, OptionalExtension};

use crate::config::SchemaConfig;
use crate::errors::{from_rusqlite, sql_failed, Result};
use crate::schema::{drop_sql, Dialect, TableRegistry};

pub struct SchemaContext<'a> {
    conn: &'a Connection,
    registry: &'a TableRegistry,
    config: &'a SchemaConfig,
}

impl<'a> SchemaContext<'a> {
    pub fn new(conn: &'a Connection, registry: &'a TableRegistry, config: &'a SchemaConfig) -> Self {
        Self {
            conn,
            registry,
            config,
        }
    }

    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    pub fn registry(&self) -> &'a TableRegistry {
        self.registry
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Prefixed name of a registered table.
    ///
    /// # Errors
    ///
    /// `ERR_NOT_REGISTERED` for an unknown slug.
    pub fn table(&self, slug: &str) -> Result<String> {
        self.registry.table_name(slug, &self.config.table_prefix)
    }

    /// Substitute `{{prefix}}` (site) and `{{base_prefix}}` in raw SQL.
    pub fn expand(&self, sql: &str) -> String {
        sql.replace("{{base_prefix}}", &self.config.table_prefix.base)
            .replace("{{prefix}}", &self.config.table_prefix.site)
    }

    /// Run one statement; returns affected rows.
    ///
    /// # Errors
    ///
    /// `ERR_SQL_FAILED` carrying the statement and the driver's message.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        tracing::debug!(statement = sql, "execute");
        self.conn.execute(sql, []).map_err(|e| sql_failed(sql, e))
    }

    /// Run several `;`-separated statements.
    ///
    /// # Errors
    ///
    /// `ERR_SQL_FAILED` carrying the batch and the driver's message.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!(statement = sql, "execute_batch");
        self.conn.execute_batch(sql).map_err(|e| sql_failed(sql, e))
    }

    /// Create a registered table from its descriptor.
    ///
    /// # Errors
    ///
    /// Unknown slug or rejected DDL.
    pub fn create_table(&self, slug: &str) -> Result<String> {
        let table = self.registry.require(slug)?;
        let name = table.name(&self.config.table_prefix);
        let sql = table.create_sql(&name, self.config.dialect, &self.config.charset_collate);
        self.execute_batch(&sql)?;
        Ok(name)
    }

    /// # Errors
    ///
    /// Unknown slug or rejected statement.
    pub fn drop_table(&self, slug: &str) -> Result<String> {
        let name = self.table(slug)?;
        self.execute(&drop_sql(&name))?;
        Ok(name)
    }

    /// # Errors
    ///
    /// Catalog query failure.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        self.probe(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[name],
        )
    }

    /// # Errors
    ///
    /// Catalog query failure.
    pub fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        self.probe(
            "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
            &[table, column],
        )
    }

    /// Accepts either the declared index name or its table-qualified form.
    ///
    /// # Errors
    ///
    /// Catalog query failure.
    pub fn index_exists(&self, table: &str, index: &str) -> Result<bool> {
        let qualified = format!("{}_{}", table, index);
        self.probe(
            "SELECT 1 FROM sqlite_master
             WHERE type = 'index' AND tbl_name = ?1 AND name IN (?2, ?3)",
            &[table, index, qualified.as_str()],
        )
    }

    fn probe(&self, sql: &str, args: &[&str]) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(sql, rusqlite::params_from_iter(args.iter()), |row| row.get(0))
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }
}

impl std::fmt::Debug for SchemaContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaContext")
            .field("tables", &self.registry.len())
            .field("dialect", &self.config.dialect)
            .finish()
    }
}
