use digitalis_core::errors::{DigitalisError, ExError};

use super::table::{Table, TablePrefix};
use crate::errors::{table_not_registered, Result};

/// Tables keyed by slug, kept in registration order
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: Vec<Table>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every table, failing on the first duplicate slug.
    ///
    /// # Errors
    ///
    /// `ERR_ALREADY_EXISTS` for a repeated slug.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut registry = Self::new();
        for table in tables {
            registry.register(table)?;
        }
        Ok(registry)
    }

    /// # Errors
    ///
    /// `ERR_ALREADY_EXISTS` when the slug is taken.
    pub fn register(&mut self, table: Table) -> Result<&mut Self> {
        if self.get(&table.slug).is_some() {
            return Err(ExError::from(DigitalisError::DuplicateTable { slug: table.slug })
                .with_op("register_table"));
        }
        self.tables.push(table);
        Ok(self)
    }

    pub fn get(&self, slug: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.slug == slug)
    }

    /// # Errors
    ///
    /// `ERR_NOT_REGISTERED` for an unknown slug.
    pub fn require(&self, slug: &str) -> Result<&Table> {
        self.get(slug).ok_or_else(|| table_not_registered(slug))
    }

    /// # Errors
    ///
    /// `ERR_NOT_REGISTERED` for an unknown slug.
    pub fn table_name(&self, slug: &str, prefix: &TablePrefix) -> Result<String> {
        Ok(self.require(slug)?.name(prefix))
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
