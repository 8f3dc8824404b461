use serde::{Deserialize, Serialize};

use super::column::Column;
use super::index::{Index, IndexKind};
use super::{quote_ident, Dialect};

/// Which prefix a table name takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableScope {
    /// Per-site table, `site` prefix
    #[default]
    Site,
    /// Shared across the network, `base` prefix
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePrefix {
    pub base: String,
    pub site: String,
}

impl Default for TablePrefix {
    fn default() -> Self {
        Self {
            base: "wp_".to_string(),
            site: "wp_".to_string(),
        }
    }
}

impl TablePrefix {
    pub fn for_scope(&self, scope: TableScope) -> &str {
        match scope {
            TableScope::Site => &self.site,
            TableScope::Network => &self.base,
        }
    }
}

/// Static description of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub slug: String,
    pub base_name: String,
    pub scope: TableScope,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn new(slug: impl Into<String>, base_name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            base_name: base_name.into(),
            scope: TableScope::Site,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn scope(mut self, scope: TableScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Prefixed table name
    pub fn name(&self, prefix: &TablePrefix) -> String {
        format!("{}{}", prefix.for_scope(self.scope), self.base_name)
    }

    /// Render the `CREATE TABLE` for `name`.
    ///
    /// MySQL output is a single statement with column and index clauses in
    /// declared order. SQLite output inlines a single-column auto-increment
    /// primary key and follows the table with one `CREATE INDEX` per
    /// secondary index.
    pub fn create_sql(&self, name: &str, dialect: Dialect, charset_collate: &str) -> String {
        match dialect {
            Dialect::MySql => self.create_mysql(name, charset_collate),
            Dialect::Sqlite => self.create_sqlite(name),
        }
    }

    fn create_mysql(&self, name: &str, charset_collate: &str) -> String {
        let mut clauses: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.to_sql(Dialect::MySql))
            .collect();
        clauses.extend(self.indexes.iter().map(Index::to_sql));

        let mut sql = format!(
            "CREATE TABLE {} (\n  {}\n)",
            quote_ident(name),
            clauses.join(",\n  ")
        );
        if !charset_collate.trim().is_empty() {
            sql.push(' ');
            sql.push_str(charset_collate.trim());
        }
        sql.push(';');
        sql
    }

    fn create_sqlite(&self, name: &str) -> String {
        let rowid = self.rowid_column();

        let mut clauses: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if Some(c.name.as_str()) == rowid {
                    c.to_sqlite_rowid_sql()
                } else {
                    c.to_sql(Dialect::Sqlite)
                }
            })
            .collect();
        if rowid.is_none() {
            clauses.extend(
                self.indexes
                    .iter()
                    .filter(|i| i.kind == IndexKind::Primary)
                    .map(Index::to_sql),
            );
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n  {}\n);",
            quote_ident(name),
            clauses.join(",\n  ")
        );
        for statement in self
            .indexes
            .iter()
            .filter_map(|i| i.to_sqlite_statement(name))
        {
            sql.push('\n');
            sql.push_str(&statement);
        }
        sql
    }

    /// Column that becomes SQLite's `INTEGER PRIMARY KEY AUTOINCREMENT`:
    /// an auto-increment column that is the whole primary key.
    fn rowid_column(&self) -> Option<&str> {
        let primary = self.indexes.iter().find(|i| i.kind == IndexKind::Primary)?;
        let [only] = primary.columns.as_slice() else {
            return None;
        };
        self.columns
            .iter()
            .find(|c| &c.name == only && c.auto_increment)
            .map(|c| c.name.as_str())
    }
}

/// ``DROP TABLE IF EXISTS `name`;``
pub fn drop_sql(name: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", quote_ident(name))
}
