//! Declarative table descriptors compiled to DDL
//!
//! - [`column`]: column definitions and default literals
//! - [`index`]: primary, unique and plain keys
//! - [`table`]: table descriptor, name prefixing and `CREATE`/`DROP` rendering
//! - [`registry`]: slug-keyed table registry

pub mod column;
pub mod index;
pub mod registry;
pub mod table;

use serde::{Deserialize, Serialize};

pub use column::{Column, DefaultValue};
pub use index::{Index, IndexKind};
pub use registry::TableRegistry;
pub use table::{drop_sql, Table, TablePrefix, TableScope};

/// SQL flavour DDL is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    #[default]
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

/// Backtick-quote an identifier, doubling embedded backticks
pub(crate) fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
