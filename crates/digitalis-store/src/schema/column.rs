use super::{quote_ident, Dialect};

/// Literal rendered after `DEFAULT`
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Int(i64),
    Float(f64),
    /// Single-quoted, `'` doubled
    Text(String),
    /// Emitted verbatim, e.g. `CURRENT_TIMESTAMP`
    Raw(String),
}

impl DefaultValue {
    pub fn to_sql(&self) -> String {
        match self {
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::Int(n) => n.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Raw(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub auto_increment: bool,
}

impl Column {
    /// A `NOT NULL` column with no default.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: false,
            default: None,
            auto_increment: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// `` `name` TYPE [NULL|NOT NULL] [DEFAULT lit] [AUTO_INCREMENT] ``
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.sql_type);
        sql.push_str(if self.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        if self.auto_increment && dialect == Dialect::MySql {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }

    /// SQLite only allows AUTOINCREMENT on an inline `INTEGER PRIMARY KEY`.
    pub(crate) fn to_sqlite_rowid_sql(&self) -> String {
        format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(&self.name))
    }
}
