use super::quote_ident;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Primary,
    Unique,
    Key,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub kind: IndexKind,
    /// Empty for the primary key
    pub name: String,
    pub columns: Vec<String>,
}

fn owned<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns.into_iter().map(Into::into).collect()
}

impl Index {
    pub fn primary<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: IndexKind::Primary,
            name: String::new(),
            columns: owned(columns),
        }
    }

    pub fn unique<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: IndexKind::Unique,
            name: name.into(),
            columns: owned(columns),
        }
    }

    pub fn key<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: IndexKind::Key,
            name: name.into(),
            columns: owned(columns),
        }
    }

    pub(crate) fn column_list(&self) -> String {
        let quoted: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        format!("({})", quoted.join(", "))
    }

    /// Clause inside a MySQL `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        match self.kind {
            IndexKind::Primary => format!("PRIMARY KEY {}", self.column_list()),
            IndexKind::Unique => {
                format!("UNIQUE KEY {} {}", quote_ident(&self.name), self.column_list())
            }
            IndexKind::Key => format!("KEY {} {}", quote_ident(&self.name), self.column_list()),
        }
    }

    /// SQLite index names are database-wide, so they carry the table name.
    pub fn sqlite_name(&self, table: &str) -> String {
        format!("{}_{}", table, self.name)
    }

    /// Standalone statement for a SQLite secondary index
    pub(crate) fn to_sqlite_statement(&self, table: &str) -> Option<String> {
        let unique = match self.kind {
            IndexKind::Primary => return None,
            IndexKind::Unique => "UNIQUE ",
            IndexKind::Key => "",
        };
        Some(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} {};",
            unique,
            quote_ident(&self.sqlite_name(table)),
            quote_ident(table),
            self.column_list()
        ))
    }
}
