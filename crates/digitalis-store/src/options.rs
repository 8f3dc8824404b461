//! Options-style key/value store
//!
//! Versions, locks and run logs are plain string values keyed by option
//! name. `compare_and_swap` is the only primitive the migration lock needs:
//! it must be atomic with respect to other processes sharing the store.

use std::cell::RefCell;
use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{from_rusqlite, Result};

pub const OPTIONS_TABLE: &str = "digitalis_options";

pub trait OptionStore {
    /// # Errors
    ///
    /// Backend failure.
    fn get_option(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn update_option(&self, key: &str, value: &str) -> Result<()>;

    /// Returns whether a value was removed.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn delete_option(&self, key: &str) -> Result<bool>;

    /// Set `key` to `new` only if its current value is `expected`
    /// (`None`: the key must be absent). Returns whether the swap happened.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool>;
}

impl<S: OptionStore + ?Sized> OptionStore for &S {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        (**self).get_option(key)
    }

    fn update_option(&self, key: &str, value: &str) -> Result<()> {
        (**self).update_option(key, value)
    }

    fn delete_option(&self, key: &str) -> Result<bool> {
        (**self).delete_option(key)
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        (**self).compare_and_swap(key, expected, new)
    }
}

/// Option store backed by the `digitalis_options` table
#[derive(Debug)]
pub struct SqliteOptionStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteOptionStore<'c> {
    /// Bind to `conn`, creating the options table when missing.
    ///
    /// # Errors
    ///
    /// Fails when the table cannot be created.
    pub fn new(conn: &'c Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS digitalis_options (
                option_name TEXT PRIMARY KEY NOT NULL,
                option_value TEXT NOT NULL
            )",
        )
        .map_err(from_rusqlite)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }
}

impl OptionStore for SqliteOptionStore<'_> {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT option_value FROM digitalis_options WHERE option_name = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)
    }

    fn update_option(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO digitalis_options (option_name, option_value) VALUES (?1, ?2)
                 ON CONFLICT(option_name) DO UPDATE SET option_value = excluded.option_value",
                params![key, value],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn delete_option(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM digitalis_options WHERE option_name = ?1", [key])
            .map_err(from_rusqlite)?;
        Ok(removed > 0)
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        // single statements, so SQLite's write lock makes each check-and-set atomic
        let changed = match expected {
            None => self.conn.execute(
                "INSERT OR IGNORE INTO digitalis_options (option_name, option_value) VALUES (?1, ?2)",
                params![key, new],
            ),
            Some(current) => self.conn.execute(
                "UPDATE digitalis_options SET option_value = ?3
                 WHERE option_name = ?1 AND option_value = ?2",
                params![key, current, new],
            ),
        }
        .map_err(from_rusqlite)?;
        Ok(changed == 1)
    }
}

/// In-process option store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn update_option(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_option(&self, key: &str) -> Result<bool> {
        Ok(self.values.borrow_mut().remove(key).is_some())
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let mut values = self.values.borrow_mut();
        if values.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        values.insert(key.to_string(), new.to_string());
        Ok(true)
    }
}
