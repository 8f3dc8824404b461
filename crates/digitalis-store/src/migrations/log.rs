//! Capped, persisted run log for one schema module

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{corrupt_option, Result};
use crate::options::OptionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unix seconds
    pub timestamp: i64,
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub context: Value,
}

/// JSON array stored under one option key; oldest entries are evicted
/// once `max_entries` is exceeded.
#[derive(Debug)]
pub struct MigrationLog<'s, S: OptionStore + ?Sized> {
    store: &'s S,
    key: String,
    max_entries: usize,
}

impl<'s, S: OptionStore + ?Sized> MigrationLog<'s, S> {
    pub fn new(store: &'s S, key: impl Into<String>, max_entries: usize) -> Self {
        Self {
            store,
            key: key.into(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Oldest first.
    ///
    /// # Errors
    ///
    /// Store failure, or a stored value that is not a log array.
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        match self.store.get_option(&self.key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| corrupt_option(&self.key, e)),
        }
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, context: Value) -> Result<()> {
        self.push(LogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            level,
            message: message.into(),
            context,
        })
    }

    /// # Errors
    ///
    /// Store failure. A corrupt stored log is replaced rather than reported.
    pub fn push(&self, entry: LogEntry) -> Result<()> {
        let mut entries = self.entries().unwrap_or_default();
        entries.push(entry);
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }
        let raw = serde_json::to_string(&entries).map_err(|e| corrupt_option(&self.key, e))?;
        self.store.update_option(&self.key, &raw)
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn clear(&self) -> Result<()> {
        self.store.delete_option(&self.key).map(|_| ())
    }
}
