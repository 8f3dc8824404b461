//! Schema subsystem configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! option_prefix = "digitalis_schema"
//! lock_ttl_secs = 120
//! log_max_entries = 200
//! charset_collate = "DEFAULT CHARSET=utf8mb4"
//! dialect = "sqlite"
//!
//! [table_prefix]
//! base = "wp_"
//! site = "wp_2_"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{invalid_config, invalid_slug, io_error, Result};
use crate::schema::{Dialect, TablePrefix};

pub const DEFAULT_OPTION_PREFIX: &str = "digitalis_schema";
pub const DEFAULT_LOCK_TTL_SECS: u64 = 120;
pub const DEFAULT_LOG_MAX_ENTRIES: usize = 200;

/// Slug prefixes that would alias the lock and log keys of another module
pub const RESERVED_SLUG_PREFIXES: [&str; 2] = ["lock_", "log_"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Prefix of the version, lock and log option keys
    pub option_prefix: String,
    pub lock_ttl_secs: u64,
    pub log_max_entries: usize,
    pub table_prefix: TablePrefix,
    /// Appended to every `CREATE TABLE` (MySQL only)
    pub charset_collate: String,
    pub dialect: Dialect,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            option_prefix: DEFAULT_OPTION_PREFIX.to_string(),
            lock_ttl_secs: DEFAULT_LOCK_TTL_SECS,
            log_max_entries: DEFAULT_LOG_MAX_ENTRIES,
            table_prefix: TablePrefix::default(),
            charset_collate: String::new(),
            dialect: Dialect::default(),
        }
    }
}

impl SchemaConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_CONFIG` on a syntax error, an unknown key or a value
    /// rejected by [`SchemaConfig::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SchemaConfig = toml::from_str(text).map_err(|e| invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// `ERR_IO` when the file cannot be read, otherwise as
    /// [`SchemaConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| io_error("load_config", e))?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// `ERR_INVALID_CONFIG` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.option_prefix.trim().is_empty() {
            return Err(invalid_config("option_prefix must not be empty"));
        }
        if self.lock_ttl_secs == 0 {
            return Err(invalid_config("lock_ttl_secs must be at least 1"));
        }
        if self.log_max_entries == 0 {
            return Err(invalid_config("log_max_entries must be at least 1"));
        }
        Ok(())
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    /// Check that `slug` maps to option keys no other module can produce.
    ///
    /// Slugs are ASCII letters, digits, `_` and `-`, and must not start
    /// with one of [`RESERVED_SLUG_PREFIXES`].
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` naming the slug.
    pub fn validate_slug(&self, slug: &str) -> Result<()> {
        if slug.is_empty() {
            return Err(invalid_slug(slug, "slug is empty"));
        }
        if let Some(bad) = slug
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(invalid_slug(slug, format!("character '{}' is not allowed", bad)));
        }
        if let Some(prefix) = RESERVED_SLUG_PREFIXES.iter().find(|p| slug.starts_with(**p)) {
            return Err(invalid_slug(
                slug,
                format!("prefix '{}' is reserved for lock and log keys", prefix),
            ));
        }
        Ok(())
    }

    /// `<prefix>_<slug>`: installed version
    pub fn version_key(&self, slug: &str) -> String {
        format!("{}_{}", self.option_prefix, slug)
    }

    /// `<prefix>_lock_<slug>`: lock timestamp
    pub fn lock_key(&self, slug: &str) -> String {
        format!("{}_lock_{}", self.option_prefix, slug)
    }

    /// `<prefix>_log_<slug>`: persisted run log
    pub fn log_key(&self, slug: &str) -> String {
        format!("{}_log_{}", self.option_prefix, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digitalis_core::ExErrorKind;

    #[test]
    fn test_defaults() {
        let config = SchemaConfig::default();
        assert_eq!(config.option_prefix, "digitalis_schema");
        assert_eq!(config.lock_ttl(), Duration::from_secs(120));
        assert_eq!(config.log_max_entries, 200);
        assert_eq!(config.table_prefix.site, "wp_");
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.version_key("shop"), "digitalis_schema_shop");
        assert_eq!(config.lock_key("shop"), "digitalis_schema_lock_shop");
    }

    #[test]
    fn test_reserved_slugs_cannot_alias_other_keys() {
        let config = SchemaConfig::default();
        // a slug of "log_shop" would read the log of "shop" as its version
        assert_eq!(config.version_key("log_shop"), config.log_key("shop"));

        for slug in ["log_shop", "lock_shop", "", "shop.v2", "shop orders"] {
            let err = config.validate_slug(slug).unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::InvalidInput, "slug {:?}", slug);
            assert_eq!(err.module(), Some(slug));
        }
        for slug in ["shop", "gift-cards", "orders_2", "catalog_log"] {
            assert!(config.validate_slug(slug).is_ok(), "slug {:?}", slug);
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SchemaConfig::from_toml_str(
            "lock_ttl_secs = 30\ndialect = \"mysql\"\n[table_prefix]\nsite = \"wp_3_\"\n",
        )
        .unwrap();
        assert_eq!(config.lock_ttl_secs, 30);
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.table_prefix.base, "wp_");
        assert_eq!(config.table_prefix.site, "wp_3_");
        assert_eq!(config.log_max_entries, 200);
    }

    #[test]
    fn test_validation_rejects_zero_ttl_and_unknown_keys() {
        let err = SchemaConfig::from_toml_str("lock_ttl_secs = 0").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidConfig);

        let err = SchemaConfig::from_toml_str("lock_ttl = 5").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidConfig);

        let err = SchemaConfig::from_toml_str("option_prefix = \"  \"").unwrap_err();
        assert!(err.message().contains("option_prefix"));
    }
}
