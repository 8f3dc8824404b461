//! Migration runner
//!
//! Brings one module's installed version up to its target under the lease
//! lock, persisting the version after every migration so a failure leaves
//! the schema at the last step that completed.

use std::time::Instant;

use rusqlite::Connection;
use serde_json::json;

use digitalis_core::core_types::schema::EVENT_SKIP;
use digitalis_core::errors::ExError;
use digitalis_core::{log_op_end, log_op_error, log_op_start};
use digitalis_core_types::RunId;

use super::context::SchemaContext;
use super::lock::MigrationLock;
use super::log::{LogLevel, MigrationLog};
use super::module::{validate_migrations, SchemaModule};
use crate::config::SchemaConfig;
use crate::errors::{corrupt_option, migration_error, Result};
use crate::options::OptionStore;
use crate::schema::TableRegistry;

/// Frames of the error chain kept in a failure log entry
const TRACE_FRAMES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrateOutcome {
    /// Installed version already at or past the target
    UpToDate { version: i64 },
    /// Another run holds the lock
    Locked,
    Migrated { from: i64, to: i64, applied: Vec<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    /// Names of the tables dropped, if any
    Uninstalled { dropped: Vec<String> },
    Locked,
}

pub struct MigrationRunner<'c, S: OptionStore> {
    conn: &'c Connection,
    store: S,
    config: SchemaConfig,
}

impl<'c, S: OptionStore> MigrationRunner<'c, S> {
    pub fn new(conn: &'c Connection, store: S, config: SchemaConfig) -> Self {
        Self {
            conn,
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn log(&self, slug: &str) -> MigrationLog<'_, S> {
        MigrationLog::new(
            &self.store,
            self.config.log_key(slug),
            self.config.log_max_entries,
        )
    }

    /// Highest fully applied version, `0` when never migrated.
    ///
    /// # Errors
    ///
    /// Invalid slug, store failure or a stored value that is not an integer.
    pub fn installed_version(&self, slug: &str) -> Result<i64> {
        self.config.validate_slug(slug)?;
        let key = self.config.version_key(slug);
        match self.store.get_option(&key)? {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|e| corrupt_option(&key, e)),
        }
    }

    fn set_installed_version(&self, slug: &str, version: i64) -> Result<()> {
        self.store
            .update_option(&self.config.version_key(slug), &version.to_string())
    }

    /// Timestamp stored in the module's lock, if any.
    ///
    /// # Errors
    ///
    /// Invalid slug or store failure.
    pub fn lock_holder(&self, slug: &str) -> Result<Option<i64>> {
        self.config.validate_slug(slug)?;
        Ok(self
            .store
            .get_option(&self.config.lock_key(slug))?
            .and_then(|raw| raw.trim().parse().ok()))
    }

    /// Delete the lock regardless of its age. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Invalid slug or store failure.
    pub fn force_unlock(&self, slug: &str) -> Result<bool> {
        self.config.validate_slug(slug)?;
        let removed = self.store.delete_option(&self.config.lock_key(slug))?;
        if removed {
            tracing::warn!(module = slug, "migration lock removed by operator");
        }
        Ok(removed)
    }

    /// Apply every migration in `(installed, target]`, in version order.
    ///
    /// Lock contention is not an error: the call returns
    /// [`MigrateOutcome::Locked`] without touching anything.
    ///
    /// # Errors
    ///
    /// Invalid registrations (before any SQL runs), a failing migration
    /// (`ERR_MIGRATION_FAILED`, cause attached as source) or store failure.
    /// The lock is released and a log entry written before returning.
    pub fn migrate_module(&self, module: &dyn SchemaModule) -> Result<MigrateOutcome> {
        let slug = module.slug();
        let target = module.target_version();
        let installed = self.installed_version(slug)?;

        if installed >= target {
            tracing::debug!(module = slug, version = installed, "schema up to date");
            return Ok(MigrateOutcome::UpToDate { version: installed });
        }

        let Some(lock) =
            MigrationLock::try_acquire(&self.store, &self.config.lock_key(slug), self.config.lock_ttl())?
        else {
            tracing::debug!(module = slug, event = EVENT_SKIP, "migration lock held, skipping");
            return Ok(MigrateOutcome::Locked);
        };

        let run_id = RunId::new();
        let start = Instant::now();
        log_op_start!("migrate_module", module = slug, run_id = %run_id, from = installed, to = target);

        let log = self.log(slug);
        match self.apply_pending(module, &log, &run_id) {
            Ok(outcome) => {
                lock.release()?;
                log_op_end!(
                    "migrate_module",
                    duration_ms = start.elapsed().as_millis() as u64,
                    module = slug,
                    run_id = %run_id
                );
                Ok(outcome)
            }
            Err(err) => {
                self.record_failure(&log, slug, &err, &run_id);
                release_quietly(lock);
                log_op_error!(
                    "migrate_module",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    module = slug,
                    run_id = %run_id
                );
                Err(err)
            }
        }
    }

    fn apply_pending(
        &self,
        module: &dyn SchemaModule,
        log: &MigrationLog<'_, S>,
        run_id: &RunId,
    ) -> Result<MigrateOutcome> {
        let slug = module.slug();
        let target = module.target_version();

        // another run may have finished between the first check and the lock
        let installed = self.installed_version(slug)?;
        if installed >= target {
            return Ok(MigrateOutcome::UpToDate { version: installed });
        }

        let registry = TableRegistry::from_tables(module.tables()).map_err(|e| e.with_module(slug))?;
        let migrations = validate_migrations(slug, module.migrations())?;
        let ctx = SchemaContext::new(self.conn, &registry, &self.config);

        let mut current = installed;
        let mut applied = Vec::new();
        for (version, migration) in migrations {
            if version <= current {
                continue;
            }
            if version > target {
                break;
            }

            tracing::info!(
                module = slug,
                version,
                migration = migration.name(),
                run_id = %run_id,
                "applying migration"
            );
            migration
                .up(&ctx)
                .map_err(|e| migration_error(slug, version, migration.name(), e))?;
            self.set_installed_version(slug, version)?;
            current = version;
            applied.push(version);

            log.log(
                LogLevel::Info,
                format!("Applied migration {} ({})", version, migration.name()),
                json!({ "module": slug, "version": version, "run_id": run_id.as_str() }),
            )?;
        }

        if current < target {
            self.set_installed_version(slug, target)?;
            current = target;
        }

        log.log(
            LogLevel::Info,
            format!("Module {} migrated from {} to {}", slug, installed, current),
            json!({
                "module": slug,
                "from": installed,
                "to": current,
                "applied": applied,
                "run_id": run_id.as_str(),
            }),
        )?;

        Ok(MigrateOutcome::Migrated {
            from: installed,
            to: current,
            applied,
        })
    }

    fn record_failure(&self, log: &MigrationLog<'_, S>, slug: &str, err: &ExError, run_id: &RunId) {
        let cause = err.source_error().unwrap_or(err);
        let context = json!({
            "module": slug,
            "version": err.version(),
            "message": err.to_string(),
            "error_code": cause.code(),
            "error_kind": format!("{:?}", cause.kind()),
            "trace": err.trace(TRACE_FRAMES),
            "run_id": run_id.as_str(),
        });
        if let Err(log_err) = log.log(
            LogLevel::Error,
            format!("Migration failed for module {}", slug),
            context,
        ) {
            tracing::warn!(module = slug, error = %log_err, "could not persist failure log entry");
        }
    }

    /// Remove the module's version record, optionally dropping its tables
    /// and clearing its log.
    ///
    /// Unlike [`MigrationRunner::migrate_module`], contention is reported:
    /// a warning entry is logged before returning
    /// [`UninstallOutcome::Locked`].
    ///
    /// # Errors
    ///
    /// Invalid slug, duplicate table slugs, a failing `DROP` or store failure.
    pub fn uninstall_module(
        &self,
        module: &dyn SchemaModule,
        drop_tables: bool,
        clear_logger: bool,
    ) -> Result<UninstallOutcome> {
        let slug = module.slug();
        self.config.validate_slug(slug)?;
        let log = self.log(slug);

        let Some(lock) =
            MigrationLock::try_acquire(&self.store, &self.config.lock_key(slug), self.config.lock_ttl())?
        else {
            tracing::warn!(module = slug, event = EVENT_SKIP, "uninstall skipped, migration lock held");
            log.log(
                LogLevel::Warning,
                format!("Uninstall of module {} skipped: lock held", slug),
                json!({ "module": slug }),
            )?;
            return Ok(UninstallOutcome::Locked);
        };

        let run_id = RunId::new();
        let start = Instant::now();
        log_op_start!("uninstall_module", module = slug, run_id = %run_id, drop_tables = drop_tables);

        match self.remove_module(module, drop_tables) {
            Ok(dropped) => {
                lock.release()?;
                if clear_logger {
                    log.clear()?;
                } else {
                    log.log(
                        LogLevel::Info,
                        format!("Module {} uninstalled", slug),
                        json!({ "module": slug, "dropped": dropped, "run_id": run_id.as_str() }),
                    )?;
                }
                log_op_end!(
                    "uninstall_module",
                    duration_ms = start.elapsed().as_millis() as u64,
                    module = slug,
                    run_id = %run_id
                );
                Ok(UninstallOutcome::Uninstalled { dropped })
            }
            Err(err) => {
                self.record_failure(&log, slug, &err, &run_id);
                release_quietly(lock);
                log_op_error!(
                    "uninstall_module",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    module = slug
                );
                Err(err)
            }
        }
    }

    fn remove_module(&self, module: &dyn SchemaModule, drop_tables: bool) -> Result<Vec<String>> {
        let slug = module.slug();
        let mut dropped = Vec::new();

        if drop_tables {
            let registry =
                TableRegistry::from_tables(module.tables()).map_err(|e| e.with_module(slug))?;
            let ctx = SchemaContext::new(self.conn, &registry, &self.config);
            for table in registry.tables() {
                dropped.push(ctx.drop_table(&table.slug)?);
            }
        }

        self.store.delete_option(&self.config.version_key(slug))?;
        Ok(dropped)
    }
}

fn release_quietly<S: OptionStore + ?Sized>(lock: MigrationLock<'_, S>) {
    let key = lock.key().to_string();
    if let Err(err) = lock.release() {
        tracing::warn!(key = %key, error = %err, "failed to release lock");
    }
}

impl<S: OptionStore> std::fmt::Debug for MigrationRunner<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("config", &self.config)
            .finish()
    }
}
