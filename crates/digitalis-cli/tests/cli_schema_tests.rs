//! CLI schema integration tests
//!
//! Drive the `digitalis` binary against a temporary database and a
//! directory of SQL migrations.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use digitalis_store::{db, OptionStore, SchemaConfig, SqliteOptionStore};
use tempfile::TempDir;

fn write_migrations(dir: &Path) -> PathBuf {
    let sql_dir = dir.join("migrations");
    fs::create_dir_all(&sql_dir).unwrap();
    fs::write(
        sql_dir.join("001_create_orders.sql"),
        "CREATE TABLE {{prefix}}orders (id INTEGER PRIMARY KEY, status TEXT NOT NULL);",
    )
    .unwrap();
    fs::write(
        sql_dir.join("002_add_total.sql"),
        "ALTER TABLE {{prefix}}orders ADD COLUMN total INTEGER NOT NULL DEFAULT 0;",
    )
    .unwrap();
    sql_dir
}

fn run(db_path: &Path, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_digitalis");
    Command::new(cli_bin)
        .arg("--db")
        .arg(db_path)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_migrate_then_status() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("site.db");
    let sql_dir = write_migrations(temp_dir.path());
    let dir = sql_dir.to_str().unwrap();

    let output = run(&db_path, &["schema", "migrate", "--module", "shop", "--dir", dir]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("Migrated shop from 0 to 2"), "got: {}", text);
    assert!(text.contains("applied: 1, 2"), "got: {}", text);

    let output = run(&db_path, &["schema", "status", "--module", "shop"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("installed_version: 2"), "got: {}", text);
    assert!(text.contains("lock: free"), "got: {}", text);

    // Table was created with the default site prefix
    let conn = db::open(&db_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM wp_orders", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);

    let output = run(&db_path, &["schema", "migrate", "--module", "shop", "--dir", dir]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("up to date at version 2"));
}

#[test]
fn test_cli_migrate_with_target_stops_early() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("site.db");
    let sql_dir = write_migrations(temp_dir.path());
    let dir = sql_dir.to_str().unwrap();

    let output = run(
        &db_path,
        &["schema", "migrate", "--module", "shop", "--dir", dir, "--target", "1"],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("from 0 to 1"));

    let output = run(&db_path, &["schema", "status", "--module", "shop"]);
    assert!(stdout(&output).contains("installed_version: 1"));
}

#[test]
fn test_cli_log_prints_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("site.db");
    let sql_dir = write_migrations(temp_dir.path());

    let output = run(
        &db_path,
        &["schema", "migrate", "--module", "shop", "--dir", sql_dir.to_str().unwrap()],
    );
    assert!(output.status.success());

    let output = run(&db_path, &["schema", "log", "--module", "shop"]);
    assert!(output.status.success());

    let entries: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e["level"] == "info"));
    assert!(entries.iter().all(|e| e["timestamp"].is_i64()));
}

#[test]
fn test_cli_failing_migration_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("site.db");
    let sql_dir = write_migrations(temp_dir.path());
    fs::write(sql_dir.join("003_broken.sql"), "ALTER TABLE missing_table ADD COLUMN x;").unwrap();

    let output = run(
        &db_path,
        &["schema", "migrate", "--module", "shop", "--dir", sql_dir.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error:"), "got: {}", stderr);

    // Steps before the failure stay applied
    let output = run(&db_path, &["schema", "status", "--module", "shop"]);
    let text = stdout(&output);
    assert!(text.contains("installed_version: 2"), "got: {}", text);
    assert!(text.contains("lock: free"), "got: {}", text);

    let output = run(&db_path, &["schema", "log", "--module", "shop"]);
    assert!(stdout(&output).contains("\"level\":\"error\""));
}

#[test]
fn test_cli_held_lock_skips_then_unlock() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("site.db");
    let sql_dir = write_migrations(temp_dir.path());
    let dir = sql_dir.to_str().unwrap();

    {
        let conn = db::open(&db_path).unwrap();
        let store = SqliteOptionStore::new(&conn).unwrap();
        let now = chrono::Utc::now().timestamp().to_string();
        store
            .update_option(&SchemaConfig::default().lock_key("shop"), &now)
            .unwrap();
    }

    let output = run(&db_path, &["schema", "status", "--module", "shop"]);
    assert!(stdout(&output).contains("lock: held"));

    let output = run(&db_path, &["schema", "migrate", "--module", "shop", "--dir", dir]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("locked by another run"));

    let output = run(&db_path, &["schema", "unlock", "--module", "shop"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Lock removed for shop"));

    let output = run(&db_path, &["schema", "unlock", "--module", "shop"]);
    assert!(stdout(&output).contains("was not locked"));

    let output = run(&db_path, &["schema", "migrate", "--module", "shop", "--dir", dir]);
    assert!(stdout(&output).contains("Migrated shop from 0 to 2"));
}

#[test]
fn test_cli_uninstall_drops_named_tables() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("site.db");
    let sql_dir = write_migrations(temp_dir.path());

    run(
        &db_path,
        &["schema", "migrate", "--module", "shop", "--dir", sql_dir.to_str().unwrap()],
    );

    let output = run(
        &db_path,
        &["schema", "uninstall", "--module", "shop", "--drop-table", "orders", "--clear-log"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("Uninstalled shop"));
    assert!(text.contains("dropped wp_orders"), "got: {}", text);

    let output = run(&db_path, &["schema", "status", "--module", "shop"]);
    assert!(stdout(&output).contains("installed_version: 0"));

    let output = run(&db_path, &["schema", "log", "--module", "shop"]);
    assert!(stdout(&output).trim().is_empty());
}

#[test]
fn test_cli_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("site.db");
    let config_path = temp_dir.path().join("schema.toml");
    fs::write(&config_path, "lock_ttl_secs = 0\n").unwrap();

    let output = run(
        &db_path,
        &["--config", config_path.to_str().unwrap(), "schema", "status", "--module", "shop"],
    );
    assert!(!output.status.success());
}
