// Integration tests for table descriptors and the schema context

use digitalis_core::ExErrorKind;
use digitalis_store::schema::{
    drop_sql, Column, DefaultValue, Dialect, Index, Table, TablePrefix, TableRegistry, TableScope,
};
use digitalis_store::{SchemaConfig, SchemaContext};
use rusqlite::Connection;

fn products() -> Table {
    Table::new("products", "shop_products")
        .column(Column::new("id", "INTEGER").auto_increment())
        .column(Column::new("sku", "VARCHAR(64)"))
        .column(
            Column::new("name", "VARCHAR(255)")
                .nullable(true)
                .default_value(DefaultValue::Text("x".into())),
        )
        .column(Column::new("price", "DECIMAL(10,2)").default_value(DefaultValue::Float(0.0)))
        .index(Index::primary(["id"]))
        .index(Index::unique("sku", ["sku"]))
}

#[test]
fn test_create_sql_single_statement_in_declared_order() {
    // Given: id INT AUTO_INCREMENT NOT NULL, name VARCHAR(255) NULL DEFAULT 'x', PRIMARY KEY(id)
    let table = Table::new("t", "t")
        .column(Column::new("id", "INT").auto_increment())
        .column(
            Column::new("name", "VARCHAR(255)")
                .nullable(true)
                .default_value(DefaultValue::Text("x".into())),
        )
        .index(Index::primary(["id"]));

    // When: rendered for MySQL
    let sql = table.create_sql("wp_t", Dialect::MySql, "");

    // Then: one statement, columns then key, in declared order
    assert_eq!(sql.matches("CREATE TABLE").count(), 1);
    assert_eq!(sql.matches(';').count(), 1);
    let id = sql.find("`id` INT NOT NULL AUTO_INCREMENT").unwrap();
    let name = sql.find("`name` VARCHAR(255) NULL DEFAULT 'x'").unwrap();
    let key = sql.find("PRIMARY KEY (`id`)").unwrap();
    assert!(id < name && name < key);
}

#[test]
fn test_sqlite_ddl_executes_and_enforces_unique() {
    let conn = Connection::open_in_memory().unwrap();
    let registry = TableRegistry::from_tables([products()]).unwrap();
    let config = SchemaConfig::default();
    let ctx = SchemaContext::new(&conn, &registry, &config);

    let name = ctx.create_table("products").unwrap();
    assert_eq!(name, "wp_shop_products");
    assert!(ctx.table_exists(&name).unwrap());
    assert!(ctx.index_exists(&name, "sku").unwrap());
    assert!(ctx.column_exists(&name, "price").unwrap());
    assert!(!ctx.column_exists(&name, "weight").unwrap());

    ctx.execute("INSERT INTO wp_shop_products (sku) VALUES ('A1')").unwrap();
    let err = ctx
        .execute("INSERT INTO wp_shop_products (sku) VALUES ('A1')")
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::SqlFailed);
    assert!(err.message().contains("UNIQUE"));

    let default_name: String = conn
        .query_row("SELECT name FROM wp_shop_products WHERE sku = 'A1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(default_name, "x");
}

#[test]
fn test_sql_failure_carries_statement_and_driver_text() {
    let conn = Connection::open_in_memory().unwrap();
    let registry = TableRegistry::new();
    let config = SchemaConfig::default();
    let ctx = SchemaContext::new(&conn, &registry, &config);

    let err = ctx.execute("ALTER TABLE nowhere ADD COLUMN x INT").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::SqlFailed);
    assert_eq!(err.statement(), Some("ALTER TABLE nowhere ADD COLUMN x INT"));
    assert!(err.message().contains("nowhere"));
}

#[test]
fn test_unregistered_slug_through_context() {
    let conn = Connection::open_in_memory().unwrap();
    let registry = TableRegistry::from_tables([products()]).unwrap();
    let config = SchemaConfig::default();
    let ctx = SchemaContext::new(&conn, &registry, &config);

    assert_eq!(
        ctx.create_table("refunds").unwrap_err().kind(),
        ExErrorKind::NotRegistered
    );
    assert_eq!(
        ctx.drop_table("refunds").unwrap_err().kind(),
        ExErrorKind::NotRegistered
    );
}

#[test]
fn test_network_scope_and_drop() {
    let conn = Connection::open_in_memory().unwrap();
    let registry = TableRegistry::from_tables([
        products().scope(TableScope::Network),
    ])
    .unwrap();
    let config = SchemaConfig {
        table_prefix: TablePrefix {
            base: "wp_".into(),
            site: "wp_7_".into(),
        },
        ..SchemaConfig::default()
    };
    let ctx = SchemaContext::new(&conn, &registry, &config);

    assert_eq!(ctx.table("products").unwrap(), "wp_shop_products");
    ctx.create_table("products").unwrap();
    ctx.drop_table("products").unwrap();
    assert!(!ctx.table_exists("wp_shop_products").unwrap());

    // dropping twice is harmless
    ctx.execute(&drop_sql("wp_shop_products")).unwrap();
}

#[test]
fn test_expand_placeholders() {
    let conn = Connection::open_in_memory().unwrap();
    let registry = TableRegistry::new();
    let config = SchemaConfig {
        table_prefix: TablePrefix {
            base: "wp_".into(),
            site: "wp_2_".into(),
        },
        ..SchemaConfig::default()
    };
    let ctx = SchemaContext::new(&conn, &registry, &config);
    assert_eq!(
        ctx.expand("SELECT * FROM {{prefix}}a JOIN {{base_prefix}}b"),
        "SELECT * FROM wp_2_a JOIN wp_b"
    );
}
