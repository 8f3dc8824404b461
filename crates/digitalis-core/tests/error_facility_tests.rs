use digitalis_core::errors::{DigitalisError, ExError, ExErrorKind};
use digitalis_core::query::CompareOp;

#[test]
fn test_table_not_registered_verifiable_by_kind() {
    let err = DigitalisError::TableNotRegistered {
        slug: "orders".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::NotRegistered);
    assert_eq!(ex_err.code(), "ERR_NOT_REGISTERED");
    assert_eq!(ex_err.entity_id(), Some("orders"));
    assert!(ex_err.kind().is_configuration());
}

#[test]
fn test_duplicate_version_distinct_from_invalid_version() {
    let duplicate: ExError = DigitalisError::DuplicateMigrationVersion {
        module: "shop".to_string(),
        version: 2,
    }
    .into();
    let invalid: ExError = DigitalisError::InvalidMigrationVersion {
        module: "shop".to_string(),
        version: 0,
    }
    .into();

    assert_eq!(duplicate.code(), "ERR_DUPLICATE_MIGRATION_VERSION");
    assert_eq!(invalid.code(), "ERR_INVALID_MIGRATION_VERSION");
    assert_ne!(duplicate.kind(), invalid.kind());
    assert_eq!(duplicate.module(), Some("shop"));
    assert_eq!(invalid.version(), Some(0));
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidInput, "ERR_INVALID_INPUT"),
        (ExErrorKind::InvalidConfig, "ERR_INVALID_CONFIG"),
        (ExErrorKind::NotRegistered, "ERR_NOT_REGISTERED"),
        (ExErrorKind::AlreadyExists, "ERR_ALREADY_EXISTS"),
        (ExErrorKind::SqlFailed, "ERR_SQL_FAILED"),
        (ExErrorKind::MigrationFailed, "ERR_MIGRATION_FAILED"),
        (ExErrorKind::Io, "ERR_IO"),
        (ExErrorKind::Serialization, "ERR_SERIALIZATION"),
        (ExErrorKind::Persistence, "ERR_PERSISTENCE"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_migration_failed_display_names_module_and_version() {
    let ex_err: ExError = DigitalisError::MigrationFailed {
        module: "shop".to_string(),
        version: 3,
        message: "no such table: wp_orders".to_string(),
    }
    .into();

    let rendered = ex_err.with_op("migrate_module").to_string();
    assert!(rendered.starts_with("[ERR_MIGRATION_FAILED] in operation 'migrate_module'"));
    assert!(rendered.contains("(module: shop)"));
    assert!(rendered.contains("(version: 3)"));
}

#[test]
fn test_unknown_operator_parse_error() {
    let err = "LIKE-ISH".parse::<CompareOp>().unwrap_err();
    assert_eq!(
        err,
        DigitalisError::UnknownOperator {
            operator: "LIKE-ISH".to_string()
        }
    );

    let ex_err: ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_serde_error_conversion() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
    let err: DigitalisError = parse.unwrap_err().into();
    let ex_err: ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::Serialization);
    assert!(!ex_err.message().is_empty());
}

#[test]
fn test_source_chain_exposed_through_std_error() {
    let inner = ExError::new(ExErrorKind::SqlFailed).with_statement("CREATE TABLE x");
    let outer = ExError::new(ExErrorKind::MigrationFailed)
        .with_module("shop")
        .with_source(inner);

    let source = std::error::Error::source(&outer).expect("source present");
    assert!(source.to_string().contains("CREATE TABLE x"));
    assert_eq!(
        outer.source_error().map(ExError::kind),
        Some(ExErrorKind::SqlFailed)
    );
}
