#![allow(clippy::unwrap_used, clippy::expect_used)]

use digitalis_core::core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use digitalis_core::core_types::RunId;
use digitalis_core::errors::DigitalisError;
use digitalis_core::logging_facility::test_capture::init_test_capture;
use digitalis_core::logging_facility::Profile;
use digitalis_core::{log_op_end, log_op_error, log_op_start};

// The capture is process-wide; every test filters on its own module slug
// or run id.

#[test]
fn test_start_and_end_pair_on_run_id() {
    let capture = init_test_capture();
    let run_id = RunId::new();

    log_op_start!("migrate_module", module = "newsletter", run_id = %run_id);
    log_op_end!("migrate_module", duration_ms = 42, module = "newsletter", run_id = %run_id);

    let events = capture.events_with("run_id", run_id.as_str());
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert!(events.iter().all(|e| e.op.as_deref() == Some("migrate_module")));
    assert_eq!(events[1].field("duration_ms"), Some("42"));
}

#[test]
fn test_start_without_fields_names_component() {
    let capture = init_test_capture();

    log_op_start!("rebuild_taxonomy_index");

    let starts: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| {
            e.op.as_deref() == Some("rebuild_taxonomy_index")
                && e.event.as_deref() == Some(EVENT_START)
        })
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(
        starts[0].component.as_deref(),
        Some("logging_facility_tests")
    );
}

#[test]
fn test_error_carries_code_and_kind() {
    let capture = init_test_capture();

    let err = DigitalisError::TableNotRegistered {
        slug: "subscribers".to_string(),
    };
    log_op_error!("create_table", err, duration_ms = 10, module = "mailing_list");

    let errors: Vec<_> = capture
        .events_with("module", "mailing_list")
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();

    assert_eq!(errors.len(), 1);
    let event = &errors[0];
    assert_eq!(event.level, tracing::Level::ERROR);
    assert_eq!(event.op.as_deref(), Some("create_table"));
    assert_eq!(event.field("err_code"), Some("ERR_NOT_REGISTERED"));
    assert_eq!(event.field("err_kind"), Some("NotRegistered"));
}

#[test]
fn test_assert_event_exists_and_count() {
    let capture = init_test_capture();
    log_op_start!("uninstall_module", module = "gift_cards");
    capture.assert_event_exists("uninstall_module", EVENT_START);

    let count = capture.count_events(|e| e.field("module") == Some("gift_cards"));
    assert_eq!(count, 1);
}

#[test]
fn test_profile_parses_from_str() {
    assert_eq!("dev".parse::<Profile>().unwrap(), Profile::Development);
    assert_eq!("production".parse::<Profile>().unwrap(), Profile::Production);
    assert_eq!("test".parse::<Profile>().unwrap(), Profile::Test);
    assert!("verbose".parse::<Profile>().is_err());
}
