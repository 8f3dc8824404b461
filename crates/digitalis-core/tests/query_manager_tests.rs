#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{args, call_log, TestProfile};
use digitalis_core::core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use digitalis_core::errors::{ExError, ExErrorKind};
use digitalis_core::logging_facility::test_capture::init_test_capture;
use digitalis_core::query::{
    ExecutionContext, ExecutionRole, ProfileMode, ProfileRules, ProfileSelection, Query,
    QueryBackend, QueryManager, RequestEnv, SelectionMode, SqlClauses, StampMerge,
};
use serde_json::{json, Map, Value};

/// Backend that records what it was asked to run
#[derive(Default)]
struct RecordingBackend {
    seen: Vec<(Map<String, Value>, SqlClauses)>,
    fail: bool,
}

impl QueryBackend for RecordingBackend {
    type Row = u64;

    fn fetch(
        &mut self,
        vars: &Map<String, Value>,
        clauses: &SqlClauses,
    ) -> Result<Vec<u64>, ExError> {
        self.seen.push((vars.clone(), clauses.clone()));
        if self.fail {
            return Err(ExError::new(ExErrorKind::Persistence).with_message("backend offline"));
        }
        Ok(vec![7, 8])
    }
}

#[test]
fn test_profiles_run_in_descending_priority() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager
        .register(TestProfile::new("Low", 5, &log))
        .register(TestProfile::new("High", 20, &log))
        .register(TestProfile::new("Mid", 10, &log));

    assert_eq!(manager.profile_names(), vec!["High", "Mid", "Low"]);

    let mut query = Query::new(Map::new());
    let applied = manager.apply(&mut query);

    assert_eq!(*log.borrow(), vec!["High", "Mid", "Low"]);
    assert_eq!(applied.vars.get("applied"), Some(&json!(["High", "Mid", "Low"])));
}

#[test]
fn test_equal_priorities_keep_registration_order() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager
        .register(TestProfile::new("First", 10, &log))
        .register(TestProfile::new("Second", 10, &log))
        .register(TestProfile::new("Third", 10, &log));

    assert_eq!(manager.profile_names(), vec!["First", "Second", "Third"]);
}

#[test]
fn test_apply_is_idempotent_per_query() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager.register(TestProfile::new("Once", 10, &log).with_where(" AND 1=1"));

    let mut query = Query::new(args(json!({"posts_per_page": 5})));
    let first = manager.apply(&mut query);
    assert_eq!(first.mods.len(), 1);
    assert!(query.is_applied());

    let second = manager.apply(&mut query);
    assert!(second.mods.is_empty());
    assert_eq!(second.vars, first.vars);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_selectable_profile_needs_allowed_selection() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager.register(TestProfile::new("Featured", 10, &log).mode(ProfileMode::Selectable));

    // named but not allowed
    let mut blocked = Query::new(Map::new()).with_selection(ProfileSelection {
        allow: false,
        include: vec!["Featured".to_string()],
        exclude: Vec::new(),
    });
    manager.apply(&mut blocked);
    assert!(log.borrow().is_empty());

    // allowed but not named
    let mut unnamed = Query::new(Map::new()).with_selection(ProfileSelection::allowed());
    manager.apply(&mut unnamed);
    assert!(log.borrow().is_empty());

    let mut chosen =
        Query::new(Map::new()).with_selection(ProfileSelection::allowed().include("Featured"));
    manager.apply(&mut chosen);
    assert_eq!(*log.borrow(), vec!["Featured"]);
}

#[test]
fn test_curated_selection_turns_off_ambient_profiles() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager
        .register(TestProfile::new("Ambient", 10, &log))
        .register(TestProfile::new("Baseline", 10, &log).mode(ProfileMode::Baseline))
        .register(TestProfile::new("Picked", 10, &log).mode(ProfileMode::Selectable));

    let mut query =
        Query::new(Map::new()).with_selection(ProfileSelection::allowed().include("Picked"));
    manager.apply(&mut query);

    assert_eq!(
        query.stamp.as_ref().map(|s| s.selection_mode),
        Some(SelectionMode::Explicit)
    );
    assert_eq!(*log.borrow(), vec!["Baseline", "Picked"]);
}

#[test]
fn test_exclusion_suppresses_baseline() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager
        .register(TestProfile::new("Sorting", 10, &log).mode(ProfileMode::Baseline))
        .register(TestProfile::new("Paging", 5, &log).mode(ProfileMode::Baseline));

    let mut query =
        Query::new(Map::new()).with_selection(ProfileSelection::allowed().exclude("Sorting"));
    manager.apply(&mut query);

    assert_eq!(*log.borrow(), vec!["Paging"]);
}

#[test]
fn test_rules_filter_by_post_type_and_role() {
    let log = call_log();
    let mut manager = QueryManager::new().with_env(RequestEnv::admin());
    manager.register(
        TestProfile::new("AdminProducts", 10, &log).rules(
            ProfileRules::new()
                .post_types(["product"])
                .roles([ExecutionRole::AdminMain]),
        ),
    );

    let mut pages = Query::main(args(json!({"post_type": "page"})));
    manager.before_query(&mut pages);
    assert!(log.borrow().is_empty());

    let mut programmatic = Query::new(args(json!({"post_type": "product"})));
    manager.before_query(&mut programmatic);
    assert!(log.borrow().is_empty());

    let mut main = Query::main(args(json!({"post_type": "product"})));
    manager.before_query(&mut main);
    assert_eq!(*log.borrow(), vec!["AdminProducts"]);

    let stamp = main.stamp.as_ref().unwrap();
    assert_eq!(stamp.role, ExecutionRole::AdminMain);
    assert_eq!(stamp.context, ExecutionContext::Admin);
}

#[test]
fn test_taxonomy_archive_matches_object_types() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager.taxonomies_mut().register("product_cat", ["product"]);
    manager.register(
        TestProfile::new("Catalog", 10, &log).rules(ProfileRules::new().post_types(["product"])),
    );

    let mut archive = Query::main(Map::new()).with_taxonomy_archive("product_cat");
    manager.before_query(&mut archive);
    assert_eq!(*log.borrow(), vec!["Catalog"]);

    let mut blog = Query::main(Map::new());
    manager.before_query(&mut blog);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_hook_lifecycle_parks_and_evicts_mutators() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager
        .register(TestProfile::new("InStock", 20, &log).with_where(" AND stock > 0"))
        .register(TestProfile::new("Visible", 10, &log).with_where(" AND visible = 1"));

    let mut query = Query::main(Map::new());
    manager.before_query(&mut query);
    assert_eq!(manager.pending_mutators(), 1);

    // re-entrant hook is a no-op
    manager.before_query(&mut query);
    assert_eq!(log.borrow().len(), 2);

    let clauses = manager.assemble_clauses(SqlClauses::default(), &query);
    assert_eq!(clauses.where_clause, " AND stock > 0 AND visible = 1");

    let rows = manager.after_results(vec!["a", "b"], &query);
    assert_eq!(rows, vec!["a", "b"]);
    assert_eq!(manager.pending_mutators(), 0);

    let untouched = manager.assemble_clauses(SqlClauses::default(), &query);
    assert_eq!(untouched, SqlClauses::default());
}

#[test]
fn test_execute_runs_backend_with_mutated_clauses() {
    let capture = init_test_capture();
    let log = call_log();
    let mut manager = QueryManager::new();
    manager.register(TestProfile::new("Exec", 10, &log).with_where(" AND exec = 1"));

    let mut backend = RecordingBackend::default();
    let mut query = Query::new(args(json!({"post_type": "product"})));
    let merge = StampMerge {
        multiple: Some(false),
        ..StampMerge::default()
    };

    let rows = manager.execute(&mut query, merge, &mut backend).unwrap();

    assert_eq!(rows, vec![7, 8]);
    assert_eq!(backend.seen.len(), 1);
    let (vars, clauses) = &backend.seen[0];
    assert_eq!(vars.get("applied"), Some(&json!(["Exec"])));
    assert_eq!(clauses.where_clause, " AND exec = 1");
    assert_eq!(manager.pending_mutators(), 0);

    let stamp = query.stamp.as_ref().unwrap();
    assert!(!stamp.multiple);
    assert_eq!(stamp.role, ExecutionRole::Programmatic);

    let query_id = query.id.as_ref().unwrap().to_string();
    let events = capture.events_with("query_id", &query_id);
    let of = |op: &str, event: &str| -> Vec<_> {
        events
            .iter()
            .filter(|e| e.op.as_deref() == Some(op) && e.event.as_deref() == Some(event))
            .cloned()
            .collect()
    };

    let applied = of("apply_profiles", EVENT_END);
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].field("profile_count"), Some("1"));
    assert_eq!(applied[0].field("mutator_count"), Some("1"));

    assert_eq!(of("execute_query", EVENT_START).len(), 1);
    let executed = of("execute_query", EVENT_END);
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].field("row_count"), Some("2"));
    assert!(of("execute_query", EVENT_END_ERROR).is_empty());
}

#[test]
fn test_before_query_stamps_singular_queries() {
    let log = call_log();
    let mut manager = QueryManager::new();
    manager.register(TestProfile::new("Any", 10, &log));

    let mut single = Query::main(args(json!({"p": 42, "posts_per_page": 1})));
    manager.before_query(&mut single);
    let stamp = single.stamp.as_ref().unwrap();
    assert!(!stamp.multiple);
    assert_eq!(stamp.role, ExecutionRole::FrontMain);

    let mut archive = Query::main(args(json!({"post_type": "product"})));
    manager.before_query(&mut archive);
    assert!(archive.stamp.as_ref().unwrap().multiple);

    let mut forced = Query::new(Map::new()).with_multiple(false);
    manager.before_query(&mut forced);
    assert!(!forced.stamp.as_ref().unwrap().multiple);
}

#[test]
fn test_execute_evicts_mutators_when_backend_fails() {
    let capture = init_test_capture();
    let log = call_log();
    let mut manager = QueryManager::new();
    manager.register(TestProfile::new("Failing", 10, &log).with_where(" AND nope"));

    let mut backend = RecordingBackend {
        fail: true,
        ..RecordingBackend::default()
    };
    let mut query = Query::new(Map::new());

    let err = manager
        .execute(&mut query, StampMerge::default(), &mut backend)
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Persistence);
    assert_eq!(manager.pending_mutators(), 0);

    let query_id = query.id.as_ref().unwrap().to_string();
    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some("execute_query")
            && e.event.as_deref() == Some(EVENT_START)
            && e.field("query_id") == Some(query_id.as_str())
    });
    assert_eq!(starts, 1);

    let errors = capture.count_events(|e| {
        e.field("query_id") == Some(query_id.as_str())
            && e.op.as_deref() == Some("execute_query")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field("err_code") == Some("ERR_PERSISTENCE")
    });
    assert_eq!(errors, 1);
}
