// crates/run-recorder-core/tests/memory_store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Behavioral tests for the in-memory measurement store.
// Purpose: Verify catalog idempotence, sparse writes, and dense projections.
// Dependencies: run-recorder-core
// ============================================================================

//! In-memory store behavior tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use run_recorder_core::CURRENT_STORE_VERSION;
use run_recorder_core::DefaultValue;
use run_recorder_core::InMemoryMeasureStore;
use run_recorder_core::Label;
use run_recorder_core::MeasureLimit;
use run_recorder_core::MeasureRef;
use run_recorder_core::MeasureStore;
use run_recorder_core::MetricLabel;
use run_recorder_core::ProjectRef;
use run_recorder_core::StoreError;
use run_recorder_core::ValidationError;

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
}

fn project(store: &InMemoryMeasureStore, label: &str) -> ProjectRef {
    store.add_project(&Label::parse(label).unwrap()).unwrap().project_ref
}

fn metric(store: &InMemoryMeasureStore, project: ProjectRef, label: &str, default: &str) {
    store
        .add_metric(project, &MetricLabel::parse(label).unwrap(), &DefaultValue::parse(default).unwrap())
        .unwrap();
}

#[test]
fn add_project_is_idempotent() {
    let store = InMemoryMeasureStore::new();
    let label = Label::parse("demo").unwrap();
    let first = store.add_project(&label).unwrap();
    let second = store.add_project(&label).unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.project_ref, second.project_ref);
    assert_eq!(store.resolve_project(&label).unwrap(), first.project_ref);
    assert_eq!(store.list_projects().unwrap().len(), 1);
    assert_eq!(store.version(), CURRENT_STORE_VERSION);
}

#[test]
fn add_metric_is_idempotent_and_keeps_first_default() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    let label = MetricLabel::parse("latency").unwrap();
    let first = store.add_metric(demo, &label, &DefaultValue::parse("0").unwrap()).unwrap();
    let second = store.add_metric(demo, &label, &DefaultValue::parse("9").unwrap()).unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.metric_ref, second.metric_ref);
    let metrics = store.list_metrics(demo).unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].default_value.as_str(), "0");
}

#[test]
fn metrics_list_in_label_order() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    metric(&store, demo, "zeta", "1");
    metric(&store, demo, "alpha", "1");
    metric(&store, demo, "mid", "1");
    let labels: Vec<String> =
        store.list_metrics(demo).unwrap().into_iter().map(|m| m.label.to_string()).collect();
    assert_eq!(labels, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn unknown_project_is_not_found() {
    let store = InMemoryMeasureStore::new();
    let missing = ProjectRef::new(42);
    assert!(matches!(store.resolve_project(&Label::parse("nope").unwrap()), Err(StoreError::NotFound(_))));
    assert!(matches!(store.list_metrics(missing), Err(StoreError::NotFound(_))));
    assert!(matches!(store.add_measure(missing, &values(&[])), Err(StoreError::NotFound(_))));
    assert!(matches!(store.project(missing, MeasureLimit::All), Err(StoreError::NotFound(_))));
    assert!(matches!(store.flush_project(missing), Err(StoreError::NotFound(_))));
}

#[test]
fn demo_latency_scenario_fills_defaults() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    metric(&store, demo, "latency", "0");
    store.add_measure(demo, &values(&[])).unwrap();
    store.add_measure(demo, &values(&[("latency", "42")])).unwrap();

    let projection = store.project(demo, MeasureLimit::All).unwrap();
    let cells: Vec<Vec<String>> = projection.rows.iter().map(|row| row.cells.clone()).collect();
    assert_eq!(cells, vec![vec!["0".to_string()], vec!["42".to_string()]]);
}

#[test]
fn late_metric_default_backfills_older_rows() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    metric(&store, demo, "a", "x");
    let first = store.add_measure(demo, &values(&[("a", "1")])).unwrap();
    metric(&store, demo, "b", "fallback");
    let second = store.add_measure(demo, &values(&[("a", "2"), ("b", "3")])).unwrap();

    let projection = store.project(demo, MeasureLimit::All).unwrap();
    assert_eq!(projection.row(first.measure_ref).unwrap(), ["1", "fallback"]);
    assert_eq!(projection.row(second.measure_ref).unwrap(), ["2", "3"]);
}

#[test]
fn add_measure_reports_skipped_and_rejected_entries() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    metric(&store, demo, "a", "0");
    metric(&store, demo, "b", "0");
    metric(&store, demo, "c", "0");

    let write = store
        .add_measure(demo, &values(&[("a", "1"), ("b", "bad=value"), ("c", "3"), ("ghost", "7")]))
        .unwrap();
    assert_eq!(write.stored, 2);
    assert_eq!(write.skipped, vec!["ghost".to_string()]);
    let failure = write.partial_failure.expect("rejected value reported");
    assert_eq!(failure.measure_ref, write.measure_ref);
    assert_eq!(failure.rejected.len(), 1);
    assert_eq!(failure.rejected[0].metric, "b");
    assert!(matches!(failure.rejected[0].reason, ValidationError::InvalidValue { .. }));

    let projection = store.project(demo, MeasureLimit::All).unwrap();
    assert_eq!(projection.row(write.measure_ref).unwrap(), ["1", "0", "3"]);
}

#[test]
fn delete_measure_removes_row() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    metric(&store, demo, "a", "0");
    let kept = store.add_measure(demo, &values(&[("a", "1")])).unwrap();
    let dropped = store.add_measure(demo, &values(&[("a", "2")])).unwrap();

    store.delete_measure(dropped.measure_ref).unwrap();
    let projection = store.project(demo, MeasureLimit::All).unwrap();
    assert_eq!(projection.len(), 1);
    assert!(projection.row(kept.measure_ref).is_some());
    assert!(projection.row(dropped.measure_ref).is_none());
    assert!(matches!(store.delete_measure(dropped.measure_ref), Err(StoreError::NotFound(_))));
    assert!(matches!(store.delete_measure(MeasureRef::new(999)), Err(StoreError::NotFound(_))));
}

#[test]
fn flush_project_removes_everything() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    let other = project(&store, "other");
    metric(&store, demo, "a", "0");
    metric(&store, other, "a", "0");
    store.add_measure(demo, &values(&[("a", "1")])).unwrap();
    let survivor = store.add_measure(other, &values(&[("a", "5")])).unwrap();

    store.flush_project(demo).unwrap();
    assert!(matches!(store.resolve_project(&Label::parse("demo").unwrap()), Err(StoreError::NotFound(_))));
    assert!(matches!(store.project(demo, MeasureLimit::All), Err(StoreError::NotFound(_))));
    let remaining = store.project(other, MeasureLimit::All).unwrap();
    assert_eq!(remaining.row(survivor.measure_ref).unwrap(), ["5"]);

    let recreated = project(&store, "demo");
    assert_ne!(recreated, demo);
    assert!(store.list_metrics(recreated).unwrap().is_empty());
}

#[test]
fn last_limit_selects_newest_measures() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    metric(&store, demo, "n", "0");
    let refs: Vec<MeasureRef> = (1 ..= 5)
        .map(|i| store.add_measure(demo, &values(&[("n", i.to_string().as_str())])).unwrap().measure_ref)
        .collect();

    let last_two = store.project(demo, MeasureLimit::Last(2)).unwrap();
    let selected: Vec<MeasureRef> = last_two.rows.iter().map(|row| row.measure_ref).collect();
    assert_eq!(selected, refs[3 ..].to_vec());
    assert_eq!(store.project(demo, MeasureLimit::Last(50)).unwrap().len(), 5);
    assert_eq!(store.project(demo, MeasureLimit::All).unwrap().len(), 5);
}

#[test]
fn cached_projection_tracks_changes() {
    let store = InMemoryMeasureStore::new();
    let demo = project(&store, "demo");
    metric(&store, demo, "a", "0");
    store.add_measure(demo, &values(&[("a", "1")])).unwrap();
    assert_eq!(store.project(demo, MeasureLimit::All).unwrap().len(), 1);

    store.add_measure(demo, &values(&[])).unwrap();
    metric(&store, demo, "b", "z");
    let projection = store.project(demo, MeasureLimit::All).unwrap();
    assert_eq!(projection.len(), 2);
    assert_eq!(projection.columns.len(), 2);
    assert_eq!(projection.rows[1].cells, vec!["0".to_string(), "z".to_string()]);
}

#[test]
fn clones_share_state() {
    let store = InMemoryMeasureStore::new();
    let clone = store.clone();
    let demo = project(&store, "demo");
    assert_eq!(clone.resolve_project(&Label::parse("demo").unwrap()).unwrap(), demo);
}
