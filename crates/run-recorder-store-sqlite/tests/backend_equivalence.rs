// crates/run-recorder-store-sqlite/tests/backend_equivalence.rs
// ============================================================================
// Module: Backend Equivalence Property Tests
// Description: Replays random histories against the memory and SQLite stores.
// Purpose: Ensure both backends produce identical dense projections.
// ============================================================================

//! Property tests comparing the in-memory and `SQLite` measure stores.

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

use proptest::prelude::*;
use run_recorder_core::DefaultValue;
use run_recorder_core::InMemoryMeasureStore;
use run_recorder_core::Label;
use run_recorder_core::MeasureLimit;
use run_recorder_core::MeasureRef;
use run_recorder_core::MeasureStore;
use run_recorder_core::MetricLabel;
use run_recorder_core::ProjectRef;
use run_recorder_core::Separator;
use run_recorder_store_sqlite::SqliteMeasureStore;
use run_recorder_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One step of a generated history.
#[derive(Debug, Clone)]
enum Op {
    /// Register a metric with a default.
    AddMetric(String, String),
    /// Record a measure with raw values.
    AddMeasure(BTreeMap<String, String>),
    /// Delete the n-th recorded measure, if any.
    DeleteMeasure(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let label = "cpu|mem|disk|net";
    prop_oneof![
        (label, "[a-z0-9]{1,4}").prop_map(|(label, default)| Op::AddMetric(label, default)),
        prop::collection::btree_map(
            "cpu|mem|disk|net|ghost",
            prop_oneof![Just("bad&value".to_string()), "[0-9.]{1,5}"],
            0 .. 4,
        )
        .prop_map(Op::AddMeasure),
        (0usize .. 8).prop_map(Op::DeleteMeasure),
    ]
}

/// Applies an operation and returns the created measure, if any.
fn apply(store: &dyn MeasureStore, project: ProjectRef, op: &Op, measures: &[MeasureRef]) -> Option<MeasureRef> {
    match op {
        Op::AddMetric(label, default) => {
            store
                .add_metric(
                    project,
                    &MetricLabel::parse(label).unwrap(),
                    &DefaultValue::parse(default).unwrap(),
                )
                .unwrap();
            None
        }
        Op::AddMeasure(values) => Some(store.add_measure(project, values).unwrap().measure_ref),
        Op::DeleteMeasure(index) => {
            if let Some(measure) = measures.get(*index) {
                let _ = store.delete_measure(*measure);
            }
            None
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn memory_and_sqlite_projections_agree(
        ops in prop::collection::vec(op_strategy(), 0 .. 24),
        last in 0u64 .. 6
    ) {
        let temp = TempDir::new().unwrap();
        let sqlite = SqliteMeasureStore::open(&SqliteStoreConfig::for_path(temp.path().join("eq.db"))).unwrap();
        let memory = InMemoryMeasureStore::new();
        let label = Label::parse("bench").unwrap();
        let sqlite_project = sqlite.add_project(&label).unwrap().project_ref;
        let memory_project = memory.add_project(&label).unwrap().project_ref;

        let mut sqlite_measures = Vec::new();
        let mut memory_measures = Vec::new();
        for op in &ops {
            if let Some(measure) = apply(&sqlite, sqlite_project, op, &sqlite_measures) {
                sqlite_measures.push(measure);
            }
            if let Some(measure) = apply(&memory, memory_project, op, &memory_measures) {
                memory_measures.push(measure);
            }
        }
        prop_assert_eq!(&sqlite_measures, &memory_measures);

        let limit = MeasureLimit::from_count(last);
        let from_sqlite = sqlite.project(sqlite_project, limit).unwrap();
        let from_memory = memory.project(memory_project, limit).unwrap();
        prop_assert_eq!(from_sqlite.to_records(), from_memory.to_records());
        prop_assert_eq!(
            from_sqlite.to_delimited_text(&Separator::default()),
            from_memory.to_delimited_text(&Separator::default())
        );
    }
}
