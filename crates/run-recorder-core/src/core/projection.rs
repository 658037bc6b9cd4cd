// crates/run-recorder-core/src/core/projection.rs
// ============================================================================
// Module: Run Recorder Dense Projection
// Description: Sparse-to-dense reconstruction of a project's measure table.
// Purpose: Define the projection shape every backend must produce.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A dense projection has one column per metric (ordered by label) and one row
//! per measure (ordered by timestamp, then reference). A cell holds the
//! explicitly recorded value when present and the metric default otherwise, so
//! metrics added late still yield complete rows for older measures.
//!
//! [`project_dense`] is the reference algorithm. The SQLite backend computes
//! the same table with a view and builds a [`DenseProjection`] from its rows.
//!
//! Security posture: cells are client text validated on write; see
//! `crate::core::labels` for the character rules.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::clock::MeasuredAt;
use crate::core::identifiers::MeasureRef;
use crate::core::identifiers::MetricRef;
use crate::core::labels::MeasureValue;
use crate::core::labels::MetricLabel;
use crate::core::model::MeasureLimit;
use crate::core::model::MeasureRecord;
use crate::core::model::MetricRecord;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One measure rendered against the full metric set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionRow {
    /// Measure reference.
    pub measure_ref: MeasureRef,
    /// Recording time of the measure.
    pub measured_at: MeasuredAt,
    /// Cell values in column order.
    pub cells: Vec<String>,
}

/// Dense, gap-filled table for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DenseProjection {
    /// Metric labels ordered by label.
    pub columns: Vec<MetricLabel>,
    /// Rows ordered by `(measured_at, measure_ref)`.
    pub rows: Vec<ProjectionRow>,
}

impl DenseProjection {
    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the project has no selected measures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the cells of a measure, if it is part of the projection.
    #[must_use]
    pub fn row(&self, measure_ref: MeasureRef) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.measure_ref == measure_ref)
            .map(|row| row.cells.as_slice())
    }

    /// Keeps the rows selected by `limit`, preserving row order.
    ///
    /// `Last(n)` keeps the `n` largest measure references.
    #[must_use]
    pub fn limited(self, limit: MeasureLimit) -> Self {
        let MeasureLimit::Last(count) = limit else {
            return self;
        };
        let keep = usize::try_from(count).unwrap_or(usize::MAX);
        let refs: BTreeSet<MeasureRef> = self.rows.iter().map(|row| row.measure_ref).collect();
        let selected: BTreeSet<MeasureRef> = refs.into_iter().rev().take(keep).collect();
        Self {
            columns: self.columns,
            rows: self.rows.into_iter().filter(|row| selected.contains(&row.measure_ref)).collect(),
        }
    }
}

// ============================================================================
// SECTION: Projection Algorithm
// ============================================================================

/// Builds the dense projection of one project.
///
/// `metrics` and `measures` must belong to the same project; `values` may hold
/// facts of other projects, which are never looked up.
#[must_use]
pub fn project_dense(
    metrics: &[MetricRecord],
    measures: &[MeasureRecord],
    values: &BTreeMap<(MeasureRef, MetricRef), MeasureValue>,
    limit: MeasureLimit,
) -> DenseProjection {
    let mut metrics: Vec<&MetricRecord> = metrics.iter().collect();
    metrics.sort_by(|left, right| left.label.cmp(&right.label));

    let mut rows: Vec<ProjectionRow> = measures
        .iter()
        .map(|measure| ProjectionRow {
            measure_ref: measure.measure_ref,
            measured_at: measure.measured_at.clone(),
            cells: metrics
                .iter()
                .map(|metric| {
                    values.get(&(measure.measure_ref, metric.metric_ref)).map_or_else(
                        || metric.default_value.as_str().to_string(),
                        |value| value.as_str().to_string(),
                    )
                })
                .collect(),
        })
        .collect();
    rows.sort_by(|left, right| {
        left.measured_at
            .cmp(&right.measured_at)
            .then(left.measure_ref.cmp(&right.measure_ref))
    });

    let projection = DenseProjection {
        columns: metrics.into_iter().map(|metric| metric.label.clone()).collect(),
        rows,
    };
    projection.limited(limit)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::identifiers::ProjectRef;
    use crate::core::labels::DefaultValue;

    fn metric(metric_ref: i64, label: &str, default: &str) -> MetricRecord {
        MetricRecord {
            metric_ref: MetricRef::new(metric_ref),
            project_ref: ProjectRef::new(1),
            label: MetricLabel::parse(label).unwrap(),
            default_value: DefaultValue::parse(default).unwrap(),
        }
    }

    fn measure(measure_ref: i64, at: &str) -> MeasureRecord {
        MeasureRecord {
            measure_ref: MeasureRef::new(measure_ref),
            project_ref: ProjectRef::new(1),
            measured_at: MeasuredAt::from_stored(at),
        }
    }

    #[test]
    fn columns_follow_label_order_and_gaps_use_defaults() {
        let metrics = vec![metric(1, "zeta", "z"), metric(2, "alpha", "a")];
        let measures = vec![measure(1, "2026-01-01 00:00:00.000")];
        let mut values = BTreeMap::new();
        values.insert((MeasureRef::new(1), MetricRef::new(1)), MeasureValue::parse("zeta", "9").unwrap());

        let projection = project_dense(&metrics, &measures, &values, MeasureLimit::All);
        let labels: Vec<&str> = projection.columns.iter().map(MetricLabel::as_str).collect();
        assert_eq!(labels, vec!["alpha", "zeta"]);
        assert_eq!(projection.rows[0].cells, vec!["a".to_string(), "9".to_string()]);
    }

    #[test]
    fn limit_keeps_largest_refs_in_time_order() {
        let metrics = vec![metric(1, "m", "0")];
        let measures = vec![
            measure(1, "2026-01-01 00:00:00.000"),
            measure(2, "2026-01-01 00:00:02.000"),
            measure(3, "2026-01-01 00:00:01.000"),
        ];
        let projection =
            project_dense(&metrics, &measures, &BTreeMap::new(), MeasureLimit::Last(2));
        let refs: Vec<i64> = projection.rows.iter().map(|row| row.measure_ref.get()).collect();
        assert_eq!(refs, vec![3, 2]);
    }

    #[test]
    fn equal_timestamps_order_by_reference() {
        let measures = vec![
            measure(5, "2026-01-01 00:00:00.000"),
            measure(4, "2026-01-01 00:00:00.000"),
        ];
        let projection = project_dense(&[], &measures, &BTreeMap::new(), MeasureLimit::All);
        let refs: Vec<i64> = projection.rows.iter().map(|row| row.measure_ref.get()).collect();
        assert_eq!(refs, vec![4, 5]);
        assert!(projection.rows.iter().all(|row| row.cells.is_empty()));
    }
}
