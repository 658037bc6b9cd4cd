// crates/run-recorder-core/src/core/model.rs
// ============================================================================
// Module: Run Recorder Data Model
// Description: Catalog records, sparse facts, and write outcomes.
// Purpose: Share the entity model and the per-value write policy across stores.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Projects own metrics and measures; values hang off measures and reference
//! a metric of the same project. Only explicitly supplied values are stored,
//! which keeps the fact table sparse while the metric registry (with its
//! defaults) describes the full column set.
//!
//! [`plan_measure_values`] applies the write policy for a new measure: unknown
//! metric labels are skipped silently, malformed values are rejected one by
//! one, and everything else is accepted. Stores persist the accepted part and
//! report the rejected part as a [`PartialWriteFailure`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::core::clock::MeasuredAt;
use crate::core::identifiers::MeasureRef;
use crate::core::identifiers::MetricRef;
use crate::core::identifiers::ProjectRef;
use crate::core::labels::DefaultValue;
use crate::core::labels::Label;
use crate::core::labels::MeasureValue;
use crate::core::labels::MetricLabel;
use crate::core::labels::ValidationError;

// ============================================================================
// SECTION: Catalog Records
// ============================================================================

/// Stored project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    /// Project reference.
    pub project_ref: ProjectRef,
    /// Unique project label.
    pub label: Label,
}

/// Stored metric with its default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRecord {
    /// Metric reference.
    pub metric_ref: MetricRef,
    /// Owning project.
    pub project_ref: ProjectRef,
    /// Label, unique within the project.
    pub label: MetricLabel,
    /// Value used when a measure lacks an explicit value.
    pub default_value: DefaultValue,
}

/// Stored measure (one observation event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasureRecord {
    /// Measure reference.
    pub measure_ref: MeasureRef,
    /// Owning project.
    pub project_ref: ProjectRef,
    /// Recording time.
    pub measured_at: MeasuredAt,
}

// ============================================================================
// SECTION: Write Outcomes
// ============================================================================

/// Result of an idempotent project create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAdded {
    /// Reference of the new or existing project.
    pub project_ref: ProjectRef,
    /// False when the label already existed.
    pub created: bool,
}

/// Result of an idempotent metric create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricAdded {
    /// Reference of the new or existing metric.
    pub metric_ref: MetricRef,
    /// False when the label already existed in the project.
    pub created: bool,
}

/// One supplied value that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedValue {
    /// Metric label the value was supplied for.
    pub metric: String,
    /// Validation failure.
    pub reason: ValidationError,
}

/// Some values of a measure were not saved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} value(s) of measure {measure_ref} were not saved", rejected.len())]
pub struct PartialWriteFailure {
    /// Measure that was created regardless.
    pub measure_ref: MeasureRef,
    /// Entries that failed validation.
    pub rejected: Vec<RejectedValue>,
}

/// Outcome of recording a measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureWrite {
    /// Reference of the created measure.
    pub measure_ref: MeasureRef,
    /// Number of values persisted.
    pub stored: usize,
    /// Labels ignored because the project has no such metric.
    pub skipped: Vec<String>,
    /// Present when at least one value was rejected.
    pub partial_failure: Option<PartialWriteFailure>,
}

impl MeasureWrite {
    /// Builds the outcome for a measure from its value plan.
    #[must_use]
    pub fn from_plan(measure_ref: MeasureRef, plan: MeasurePlan) -> Self {
        let partial_failure = if plan.rejected.is_empty() {
            None
        } else {
            Some(PartialWriteFailure {
                measure_ref,
                rejected: plan.rejected,
            })
        };
        Self {
            measure_ref,
            stored: plan.accepted.len(),
            skipped: plan.skipped,
            partial_failure,
        }
    }
}

// ============================================================================
// SECTION: Measure Limits
// ============================================================================

/// Row selection for a projection read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureLimit {
    /// Every measure of the project.
    #[default]
    All,
    /// Only the `n` most recent measures (largest references).
    Last(u64),
}

impl MeasureLimit {
    /// Maps the client `last` count: zero selects every measure.
    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        if count == 0 { Self::All } else { Self::Last(count) }
    }

    /// Parses the client `last` parameter; zero and negative counts select
    /// every measure.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLimit`] unless the text is an integer.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if let Ok(count) = trimmed.parse::<u64>() {
            return Ok(Self::from_count(count));
        }
        match trimmed.parse::<i64>() {
            Ok(count) if count < 0 => Ok(Self::All),
            _ => Err(ValidationError::InvalidLimit(raw.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Value Planning
// ============================================================================

/// Per-entry classification of the values supplied with a measure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurePlan {
    /// Values to persist, keyed by metric.
    pub accepted: Vec<(MetricRef, MeasureValue)>,
    /// Labels with no matching metric in the project.
    pub skipped: Vec<String>,
    /// Entries that failed value validation.
    pub rejected: Vec<RejectedValue>,
}

/// Classifies supplied values against the project's metric registry.
///
/// `metrics` maps metric labels of the project to their references. The input
/// is a map, so a metric can receive at most one value per measure.
#[must_use]
pub fn plan_measure_values(
    metrics: &BTreeMap<String, MetricRef>,
    values: &BTreeMap<String, String>,
) -> MeasurePlan {
    let mut plan = MeasurePlan::default();
    for (label, raw) in values {
        let Some(metric_ref) = metrics.get(label) else {
            plan.skipped.push(label.clone());
            continue;
        };
        match MeasureValue::parse(label, raw) {
            Ok(value) => plan.accepted.push((*metric_ref, value)),
            Err(reason) => plan.rejected.push(RejectedValue {
                metric: label.clone(),
                reason,
            }),
        }
    }
    plan
}
