// crates/run-recorder-core/src/core/mod.rs
// ============================================================================
// Module: Run Recorder Core Types
// Description: Identifiers, validated labels, records, and projections.
// Purpose: Group the backend-independent data model of the recorder.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types shared by every store backend and by the action router.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clock;
pub mod identifiers;
pub mod labels;
pub mod model;
pub mod projection;
pub mod serialization;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::MeasuredAt;
pub use identifiers::MeasureRef;
pub use identifiers::MetricRef;
pub use identifiers::ProjectRef;
pub use labels::DefaultValue;
pub use labels::Label;
pub use labels::MeasureValue;
pub use labels::MetricLabel;
pub use labels::RESERVED_METRIC_LABELS;
pub use labels::ValidationError;
pub use labels::is_identifier;
pub use model::MeasureLimit;
pub use model::MeasurePlan;
pub use model::MeasureRecord;
pub use model::MeasureWrite;
pub use model::MetricAdded;
pub use model::MetricRecord;
pub use model::PartialWriteFailure;
pub use model::ProjectAdded;
pub use model::ProjectRecord;
pub use model::RejectedValue;
pub use model::plan_measure_values;
pub use projection::DenseProjection;
pub use projection::ProjectionRow;
pub use projection::project_dense;
pub use serialization::DEFAULT_SEPARATOR;
pub use serialization::ProjectionRecords;
pub use serialization::REF_COLUMN_LABEL;
pub use serialization::Separator;
pub use version::CURRENT_STORE_VERSION;
pub use version::LEGACY_STORE_VERSION;
pub use version::StoreVersion;
