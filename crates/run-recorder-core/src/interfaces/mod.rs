// crates/run-recorder-core/src/interfaces/mod.rs
// ============================================================================
// Module: Run Recorder Interfaces
// Description: Backend-agnostic measurement store interface.
// Purpose: Define the contract every store backend implements.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! [`MeasureStore`] is the single seam between the action router and storage.
//! Methods take `&self`; implementations serialize access internally so a
//! store can be shared as `Arc<dyn MeasureStore + Send + Sync>`.
//!
//! Every mutating operation is atomic: it either applies completely or leaves
//! the store unchanged. The one sanctioned partial outcome is a measure whose
//! rejected values are reported through [`MeasureWrite::partial_failure`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::DenseProjection;
use crate::core::DefaultValue;
use crate::core::Label;
use crate::core::MeasureLimit;
use crate::core::MeasureRef;
use crate::core::MeasureWrite;
use crate::core::MetricAdded;
use crate::core::MetricLabel;
use crate::core::MetricRecord;
use crate::core::ProjectAdded;
use crate::core::ProjectRef;
use crate::core::StoreVersion;
use crate::core::ValidationError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Measurement store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; see [`StoreError::kind`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Client input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Backend reported an error.
    #[error("measure store error: {0}")]
    Storage(String),
    /// Store was written by a newer version of the recorder.
    #[error("store version {store} is newer than the running version {running}")]
    IncompatibleStoreVersion {
        /// Version recorded in the store.
        store: String,
        /// Version of the running code.
        running: String,
    },
    /// Store is older and has no migration path.
    #[error("measure store version mismatch: {0}")]
    VersionMismatch(String),
}

impl StoreError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::IncompatibleStoreVersion { .. } => "incompatible_store_version",
            Self::VersionMismatch(_) => "version_mismatch",
        }
    }
}

// ============================================================================
// SECTION: Measure Store
// ============================================================================

/// Sparse measurement store with dense projection reads.
pub trait MeasureStore {
    /// Returns the version of the opened store layout.
    fn version(&self) -> StoreVersion;

    /// Creates a project, or returns the existing one with the same label.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn add_project(&self, label: &Label) -> Result<ProjectAdded, StoreError>;

    /// Resolves a project label to its reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no project carries the label.
    fn resolve_project(&self, label: &Label) -> Result<ProjectRef, StoreError>;

    /// Lists every project ordered by reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_projects(&self) -> Result<BTreeMap<ProjectRef, Label>, StoreError>;

    /// Registers a metric, or returns the existing one with the same label.
    ///
    /// An existing metric keeps its original default.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown project.
    fn add_metric(
        &self,
        project: ProjectRef,
        label: &MetricLabel,
        default_value: &DefaultValue,
    ) -> Result<MetricAdded, StoreError>;

    /// Lists the metrics of a project ordered by label.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown project.
    fn list_metrics(&self, project: ProjectRef) -> Result<Vec<MetricRecord>, StoreError>;

    /// Records a measure with the supplied `label -> raw value` pairs.
    ///
    /// The measure is always created; unknown labels are skipped and invalid
    /// values are reported in [`MeasureWrite::partial_failure`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown project.
    fn add_measure(
        &self,
        project: ProjectRef,
        values: &BTreeMap<String, String>,
    ) -> Result<MeasureWrite, StoreError>;

    /// Deletes a measure and all of its values.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the measure does not exist.
    fn delete_measure(&self, measure: MeasureRef) -> Result<(), StoreError>;

    /// Builds the dense projection of a project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown project.
    fn project(&self, project: ProjectRef, limit: MeasureLimit) -> Result<DenseProjection, StoreError>;

    /// Removes a project with all of its metrics, measures and values.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown project.
    fn flush_project(&self, project: ProjectRef) -> Result<(), StoreError>;
}
