// crates/run-recorder-core/src/runtime/store.rs
// ============================================================================
// Module: Run Recorder In-Memory Store
// Description: Mutex-guarded measurement store with cached projections.
// Purpose: Serve as the reference backend for tests and non-durable sessions.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryMeasureStore`] keeps the sparse model in ordered maps behind one
//! mutex. Projections are computed on read by [`project_dense`] and cached per
//! project; any metric or measure change marks the cache entry dirty.
//!
//! References are allocated from monotonic counters and are never reused,
//! even after a delete or flush.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::CURRENT_STORE_VERSION;
use crate::core::DefaultValue;
use crate::core::DenseProjection;
use crate::core::Label;
use crate::core::MeasureLimit;
use crate::core::MeasureRecord;
use crate::core::MeasureRef;
use crate::core::MeasureValue;
use crate::core::MeasureWrite;
use crate::core::MeasuredAt;
use crate::core::MetricAdded;
use crate::core::MetricLabel;
use crate::core::MetricRecord;
use crate::core::MetricRef;
use crate::core::ProjectAdded;
use crate::core::ProjectRef;
use crate::core::StoreVersion;
use crate::core::plan_measure_values;
use crate::core::project_dense;
use crate::interfaces::MeasureStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Cache slot for one project's full projection.
#[derive(Debug, Clone)]
enum CachedProjection {
    /// Metrics or measures changed since the last read.
    Dirty,
    /// Projection of every measure, valid until the next change.
    Fresh(DenseProjection),
}

/// Mutable state of the in-memory store.
#[derive(Debug, Default)]
struct MemoryState {
    /// Last allocated project reference.
    last_project_ref: i64,
    /// Last allocated metric reference.
    last_metric_ref: i64,
    /// Last allocated measure reference.
    last_measure_ref: i64,
    /// Projects by reference.
    projects: BTreeMap<ProjectRef, Label>,
    /// Metrics by reference.
    metrics: BTreeMap<MetricRef, MetricRecord>,
    /// Measures by reference.
    measures: BTreeMap<MeasureRef, MeasureRecord>,
    /// Sparse facts keyed by `(measure, metric)`.
    values: BTreeMap<(MeasureRef, MetricRef), MeasureValue>,
    /// Projection cache keyed by project.
    projections: BTreeMap<ProjectRef, CachedProjection>,
}

impl MemoryState {
    /// Fails with `NotFound` unless the project exists.
    fn require_project(&self, project: ProjectRef) -> Result<(), StoreError> {
        if self.projects.contains_key(&project) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("project {project}")))
        }
    }

    /// Returns the metrics of a project in label order.
    fn project_metrics(&self, project: ProjectRef) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .values()
            .filter(|metric| metric.project_ref == project)
            .cloned()
            .collect();
        metrics.sort_by(|left, right| left.label.cmp(&right.label));
        metrics
    }

    /// Marks the cached projection of a project as stale.
    fn invalidate(&mut self, project: ProjectRef) {
        self.projections.insert(project, CachedProjection::Dirty);
    }

    /// Returns the full projection of a project, rebuilding it when dirty.
    fn full_projection(&mut self, project: ProjectRef) -> DenseProjection {
        if let Some(CachedProjection::Fresh(projection)) = self.projections.get(&project) {
            return projection.clone();
        }
        let metrics = self.project_metrics(project);
        let measures: Vec<MeasureRecord> = self
            .measures
            .values()
            .filter(|measure| measure.project_ref == project)
            .cloned()
            .collect();
        let projection = project_dense(&metrics, &measures, &self.values, MeasureLimit::All);
        self.projections.insert(project, CachedProjection::Fresh(projection.clone()));
        projection
    }
}

/// In-memory measurement store.
///
/// # Invariants
/// - Clones share the same state.
/// - At most one value exists per `(measure, metric)` pair.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMeasureStore {
    /// Shared store state.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryMeasureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the shared state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Storage("in-memory store mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Store Implementation
// ============================================================================

impl MeasureStore for InMemoryMeasureStore {
    fn version(&self) -> StoreVersion {
        CURRENT_STORE_VERSION
    }

    fn add_project(&self, label: &Label) -> Result<ProjectAdded, StoreError> {
        let mut state = self.lock()?;
        if let Some((project_ref, _)) = state.projects.iter().find(|(_, existing)| *existing == label) {
            return Ok(ProjectAdded {
                project_ref: *project_ref,
                created: false,
            });
        }
        state.last_project_ref += 1;
        let project_ref = ProjectRef::new(state.last_project_ref);
        state.projects.insert(project_ref, label.clone());
        state.invalidate(project_ref);
        Ok(ProjectAdded {
            project_ref,
            created: true,
        })
    }

    fn resolve_project(&self, label: &Label) -> Result<ProjectRef, StoreError> {
        let state = self.lock()?;
        state
            .projects
            .iter()
            .find(|(_, existing)| *existing == label)
            .map(|(project_ref, _)| *project_ref)
            .ok_or_else(|| StoreError::NotFound(format!("project {label}")))
    }

    fn list_projects(&self) -> Result<BTreeMap<ProjectRef, Label>, StoreError> {
        Ok(self.lock()?.projects.clone())
    }

    fn add_metric(
        &self,
        project: ProjectRef,
        label: &MetricLabel,
        default_value: &DefaultValue,
    ) -> Result<MetricAdded, StoreError> {
        let mut state = self.lock()?;
        state.require_project(project)?;
        if let Some(existing) = state
            .metrics
            .values()
            .find(|metric| metric.project_ref == project && metric.label == *label)
        {
            return Ok(MetricAdded {
                metric_ref: existing.metric_ref,
                created: false,
            });
        }
        state.last_metric_ref += 1;
        let metric_ref = MetricRef::new(state.last_metric_ref);
        state.metrics.insert(
            metric_ref,
            MetricRecord {
                metric_ref,
                project_ref: project,
                label: label.clone(),
                default_value: default_value.clone(),
            },
        );
        state.invalidate(project);
        Ok(MetricAdded {
            metric_ref,
            created: true,
        })
    }

    fn list_metrics(&self, project: ProjectRef) -> Result<Vec<MetricRecord>, StoreError> {
        let state = self.lock()?;
        state.require_project(project)?;
        Ok(state.project_metrics(project))
    }

    fn add_measure(
        &self,
        project: ProjectRef,
        values: &BTreeMap<String, String>,
    ) -> Result<MeasureWrite, StoreError> {
        let measured_at = MeasuredAt::now().map_err(|err| StoreError::Storage(err.to_string()))?;
        let mut state = self.lock()?;
        state.require_project(project)?;
        let known: BTreeMap<String, MetricRef> = state
            .metrics
            .values()
            .filter(|metric| metric.project_ref == project)
            .map(|metric| (metric.label.as_str().to_string(), metric.metric_ref))
            .collect();
        let plan = plan_measure_values(&known, values);

        state.last_measure_ref += 1;
        let measure_ref = MeasureRef::new(state.last_measure_ref);
        state.measures.insert(
            measure_ref,
            MeasureRecord {
                measure_ref,
                project_ref: project,
                measured_at,
            },
        );
        for (metric_ref, value) in &plan.accepted {
            state.values.insert((measure_ref, *metric_ref), value.clone());
        }
        state.invalidate(project);
        Ok(MeasureWrite::from_plan(measure_ref, plan))
    }

    fn delete_measure(&self, measure: MeasureRef) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let Some(record) = state.measures.remove(&measure) else {
            return Err(StoreError::NotFound(format!("measure {measure}")));
        };
        state.values.retain(|(measure_ref, _), _| *measure_ref != measure);
        state.invalidate(record.project_ref);
        Ok(())
    }

    fn project(&self, project: ProjectRef, limit: MeasureLimit) -> Result<DenseProjection, StoreError> {
        let mut state = self.lock()?;
        state.require_project(project)?;
        Ok(state.full_projection(project).limited(limit))
    }

    fn flush_project(&self, project: ProjectRef) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.require_project(project)?;
        let measures: Vec<MeasureRef> = state
            .measures
            .values()
            .filter(|measure| measure.project_ref == project)
            .map(|measure| measure.measure_ref)
            .collect();
        for measure_ref in &measures {
            state.measures.remove(measure_ref);
        }
        state.values.retain(|(measure_ref, _), _| !measures.contains(measure_ref));
        state.metrics.retain(|_, metric| metric.project_ref != project);
        state.projects.remove(&project);
        state.projections.remove(&project);
        Ok(())
    }
}
