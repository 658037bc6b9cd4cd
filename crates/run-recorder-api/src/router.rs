// crates/run-recorder-api/src/router.rs
// ============================================================================
// Module: Action Router
// Description: Dispatches action requests to measure store operations.
// Purpose: Implement the `ret`-coded request/response contract.
// Dependencies: run-recorder-core, run-recorder-config, serde_json
// ============================================================================

//! ## Overview
//! The router dispatches each request to one store operation and converts the
//! outcome to a payload. Handlers are thin wrappers over [`MeasureStore`].
//! Security posture: request fields are untrusted; every label, default,
//! value, reference, limit, and separator is validated before it reaches the
//! store.
//!
//! ## Invariants
//! - A request without an action succeeds with `{"ret":"0"}` and touches
//!   nothing.
//! - Unknown actions and missing inputs fail with `Invalid action`.
//! - A partially saved measure fails but still reports `refMeasure`.
//! - Every handled request emits exactly one audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use run_recorder_config::RunRecorderConfig;
use run_recorder_core::DefaultValue;
use run_recorder_core::Label;
use run_recorder_core::MeasureLimit;
use run_recorder_core::MeasureRef;
use run_recorder_core::MeasureStore;
use run_recorder_core::MetricLabel;
use run_recorder_core::PartialWriteFailure;
use run_recorder_core::ProjectRef;
use run_recorder_core::Separator;
use run_recorder_core::StoreError;
use run_recorder_core::ValidationError;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::actions::ActionName;
use crate::audit::ActionAuditEvent;
use crate::audit::ActionOutcome;
use crate::audit::AuditSink;
use crate::audit::audit_sink_from_config;
use crate::request::ActionRequest;
use crate::request::MAX_REQUEST_BYTES;
use crate::request::PROJECT_FIELD;
use crate::response::ActionResponse;
use crate::store::SharedMeasureStore;
use crate::store::open_store;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Request field carrying a new label.
const LABEL_FIELD: &str = "label";
/// Request field carrying a metric default.
const DEFAULT_FIELD: &str = "default";
/// Request field carrying a measure reference.
const MEASURE_FIELD: &str = "measure";
/// Request field carrying the `last` row count.
const LAST_FIELD: &str = "last";
/// Request field carrying the delimited-text separator.
const SEPARATOR_FIELD: &str = "sep";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Action routing errors.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Action name not recognized.
    #[error("Invalid action")]
    InvalidAction,
    /// Action recognized but a required input is absent.
    #[error("Invalid action: missing input {0}")]
    MissingInput(&'static str),
    /// Form-encoded body exceeds the size limit.
    #[error("request exceeds {MAX_REQUEST_BYTES} bytes")]
    RequestTooLarge,
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Measure recorded with rejected values.
    #[error(transparent)]
    PartialWrite(#[from] PartialWriteFailure),
    /// Router could not be built.
    #[error("setup error: {0}")]
    Setup(String),
}

impl ActionError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAction | Self::MissingInput(_) => "invalid_action",
            Self::RequestTooLarge => "request_too_large",
            Self::Validation(_) => "validation",
            Self::Store(error) => error.kind(),
            Self::PartialWrite(_) => "partial_write",
            Self::Setup(_) => "setup",
        }
    }

    /// Renders the `errMsg` text.
    fn message(&self) -> String {
        match self {
            Self::PartialWrite(failure) => {
                let metrics: Vec<&str> =
                    failure.rejected.iter().map(|rejected| rejected.metric.as_str()).collect();
                format!("{failure}: {}", metrics.join(", "))
            }
            other => other.to_string(),
        }
    }

    /// Extra failure fields (`refMeasure` for partial writes).
    fn failure_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Self::PartialWrite(failure) = self {
            fields.insert("refMeasure".to_string(), Value::from(failure.measure_ref.to_string()));
        }
        fields
    }
}

// ============================================================================
// SECTION: Action Router
// ============================================================================

/// Successful handler result.
struct Handled {
    /// Response payload.
    response: ActionResponse,
    /// Measure created by the handler, for audit.
    measure_ref: Option<MeasureRef>,
}

impl Handled {
    /// Wraps a `{"ret":"0", ...}` payload.
    fn json(fields: Map<String, Value>) -> Self {
        Self {
            response: ActionResponse::success(fields),
            measure_ref: None,
        }
    }
}

/// Action router over a shared measure store.
#[derive(Clone)]
pub struct ActionRouter {
    /// Store every action operates on.
    store: SharedMeasureStore,
    /// Audit sink for handled requests.
    audit: Arc<dyn AuditSink>,
    /// Separator used by `csv` when the request supplies none.
    default_separator: Separator,
}

impl ActionRouter {
    /// Creates a router over an opened store.
    #[must_use]
    pub fn new(
        store: SharedMeasureStore,
        audit: Arc<dyn AuditSink>,
        default_separator: Separator,
    ) -> Self {
        Self {
            store,
            audit,
            default_separator,
        }
    }

    /// Opens the configured store and audit sink and builds a router.
    ///
    /// Records the store lifecycle event on the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Store`] when the store cannot be opened and
    /// [`ActionError::Setup`] when the audit sink cannot be created.
    pub fn from_config(config: &RunRecorderConfig) -> Result<Self, ActionError> {
        let audit = audit_sink_from_config(&config.audit)
            .map_err(|err| ActionError::Setup(format!("audit sink: {err}")))?;
        let opened = open_store(&config.store)?;
        audit.record_lifecycle(&opened.lifecycle);
        Ok(Self::new(opened.store, audit, config.output.default_separator.clone()))
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &SharedMeasureStore {
        &self.store
    }

    /// Decodes and handles a form-encoded request body.
    #[must_use]
    pub fn handle_form(&self, body: &str) -> ActionResponse {
        match ActionRequest::from_form(body) {
            Some(request) => self.handle(&request),
            None => {
                let error = ActionError::RequestTooLarge;
                let mut event = ActionAuditEvent::new(None, None, ActionOutcome::Error);
                event.error_kind = Some(error.kind());
                self.audit.record(&event);
                ActionResponse::failure(&error.message(), Map::new())
            }
        }
    }

    /// Handles one request and returns its payload.
    #[must_use]
    pub fn handle(&self, request: &ActionRequest) -> ActionResponse {
        let Some(raw_action) = request.action() else {
            self.audit.record(&ActionAuditEvent::new(None, None, ActionOutcome::Ok));
            return ActionResponse::success(Map::new());
        };
        let project = request.get(PROJECT_FIELD);
        let result = ActionName::parse(raw_action)
            .ok_or(ActionError::InvalidAction)
            .and_then(|action| self.dispatch(action, request));
        match result {
            Ok(handled) => {
                let mut event = ActionAuditEvent::new(Some(raw_action), project, ActionOutcome::Ok);
                event.measure_ref = handled.measure_ref.map(MeasureRef::get);
                self.audit.record(&event);
                handled.response
            }
            Err(error) => {
                let outcome = match error {
                    ActionError::PartialWrite(_) => ActionOutcome::Partial,
                    _ => ActionOutcome::Error,
                };
                let mut event = ActionAuditEvent::new(Some(raw_action), project, outcome);
                event.error_kind = Some(error.kind());
                if let ActionError::PartialWrite(failure) = &error {
                    event.measure_ref = Some(failure.measure_ref.get());
                }
                self.audit.record(&event);
                ActionResponse::failure(&error.message(), error.failure_fields())
            }
        }
    }

    /// Routes a parsed action to its handler.
    fn dispatch(&self, action: ActionName, request: &ActionRequest) -> Result<Handled, ActionError> {
        match action {
            ActionName::Version => Ok(self.handle_version()),
            ActionName::Help => Ok(Self::handle_help()),
            ActionName::AddProject => self.handle_add_project(request),
            ActionName::Projects => self.handle_projects(),
            ActionName::AddMetric => self.handle_add_metric(request),
            ActionName::Metrics => self.handle_metrics(request),
            ActionName::AddMeasure => self.handle_add_measure(request),
            ActionName::DeleteMeasure => self.handle_delete_measure(request),
            ActionName::Measures => self.handle_measures(request),
            ActionName::Csv => self.handle_csv(request),
            ActionName::Flush => self.handle_flush(request),
        }
    }

    // ------------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------------

    /// Reports the store layout version.
    fn handle_version(&self) -> Handled {
        Handled::json(fields([("version", Value::from(self.store.version().to_string()))]))
    }

    /// Lists the available actions.
    fn handle_help() -> Handled {
        Handled::json(fields([("actions", Value::from(ActionName::help_listing()))]))
    }

    /// Creates a project.
    fn handle_add_project(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let label = Label::parse(required(request, LABEL_FIELD)?)?;
        let added = self.store.add_project(&label)?;
        Ok(Handled::json(fields([("refProject", Value::from(added.project_ref.to_string()))])))
    }

    /// Lists projects as `{ref: label}`.
    fn handle_projects(&self) -> Result<Handled, ActionError> {
        let projects: Map<String, Value> = self
            .store
            .list_projects()?
            .into_iter()
            .map(|(project_ref, label)| (project_ref.to_string(), Value::from(label.as_str())))
            .collect();
        Ok(Handled::json(fields([("projects", Value::Object(projects))])))
    }

    /// Registers a metric.
    fn handle_add_metric(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let project_label = required(request, PROJECT_FIELD)?;
        let label = required(request, LABEL_FIELD)?;
        let default_value = required(request, DEFAULT_FIELD)?;
        let project = self.resolve_project(project_label)?;
        let label = MetricLabel::parse(label)?;
        let default_value = DefaultValue::parse(default_value)?;
        self.store.add_metric(project, &label, &default_value)?;
        Ok(Handled::json(Map::new()))
    }

    /// Lists metrics as `{ref: {label, defaultValue}}`.
    fn handle_metrics(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let project = self.resolve_project(required(request, PROJECT_FIELD)?)?;
        let metrics: Map<String, Value> = self
            .store
            .list_metrics(project)?
            .into_iter()
            .map(|metric| {
                (
                    metric.metric_ref.to_string(),
                    json!({
                        "label": metric.label.as_str(),
                        "defaultValue": metric.default_value.as_str(),
                    }),
                )
            })
            .collect();
        Ok(Handled::json(fields([("metrics", Value::Object(metrics))])))
    }

    /// Records a measure from every non-reserved request field.
    fn handle_add_measure(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let project = self.resolve_project(required(request, PROJECT_FIELD)?)?;
        let write = self.store.add_measure(project, &request.measure_values())?;
        if let Some(failure) = write.partial_failure {
            return Err(ActionError::PartialWrite(failure));
        }
        Ok(Handled {
            response: ActionResponse::success(fields([(
                "refMeasure",
                Value::from(write.measure_ref.to_string()),
            )])),
            measure_ref: Some(write.measure_ref),
        })
    }

    /// Deletes a measure.
    fn handle_delete_measure(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let measure = MeasureRef::parse(required(request, MEASURE_FIELD)?)?;
        self.store.delete_measure(measure)?;
        Ok(Handled::json(Map::new()))
    }

    /// Reads the dense projection as `{labels, values}`.
    fn handle_measures(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let project = self.resolve_project(required(request, PROJECT_FIELD)?)?;
        let limit = request.get(LAST_FIELD).map(MeasureLimit::parse).transpose()?.unwrap_or_default();
        let records = self.store.project(project, limit)?.to_records();
        Ok(Handled::json(fields([
            ("labels", Value::from(records.labels)),
            ("values", Value::from(records.values)),
        ])))
    }

    /// Reads the dense projection as delimited text.
    fn handle_csv(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let project = self.resolve_project(required(request, PROJECT_FIELD)?)?;
        let separator = match request.get(SEPARATOR_FIELD) {
            Some(raw) => Separator::parse(raw)?,
            None => self.default_separator.clone(),
        };
        let projection = self.store.project(project, MeasureLimit::All)?;
        Ok(Handled {
            response: ActionResponse::Text(projection.to_delimited_text(&separator)),
            measure_ref: None,
        })
    }

    /// Removes a project and everything recorded for it.
    fn handle_flush(&self, request: &ActionRequest) -> Result<Handled, ActionError> {
        let project = self.resolve_project(required(request, PROJECT_FIELD)?)?;
        self.store.flush_project(project)?;
        Ok(Handled::json(Map::new()))
    }

    /// Validates and resolves a project label.
    fn resolve_project(&self, raw: &str) -> Result<ProjectRef, ActionError> {
        let label = Label::parse(raw)?;
        Ok(self.store.resolve_project(&label)?)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a required request field.
fn required<'a>(request: &'a ActionRequest, name: &'static str) -> Result<&'a str, ActionError> {
    request.get(name).ok_or(ActionError::MissingInput(name))
}

/// Builds a payload field map.
fn fields<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries.into_iter().map(|(name, value)| (name.to_string(), value)).collect()
}
