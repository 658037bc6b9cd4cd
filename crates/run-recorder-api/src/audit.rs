// crates/run-recorder-api/src/audit.rs
// ============================================================================
// Module: Run Recorder Audit Logging
// Description: Structured audit events for action handling and store lifecycle.
// Purpose: Emit JSON-lines audit logs without recording measurement payloads.
// Dependencies: run-recorder-config, serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks. Events are serialized
//! as one JSON object per line. Action events record the action name, project
//! label, outcome, and error kind; submitted metric values never appear.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use run_recorder_config::AuditConfig;
use run_recorder_config::AuditSinkKind;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Action outcome classification.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Action completed.
    Ok,
    /// Measure recorded but some values were rejected.
    Partial,
    /// Action failed.
    Error,
}

/// Audit event for one handled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Raw action name when supplied.
    pub action: Option<String>,
    /// Project label when supplied.
    pub project: Option<String>,
    /// Request outcome.
    pub outcome: ActionOutcome,
    /// Stable error kind when the request failed.
    pub error_kind: Option<&'static str>,
    /// Measure created by `add_measure`.
    pub measure_ref: Option<i64>,
}

impl ActionAuditEvent {
    /// Creates a new action event with a consistent timestamp.
    #[must_use]
    pub fn new(action: Option<&str>, project: Option<&str>, outcome: ActionOutcome) -> Self {
        Self {
            event: "action",
            timestamp_ms: now_ms(),
            action: action.map(str::to_string),
            project: project.map(str::to_string),
            outcome,
            error_kind: None,
            measure_ref: None,
        }
    }
}

/// Audit event for opening a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Backend label (`sqlite` or `memory`).
    pub backend: &'static str,
    /// Store layout version after opening.
    pub version: String,
    /// True when the store was created by this open.
    pub created: bool,
    /// Version the store was upgraded from, if any.
    pub migrated_from: Option<String>,
}

impl LifecycleAuditEvent {
    /// Creates a new store-opened event with a consistent timestamp.
    #[must_use]
    pub fn new(
        backend: &'static str,
        version: String,
        created: bool,
        migrated_from: Option<String>,
    ) -> Self {
        Self {
            event: "store_lifecycle",
            timestamp_ms: now_ms(),
            backend,
            version,
            created,
            migrated_from,
        }
    }
}

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for router events.
pub trait AuditSink: Send + Sync {
    /// Record an action event.
    fn record(&self, event: &ActionAuditEvent);

    /// Record a store lifecycle event.
    fn record_lifecycle(&self, _event: &LifecycleAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &ActionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Writes one serialized event.
    fn append<T: Serialize>(&self, event: &T) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &ActionAuditEvent) {
        self.append(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &ActionAuditEvent) {}
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the audit sink selected by the `[audit]` section.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its log, or when the file
/// sink has no path.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "audit.path is required for the file sink")
            })?;
            Ok(Arc::new(FileAuditSink::new(path)?))
        }
    }
}
