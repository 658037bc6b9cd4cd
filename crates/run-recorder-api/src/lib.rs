// crates/run-recorder-api/src/lib.rs
// ============================================================================
// Module: Run Recorder API
// Description: Action router over the Run Recorder measure stores.
// Purpose: Map flat request maps onto store operations and JSON payloads.
// Dependencies: run-recorder-core, run-recorder-store-sqlite, serde_json, url
// ============================================================================

//! ## Overview
//! The action router is the request/response contract of Run Recorder. A
//! request is a flat string map (usually decoded from a form-encoded body);
//! the router resolves the `action` entry, runs the matching store operation,
//! and answers with a `{"ret":"0", ...}` or `{"ret":"1", "errMsg":...}` JSON
//! payload, or raw delimited text for `csv`. Transports (the CLI today) stay
//! thin wrappers around [`ActionRouter::handle`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actions;
pub mod audit;
pub mod request;
pub mod response;
pub mod router;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actions::ActionName;
pub use audit::ActionAuditEvent;
pub use audit::ActionOutcome;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::LifecycleAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::audit_sink_from_config;
pub use request::ActionRequest;
pub use response::ActionResponse;
pub use router::ActionError;
pub use router::ActionRouter;
pub use store::OpenedStore;
pub use store::SharedMeasureStore;
pub use store::open_store;
