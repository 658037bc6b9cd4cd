// crates/run-recorder-core/src/lib.rs
// ============================================================================
// Module: Run Recorder Core Library
// Description: Public API surface for the Run Recorder core.
// Purpose: Expose the measurement model, projection engine, and store interfaces.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Run Recorder core stores experiment measurements sparsely (only the values
//! a client actually supplied) and rebuilds dense, gap-filled tables on read by
//! substituting per-metric defaults. It is backend-agnostic: durable backends
//! implement [`MeasureStore`], and the in-memory store in [`runtime`] serves as
//! the reference projection for tests and local use.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::MeasureStore;
pub use interfaces::StoreError;
pub use runtime::InMemoryMeasureStore;
