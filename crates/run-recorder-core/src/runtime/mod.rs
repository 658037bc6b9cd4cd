// crates/run-recorder-core/src/runtime/mod.rs
// ============================================================================
// Module: Run Recorder Runtime
// Description: In-process store implementations.
// Purpose: Provide the reference store used by tests and ephemeral sessions.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime helpers that need no external storage.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::InMemoryMeasureStore;
