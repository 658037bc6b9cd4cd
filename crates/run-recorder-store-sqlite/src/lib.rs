// crates/run-recorder-store-sqlite/src/lib.rs
// ============================================================================
// Module: Run Recorder SQLite Store
// Description: SQLite-backed MeasureStore with versioned schema upgrades.
// Purpose: Persist projects, metrics, measures and values durably.
// Dependencies: run-recorder-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! Durable [`run_recorder_core::MeasureStore`] on `SQLite`. The table layout
//! keeps the `_Project`/`_Metric`/`_Measure`/`_Value` tables of the `01.00.00`
//! layout, and stores in that layout are upgraded in place on open.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteMeasureStore;
pub use store::SqliteOpenReport;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::projection_view_name;
