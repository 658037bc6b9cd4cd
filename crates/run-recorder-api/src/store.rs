// crates/run-recorder-api/src/store.rs
// ============================================================================
// Module: Store Selection
// Description: Opens the configured measure store backend.
// Purpose: Turn the `[store]` config section into a shared store handle.
// Dependencies: run-recorder-config, run-recorder-core, run-recorder-store-sqlite
// ============================================================================

//! ## Overview
//! [`open_store`] opens either the durable `SQLite` store or the in-memory
//! store and reports what happened at open time as a
//! [`LifecycleAuditEvent`], so callers can record upgrades.

use std::sync::Arc;

use run_recorder_config::StoreConfig;
use run_recorder_config::StoreType;
use run_recorder_core::InMemoryMeasureStore;
use run_recorder_core::MeasureStore;
use run_recorder_core::StoreError;
use run_recorder_store_sqlite::SqliteMeasureStore;

use crate::audit::LifecycleAuditEvent;

/// Shared measure store handle used by the router.
pub type SharedMeasureStore = Arc<dyn MeasureStore + Send + Sync>;

/// Opened store plus its open-time report.
pub struct OpenedStore {
    /// Store handle.
    pub store: SharedMeasureStore,
    /// Store-opened audit event.
    pub lifecycle: LifecycleAuditEvent,
}

/// Opens the backend selected by `config`.
///
/// # Errors
///
/// Returns [`StoreError`] when the `SQLite` store cannot be opened, is newer
/// than the running code, or cannot be upgraded.
pub fn open_store(config: &StoreConfig) -> Result<OpenedStore, StoreError> {
    match config.store_type {
        StoreType::Memory => {
            let store = InMemoryMeasureStore::new();
            let lifecycle =
                LifecycleAuditEvent::new("memory", store.version().to_string(), true, None);
            Ok(OpenedStore {
                store: Arc::new(store),
                lifecycle,
            })
        }
        StoreType::Sqlite => {
            let store = SqliteMeasureStore::open(&config.sqlite_config())?;
            let report = store.open_report();
            let lifecycle = LifecycleAuditEvent::new(
                "sqlite",
                report.version.to_string(),
                report.created,
                report.migrated_from.map(|version| version.to_string()),
            );
            Ok(OpenedStore {
                store: Arc::new(store),
                lifecycle,
            })
        }
    }
}
