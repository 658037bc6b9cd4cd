// crates/run-recorder-config/src/lib.rs
// ============================================================================
// Module: Run Recorder Config Library
// Description: Public API surface for recorder configuration.
// Purpose: Load and validate `run-recorder.toml`.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Configuration is read from `run-recorder.toml`, resolved from an explicit
//! path, the `RUN_RECORDER_CONFIG` environment variable, or the working
//! directory, in that order. Invalid input fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::DEFAULT_STORE_PATH;
pub use config::OutputConfig;
pub use config::RunRecorderConfig;
pub use config::StoreConfig;
pub use config::StoreType;
