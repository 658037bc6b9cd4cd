// crates/run-recorder-config/src/config.rs
// ============================================================================
// Module: Run Recorder Configuration
// Description: Configuration model, path resolution, and validation.
// Purpose: Turn `run-recorder.toml` into a validated runtime configuration.
// Dependencies: run-recorder-core, run-recorder-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! [`RunRecorderConfig::load`] resolves the config path, enforces path and
//! size limits, parses TOML, and validates cross-field rules. A missing file
//! at the default location yields built-in defaults; a missing file named by
//! the caller or the environment is an error.
//!
//! Sections:
//! - `[store]`: backend selection and `SQLite` tuning.
//! - `[audit]`: audit sink selection, disabled unless configured.
//! - `[output]`: delimited-text defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use run_recorder_core::Separator;
use run_recorder_store_sqlite::SqliteStoreConfig;
use run_recorder_store_sqlite::SqliteStoreMode;
use run_recorder_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "RUN_RECORDER_CONFIG";
/// Config file name looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "run-recorder.toml";
/// Database file used when no store path is configured.
pub const DEFAULT_STORE_PATH: &str = "runrecorder.db";
/// Maximum config file size in bytes.
const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;
/// Maximum total config path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Default `SQLite` busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Upper bound for the `SQLite` busy timeout (ms).
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file is not valid TOML for the model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config values violate a validation rule.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Model
// ============================================================================

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Durable `SQLite` file.
    #[default]
    Sqlite,
    /// Process-local store, discarded on exit.
    Memory,
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// Database file for the `SQLite` backend.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: default_store_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store settings of this section.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Audit disabled.
    #[default]
    None,
}

/// `[audit]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Separator used by `csv` when the request supplies none.
    #[serde(default)]
    pub default_separator: Separator,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunRecorderConfig {
    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Returns the default store path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl RunRecorderConfig {
    /// Loads configuration from `path`, the environment, or the default file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is unsafe, the file cannot be
    /// read, parsing fails, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_config_path(path)?;
        validate_config_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let text = read_config_text(&resolved)?;
        Self::from_toml(&text)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for rule violations.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.store_type == StoreType::Sqlite && self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }
        if self.store.busy_timeout_ms == 0 || self.store.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms out of range: {} (max {MAX_BUSY_TIMEOUT_MS})",
                self.store.busy_timeout_ms
            )));
        }
        match (self.audit.sink, &self.audit.path) {
            (AuditSinkKind::File, None) => {
                return Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()));
            }
            (AuditSinkKind::File, Some(path)) if path.as_os_str().is_empty() => {
                return Err(ConfigError::Invalid("audit.path must not be empty".to_string()));
            }
            (AuditSinkKind::Stderr | AuditSinkKind::None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "audit.path is only valid with the file sink".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Resolves the config path and reports whether it was requested explicitly.
fn resolve_config_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(raw) => {
            let value = raw
                .into_string()
                .map_err(|_| ConfigError::Invalid(format!("{CONFIG_ENV_VAR} must be valid UTF-8")))?;
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{CONFIG_ENV_VAR} must not be empty")));
            }
            Ok((PathBuf::from(value), true))
        }
        None => Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false)),
    }
}

/// Enforces config path length limits.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Reads the config file with size and encoding limits.
fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    let file = fs::File::open(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    let metadata = file.metadata().map_err(|err| ConfigError::Io(err.to_string()))?;
    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let mut bytes = Vec::new();
    file.take(MAX_CONFIG_FILE_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigError::Io(err.to_string()))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    String::from_utf8(bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))
}
