// crates/run-recorder-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Measure Store
// Description: Durable MeasureStore backed by SQLite.
// Purpose: Persist sparse measurements and serve dense projections from views.
// Dependencies: run-recorder-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`MeasureStore`] using `SQLite`. The five
//! tables (`_Version`, `_Project`, `_Metric`, `_Measure`, `_Value`) hold the
//! sparse model. Each project owns a view named `_Projection_<projectRef>`
//! that turns the sparse facts into one row per measure with one column per
//! metric, filling gaps with the metric default.
//!
//! Views are rebuilt in the same transaction as every metric insert. Readers
//! compare the view's columns with the metric registry and rebuild a stale
//! view before reading, which covers stores written by older code.
//!
//! Structural SQL is assembled only from integer references; all client text
//! is bound as parameters.
//!
//! Store versions follow a migration chain applied inside one transaction on
//! open. A store written by newer code is refused.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use rusqlite::params_from_iter;
use run_recorder_core::CURRENT_STORE_VERSION;
use run_recorder_core::DefaultValue;
use run_recorder_core::DenseProjection;
use run_recorder_core::LEGACY_STORE_VERSION;
use run_recorder_core::Label;
use run_recorder_core::MeasureLimit;
use run_recorder_core::MeasureRef;
use run_recorder_core::MeasureStore;
use run_recorder_core::MeasureWrite;
use run_recorder_core::MeasuredAt;
use run_recorder_core::MetricAdded;
use run_recorder_core::MetricLabel;
use run_recorder_core::MetricRecord;
use run_recorder_core::MetricRef;
use run_recorder_core::ProjectAdded;
use run_recorder_core::ProjectRef;
use run_recorder_core::ProjectionRow;
use run_recorder_core::StoreError;
use run_recorder_core::StoreVersion;
use run_recorder_core::is_identifier;
use run_recorder_core::plan_measure_values;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Name prefix of per-project projection views.
const PROJECTION_VIEW_PREFIX: &str = "_Projection_";
/// Leading view columns preceding the metric columns.
const PROJECTION_FIXED_COLUMNS: [&str; 2] = ["Ref", "DateMeasure"];

/// Version marker table, shared with the legacy layout.
const VERSION_TABLE_SQL: &str = "CREATE TABLE _Version (
    Ref INTEGER PRIMARY KEY,
    Label TEXT NOT NULL
);";

/// Data tables of the current layout.
const DATA_TABLES_SQL: &str = "CREATE TABLE _Project (
    Ref INTEGER PRIMARY KEY AUTOINCREMENT,
    Label TEXT UNIQUE NOT NULL
);
CREATE TABLE _Metric (
    Ref INTEGER PRIMARY KEY AUTOINCREMENT,
    RefProject INTEGER NOT NULL REFERENCES _Project(Ref),
    Label TEXT NOT NULL,
    DefaultValue TEXT NOT NULL
);
CREATE UNIQUE INDEX idx_metric_project_label ON _Metric (RefProject, Label);
CREATE TABLE _Measure (
    Ref INTEGER PRIMARY KEY AUTOINCREMENT,
    RefProject INTEGER NOT NULL REFERENCES _Project(Ref),
    DateMeasure TEXT NOT NULL
);
CREATE INDEX idx_measure_project ON _Measure (RefProject);
CREATE TABLE _Value (
    Ref INTEGER PRIMARY KEY AUTOINCREMENT,
    RefMeasure INTEGER NOT NULL REFERENCES _Measure(Ref),
    RefMetric INTEGER NOT NULL REFERENCES _Metric(Ref),
    Value TEXT NOT NULL
);
CREATE UNIQUE INDEX idx_value_measure_metric ON _Value (RefMeasure, RefMetric);";

/// Moves the legacy data tables aside so the current layout can be created.
const LEGACY_RENAME_SQL: &str = "ALTER TABLE _Project RENAME TO _Legacy_Project;
ALTER TABLE _Metric RENAME TO _Legacy_Metric;
ALTER TABLE _Measure RENAME TO _Legacy_Measure;
ALTER TABLE _Value RENAME TO _Legacy_Value;";

/// Copies legacy rows into the current layout, keeping the first duplicate.
const LEGACY_COPY_SQL: &str = "INSERT INTO _Project (Ref, Label)
    SELECT Ref, Label FROM _Legacy_Project;
INSERT INTO _Metric (Ref, RefProject, Label, DefaultValue)
    SELECT Ref, RefProject, Label, DefaultValue FROM _Legacy_Metric
    WHERE Ref IN (SELECT MIN(Ref) FROM _Legacy_Metric GROUP BY RefProject, Label)
      AND RefProject IN (SELECT Ref FROM _Project);
INSERT INTO _Measure (Ref, RefProject, DateMeasure)
    SELECT Ref, RefProject, CAST(DateMeasure AS TEXT) FROM _Legacy_Measure
    WHERE RefProject IN (SELECT Ref FROM _Project);
INSERT INTO _Value (Ref, RefMeasure, RefMetric, Value)
    SELECT Ref, RefMeasure, RefMetric, CAST(Value AS TEXT) FROM _Legacy_Value
    WHERE Ref IN (SELECT MIN(Ref) FROM _Legacy_Value GROUP BY RefMeasure, RefMetric)
      AND RefMeasure IN (SELECT Ref FROM _Measure)
      AND RefMetric IN (SELECT Ref FROM _Metric);
DROP TABLE _Legacy_Value;
DROP TABLE _Legacy_Measure;
DROP TABLE _Legacy_Metric;
DROP TABLE _Legacy_Project;";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` measure store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
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

impl SqliteStoreConfig {
    /// Builds a config for `path` with default tuning.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding measure values.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Store is older and has no migration path.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store was written by newer code.
    #[error("store version {store} is newer than the running version {running}")]
    IncompatibleVersion {
        /// Version recorded in the store.
        store: StoreVersion,
        /// Version of the running code.
        running: StoreVersion,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => Self::Storage(message),
            SqliteStoreError::Invalid(message) => {
                Self::Storage(format!("invalid stored data: {message}"))
            }
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::IncompatibleVersion {
                store,
                running,
            } => Self::IncompatibleStoreVersion {
                store: store.to_string(),
                running: running.to_string(),
            },
        }
    }
}

/// Maps a rusqlite error into the store error space.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err function pointer.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Outcome of opening a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteOpenReport {
    /// Version of the store after open.
    pub version: StoreVersion,
    /// True when the store file was initialized by this open.
    pub created: bool,
    /// Version the store was upgraded from, if a migration ran.
    pub migrated_from: Option<StoreVersion>,
}

/// `SQLite`-backed measure store.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - Every operation runs in exactly one transaction.
/// - Mutating operations and projection reads take the write lock when the
///   transaction begins.
#[derive(Clone)]
pub struct SqliteMeasureStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Result of the open-time version check.
    report: SqliteOpenReport,
}

impl SqliteMeasureStore {
    /// Opens an `SQLite`-backed measure store, creating or upgrading it.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened, is
    /// newer than the running code, or cannot be upgraded.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        let report = initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            report,
        })
    }

    /// Returns the open-time version report.
    #[must_use]
    pub const fn open_report(&self) -> SqliteOpenReport {
        self.report
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }
}

impl std::fmt::Debug for SqliteMeasureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMeasureStore").field("report", &self.report).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: MeasureStore Implementation
// ============================================================================

impl MeasureStore for SqliteMeasureStore {
    fn version(&self) -> StoreVersion {
        self.report.version
    }

    fn add_project(&self, label: &Label) -> Result<ProjectAdded, StoreError> {
        let mut guard = self.lock()?;
        let tx = begin_write(&mut guard)?;
        let existing = find_project(&tx, label)?;
        let added = match existing {
            Some(project_ref) => ProjectAdded {
                project_ref,
                created: false,
            },
            None => {
                tx.execute("INSERT INTO _Project (Label) VALUES (?1)", params![label.as_str()])
                    .map_err(db_error)?;
                let project_ref = ProjectRef::new(tx.last_insert_rowid());
                rebuild_projection_view(&tx, project_ref, &[])?;
                ProjectAdded {
                    project_ref,
                    created: true,
                }
            }
        };
        tx.commit().map_err(db_error)?;
        Ok(added)
    }

    fn resolve_project(&self, label: &Label) -> Result<ProjectRef, StoreError> {
        let guard = self.lock()?;
        find_project(&guard, label)?
            .ok_or_else(|| StoreError::NotFound(format!("project {label}")))
    }

    fn list_projects(&self) -> Result<BTreeMap<ProjectRef, Label>, StoreError> {
        let guard = self.lock()?;
        let mut statement =
            guard.prepare("SELECT Ref, Label FROM _Project ORDER BY Ref").map_err(db_error)?;
        let rows = statement
            .query_map(params![], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;
        let mut projects = BTreeMap::new();
        for (project_ref, label) in rows {
            let label =
                Label::parse(&label).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            projects.insert(ProjectRef::new(project_ref), label);
        }
        Ok(projects)
    }

    fn add_metric(
        &self,
        project: ProjectRef,
        label: &MetricLabel,
        default_value: &DefaultValue,
    ) -> Result<MetricAdded, StoreError> {
        let mut guard = self.lock()?;
        let tx = begin_write(&mut guard)?;
        require_project(&tx, project)?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT Ref FROM _Metric WHERE RefProject = ?1 AND Label = ?2",
                params![project.get(), label.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        let added = match existing {
            Some(metric_ref) => MetricAdded {
                metric_ref: MetricRef::new(metric_ref),
                created: false,
            },
            None => {
                tx.execute(
                    "INSERT INTO _Metric (RefProject, Label, DefaultValue) VALUES (?1, ?2, ?3)",
                    params![project.get(), label.as_str(), default_value.as_str()],
                )
                .map_err(db_error)?;
                let metric_ref = MetricRef::new(tx.last_insert_rowid());
                let metrics = query_metrics(&tx, project)?;
                rebuild_projection_view(&tx, project, &metrics)?;
                MetricAdded {
                    metric_ref,
                    created: true,
                }
            }
        };
        tx.commit().map_err(db_error)?;
        Ok(added)
    }

    fn list_metrics(&self, project: ProjectRef) -> Result<Vec<MetricRecord>, StoreError> {
        let guard = self.lock()?;
        require_project(&guard, project)?;
        Ok(query_metrics(&guard, project)?)
    }

    fn add_measure(
        &self,
        project: ProjectRef,
        values: &BTreeMap<String, String>,
    ) -> Result<MeasureWrite, StoreError> {
        let measured_at =
            MeasuredAt::now().map_err(|err| SqliteStoreError::Io(format!("clock: {err}")))?;
        let mut guard = self.lock()?;
        let tx = begin_write(&mut guard)?;
        require_project(&tx, project)?;
        let known: BTreeMap<String, MetricRef> = query_metrics(&tx, project)?
            .into_iter()
            .map(|metric| (metric.label.as_str().to_string(), metric.metric_ref))
            .collect();
        let plan = plan_measure_values(&known, values);

        tx.execute(
            "INSERT INTO _Measure (RefProject, DateMeasure) VALUES (?1, ?2)",
            params![project.get(), measured_at.as_str()],
        )
        .map_err(db_error)?;
        let measure_ref = MeasureRef::new(tx.last_insert_rowid());
        for (metric_ref, value) in &plan.accepted {
            tx.execute(
                "INSERT INTO _Value (RefMeasure, RefMetric, Value) VALUES (?1, ?2, ?3)",
                params![measure_ref.get(), metric_ref.get(), value.as_str()],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)?;
        Ok(MeasureWrite::from_plan(measure_ref, plan))
    }

    fn delete_measure(&self, measure: MeasureRef) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let tx = begin_write(&mut guard)?;
        let exists: Option<i64> = tx
            .query_row("SELECT Ref FROM _Measure WHERE Ref = ?1", params![measure.get()], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_error)?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("measure {measure}")));
        }
        tx.execute("DELETE FROM _Value WHERE RefMeasure = ?1", params![measure.get()])
            .map_err(db_error)?;
        tx.execute("DELETE FROM _Measure WHERE Ref = ?1", params![measure.get()])
            .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        Ok(())
    }

    fn project(&self, project: ProjectRef, limit: MeasureLimit) -> Result<DenseProjection, StoreError> {
        let mut guard = self.lock()?;
        let tx = begin_write(&mut guard)?;
        require_project(&tx, project)?;
        let metrics = query_metrics(&tx, project)?;
        if !projection_view_is_current(&tx, project, &metrics)? {
            rebuild_projection_view(&tx, project, &metrics)?;
        }
        let projection = read_projection(&tx, project, &metrics, limit)?;
        tx.commit().map_err(db_error)?;
        Ok(projection)
    }

    fn flush_project(&self, project: ProjectRef) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let tx = begin_write(&mut guard)?;
        require_project(&tx, project)?;
        tx.execute(
            "DELETE FROM _Value WHERE RefMeasure IN (SELECT Ref FROM _Measure WHERE RefProject = ?1)",
            params![project.get()],
        )
        .map_err(db_error)?;
        tx.execute("DELETE FROM _Measure WHERE RefProject = ?1", params![project.get()])
            .map_err(db_error)?;
        tx.execute("DELETE FROM _Metric WHERE RefProject = ?1", params![project.get()])
            .map_err(db_error)?;
        tx.execute("DELETE FROM _Project WHERE Ref = ?1", params![project.get()])
            .map_err(db_error)?;
        tx.execute_batch(&format!("DROP VIEW IF EXISTS {};", projection_view_name(project)))
            .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Catalog Queries
// ============================================================================

/// Looks up a project by label.
fn find_project(connection: &Connection, label: &Label) -> Result<Option<ProjectRef>, SqliteStoreError> {
    let project_ref: Option<i64> = connection
        .query_row("SELECT Ref FROM _Project WHERE Label = ?1", params![label.as_str()], |row| {
            row.get(0)
        })
        .optional()
        .map_err(db_error)?;
    Ok(project_ref.map(ProjectRef::new))
}

/// Fails with `NotFound` unless the project exists.
fn require_project(connection: &Connection, project: ProjectRef) -> Result<(), SqliteStoreError> {
    let exists: Option<i64> = connection
        .query_row("SELECT Ref FROM _Project WHERE Ref = ?1", params![project.get()], |row| {
            row.get(0)
        })
        .optional()
        .map_err(db_error)?;
    if exists.is_some() {
        Ok(())
    } else {
        Err(SqliteStoreError::NotFound(format!("project {project}")))
    }
}

/// Returns the metrics of a project in label order.
fn query_metrics(
    connection: &Connection,
    project: ProjectRef,
) -> Result<Vec<MetricRecord>, SqliteStoreError> {
    let mut statement = connection
        .prepare("SELECT Ref, Label, DefaultValue FROM _Metric WHERE RefProject = ?1 ORDER BY Label")
        .map_err(db_error)?;
    let rows = statement
        .query_map(params![project.get()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    rows.into_iter()
        .map(|(metric_ref, label, default_value)| -> Result<MetricRecord, SqliteStoreError> {
            Ok(MetricRecord {
                metric_ref: MetricRef::new(metric_ref),
                project_ref: project,
                label: MetricLabel::parse(&label)
                    .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?,
                default_value: DefaultValue::from_stored(&default_value)
                    .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?,
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Projection Views
// ============================================================================

/// Returns the name of a project's projection view.
#[must_use]
pub fn projection_view_name(project: ProjectRef) -> String {
    format!("{PROJECTION_VIEW_PREFIX}{}", project.get())
}

/// Returns the view column alias of a metric.
fn metric_column_name(metric: MetricRef) -> String {
    format!("M{}", metric.get())
}

/// Returns the column names a current view of `metrics` exposes.
fn expected_view_columns(metrics: &[MetricRecord]) -> Vec<String> {
    PROJECTION_FIXED_COLUMNS
        .iter()
        .map(|column| (*column).to_string())
        .chain(metrics.iter().map(|metric| metric_column_name(metric.metric_ref)))
        .collect()
}

/// Drops and recreates a project's projection view.
fn rebuild_projection_view(
    connection: &Connection,
    project: ProjectRef,
    metrics: &[MetricRecord],
) -> Result<(), SqliteStoreError> {
    let view = projection_view_name(project);
    let columns = expected_view_columns(metrics).join(", ");
    let mut sql = format!(
        "CREATE VIEW {view} ({columns}) AS SELECT _Measure.Ref, CAST(_Measure.DateMeasure AS TEXT)"
    );
    for metric in metrics {
        let metric_ref = metric.metric_ref.get();
        sql.push_str(&format!(
            ", CAST(COALESCE((SELECT Value FROM _Value WHERE RefMeasure = _Measure.Ref AND \
             RefMetric = {metric_ref}), (SELECT DefaultValue FROM _Metric WHERE Ref = \
             {metric_ref})) AS TEXT)"
        ));
    }
    sql.push_str(&format!(" FROM _Measure WHERE _Measure.RefProject = {};", project.get()));
    connection.execute_batch(&format!("DROP VIEW IF EXISTS {view};")).map_err(db_error)?;
    connection.execute_batch(&sql).map_err(db_error)?;
    Ok(())
}

/// Returns true when the view exists and matches the metric registry.
fn projection_view_is_current(
    connection: &Connection,
    project: ProjectRef,
    metrics: &[MetricRecord],
) -> Result<bool, SqliteStoreError> {
    let mut statement = connection
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(db_error)?;
    let columns = statement
        .query_map(params![projection_view_name(project)], |row| row.get::<_, String>(0))
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    Ok(columns == expected_view_columns(metrics))
}

/// Reads the dense projection of a project from its view.
fn read_projection(
    connection: &Connection,
    project: ProjectRef,
    metrics: &[MetricRecord],
    limit: MeasureLimit,
) -> Result<DenseProjection, SqliteStoreError> {
    let view = projection_view_name(project);
    let (sql, bound) = match limit {
        MeasureLimit::All => (format!("SELECT * FROM {view} ORDER BY DateMeasure, Ref"), None),
        MeasureLimit::Last(count) => (
            format!(
                "SELECT * FROM (SELECT * FROM {view} ORDER BY Ref DESC LIMIT ?1) ORDER BY \
                 DateMeasure, Ref"
            ),
            Some(i64::try_from(count).unwrap_or(i64::MAX)),
        ),
    };
    let width = metrics.len();
    let mut statement = connection.prepare(&sql).map_err(db_error)?;
    let rows = statement
        .query_map(params_from_iter(bound.iter()), |row| {
            let mut cells = Vec::with_capacity(width);
            for index in 0 .. width {
                cells.push(row.get::<_, String>(index + PROJECTION_FIXED_COLUMNS.len())?);
            }
            Ok(ProjectionRow {
                measure_ref: MeasureRef::new(row.get(0)?),
                measured_at: MeasuredAt::from_stored(row.get::<_, String>(1)?),
                cells,
            })
        })
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    Ok(DenseProjection {
        columns: metrics.iter().map(|metric| metric.label.clone()).collect(),
        rows,
    })
}

// ============================================================================
// SECTION: Schema Lifecycle
// ============================================================================

/// Initializes a fresh store or validates and upgrades an existing one.
fn initialize_schema(connection: &mut Connection) -> Result<SqliteOpenReport, SqliteStoreError> {
    let tx = begin_write(connection)?;
    let report = match read_store_version(&tx)? {
        None => {
            tx.execute_batch(VERSION_TABLE_SQL).map_err(db_error)?;
            tx.execute_batch(DATA_TABLES_SQL).map_err(db_error)?;
            tx.execute(
                "INSERT INTO _Version (Label) VALUES (?1)",
                params![CURRENT_STORE_VERSION.to_string()],
            )
            .map_err(db_error)?;
            SqliteOpenReport {
                version: CURRENT_STORE_VERSION,
                created: true,
                migrated_from: None,
            }
        }
        Some(version) if version == CURRENT_STORE_VERSION => SqliteOpenReport {
            version,
            created: false,
            migrated_from: None,
        },
        Some(version) if version > CURRENT_STORE_VERSION => {
            return Err(SqliteStoreError::IncompatibleVersion {
                store: version,
                running: CURRENT_STORE_VERSION,
            });
        }
        Some(version) => {
            migrate(&tx, version)?;
            SqliteOpenReport {
                version: CURRENT_STORE_VERSION,
                created: false,
                migrated_from: Some(version),
            }
        }
    };
    tx.commit().map_err(db_error)?;
    Ok(report)
}

/// Reads the version marker, or `None` for an uninitialized database.
fn read_store_version(connection: &Connection) -> Result<Option<StoreVersion>, SqliteStoreError> {
    let table: Option<String> = connection
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_Version'",
            params![],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_error)?;
    if table.is_none() {
        return Ok(None);
    }
    let label: Option<String> = connection
        .query_row("SELECT Label FROM _Version ORDER BY Ref LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    let Some(label) = label else {
        return Err(SqliteStoreError::VersionMismatch("store version marker missing".to_string()));
    };
    StoreVersion::parse(&label)
        .map(Some)
        .map_err(|err| SqliteStoreError::VersionMismatch(err.to_string()))
}

/// Applies the migration chain from `from` up to the running version.
fn migrate(connection: &Connection, from: StoreVersion) -> Result<(), SqliteStoreError> {
    let mut version = from;
    while version < CURRENT_STORE_VERSION {
        version = match version {
            LEGACY_STORE_VERSION => {
                migrate_legacy_layout(connection)?;
                StoreVersion::new(1, 1, 0)
            }
            other => {
                return Err(SqliteStoreError::VersionMismatch(format!(
                    "no migration path from store version {other} to {CURRENT_STORE_VERSION}"
                )));
            }
        };
    }
    connection
        .execute("UPDATE _Version SET Label = ?1", params![version.to_string()])
        .map_err(db_error)?;
    Ok(())
}

/// Upgrades the `01.00.00` layout: label-named views, no unique indexes.
fn migrate_legacy_layout(connection: &Connection) -> Result<(), SqliteStoreError> {
    let views = {
        let mut statement = connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY name")
            .map_err(db_error)?;
        statement
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?
    };
    for view in views {
        if !is_identifier(&view) {
            return Err(SqliteStoreError::Invalid(format!(
                "legacy view name {view:?} is not a label"
            )));
        }
        connection.execute_batch(&format!("DROP VIEW \"{view}\";")).map_err(db_error)?;
    }
    connection.execute_batch(LEGACY_RENAME_SQL).map_err(db_error)?;
    connection.execute_batch(DATA_TABLES_SQL).map_err(db_error)?;
    connection.execute_batch(LEGACY_COPY_SQL).map_err(db_error)?;

    let projects = {
        let mut statement =
            connection.prepare("SELECT Ref FROM _Project ORDER BY Ref").map_err(db_error)?;
        statement
            .query_map(params![], |row| row.get::<_, i64>(0))
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?
    };
    for project_ref in projects {
        let project = ProjectRef::new(project_ref);
        let metrics = query_metrics(connection, project)?;
        rebuild_projection_view(connection, project, &metrics)?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Starts an `IMMEDIATE` transaction; lock waits honor the busy timeout.
fn begin_write(connection: &mut Connection) -> Result<Transaction<'_>, SqliteStoreError> {
    connection.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    Ok(())
}
