// crates/run-recorder-cli/src/main.rs
// ============================================================================
// Module: Run Recorder CLI Entry Point
// Description: Command dispatcher for local Run Recorder stores.
// Purpose: Expose every router action as a subcommand.
// Dependencies: clap, run-recorder-api, run-recorder-config, thiserror
// ============================================================================

//! ## Overview
//! The Run Recorder CLI translates each subcommand into an action request and
//! sends it through [`ActionRouter`], so the printed output is exactly the
//! action payload. The process exits non-zero when the payload reports
//! `"ret":"1"`. Security posture: arguments are untrusted and validated by the
//! router before they reach the store.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use run_recorder_api::ActionName;
use run_recorder_api::ActionRequest;
use run_recorder_api::ActionResponse;
use run_recorder_api::ActionRouter;
use run_recorder_api::request::ACTION_FIELD;
use run_recorder_api::request::PROJECT_FIELD;
use run_recorder_config::RunRecorderConfig;
use run_recorder_config::StoreType;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "run-recorder", disable_help_subcommand = true)]
struct Cli {
    /// Config file (overrides `RUN_RECORDER_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// `SQLite` database file (overrides `[store]`).
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the store layout version.
    Version,
    /// List the router actions.
    HelpActions,
    /// Project commands.
    Project {
        /// Selected project subcommand.
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Metric commands.
    Metric {
        /// Selected metric subcommand.
        #[command(subcommand)]
        command: MetricCommand,
    },
    /// Measure commands.
    Measure {
        /// Selected measure subcommand.
        #[command(subcommand)]
        command: MeasureCommand,
    },
    /// Print a project's measures as JSON records.
    Measures {
        /// Project label.
        project: String,
        /// Only the most recent measures (0 or less for all).
        #[arg(long, allow_negative_numbers = true)]
        last: Option<String>,
    },
    /// Print a project's measures as delimited text.
    Csv {
        /// Project label.
        project: String,
        /// Column separator.
        #[arg(long)]
        sep: Option<String>,
    },
    /// Remove a project and everything recorded for it.
    Flush {
        /// Project label.
        project: String,
    },
    /// Send a raw form-encoded request (`action=...&...`).
    Call {
        /// Form-encoded request body.
        request: String,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Project subcommands.
#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// Create a project (no-op when it exists).
    Add {
        /// Project label.
        label: String,
    },
    /// List projects.
    List,
}

/// Metric subcommands.
#[derive(Subcommand, Debug)]
enum MetricCommand {
    /// Register a metric with its default value.
    Add {
        /// Project label.
        project: String,
        /// Metric label.
        label: String,
        /// Value used for measures that lack this metric.
        default: String,
    },
    /// List the metrics of a project.
    List {
        /// Project label.
        project: String,
    },
}

/// Measure subcommands.
#[derive(Subcommand, Debug)]
enum MeasureCommand {
    /// Record a measure from `metric=value` pairs.
    Add {
        /// Project label.
        project: String,
        /// Values as `metric=value`.
        values: Vec<String>,
    },
    /// Delete a measure by reference.
    Delete {
        /// Measure reference.
        measure: String,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the resolved configuration.
    Validate,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = load_config(&cli)?;
    if matches!(cli.command, Commands::Config { command: ConfigCommand::Validate }) {
        write_stdout(&format!("config ok ({})\n", describe_store(&config)))?;
        return Ok(ExitCode::SUCCESS);
    }
    let request = request_for(&cli.command)?;
    let router = ActionRouter::from_config(&config)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    let response = router.handle(&request);
    write_stdout(&render(&response))?;
    Ok(if response.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Loads the configuration and applies the `--db` override.
fn load_config(cli: &Cli) -> CliResult<RunRecorderConfig> {
    let mut config = RunRecorderConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if let Some(db) = &cli.db {
        config.store.store_type = StoreType::Sqlite;
        config.store.path.clone_from(db);
        config.validate().map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    }
    Ok(config)
}

/// Describes the configured store for `config validate`.
fn describe_store(config: &RunRecorderConfig) -> String {
    match config.store.store_type {
        StoreType::Sqlite => format!("sqlite store at {}", config.store.path.display()),
        StoreType::Memory => "memory store".to_string(),
    }
}

// ============================================================================
// SECTION: Request Translation
// ============================================================================

/// Translates a subcommand into an action request.
fn request_for(command: &Commands) -> CliResult<ActionRequest> {
    let request = match command {
        Commands::Version => action(ActionName::Version),
        Commands::HelpActions => action(ActionName::Help),
        Commands::Project {
            command,
        } => match command {
            ProjectCommand::Add {
                label,
            } => action(ActionName::AddProject).with("label", label),
            ProjectCommand::List => action(ActionName::Projects),
        },
        Commands::Metric {
            command,
        } => match command {
            MetricCommand::Add {
                project,
                label,
                default,
            } => action(ActionName::AddMetric)
                .with(PROJECT_FIELD, project)
                .with("label", label)
                .with("default", default),
            MetricCommand::List {
                project,
            } => action(ActionName::Metrics).with(PROJECT_FIELD, project),
        },
        Commands::Measure {
            command,
        } => match command {
            MeasureCommand::Add {
                project,
                values,
            } => measure_request(project, values)?,
            MeasureCommand::Delete {
                measure,
            } => action(ActionName::DeleteMeasure).with("measure", measure),
        },
        Commands::Measures {
            project,
            last,
        } => {
            let request = action(ActionName::Measures).with(PROJECT_FIELD, project);
            match last {
                Some(last) => request.with("last", last),
                None => request,
            }
        }
        Commands::Csv {
            project,
            sep,
        } => {
            let request = action(ActionName::Csv).with(PROJECT_FIELD, project);
            match sep {
                Some(sep) => request.with("sep", sep),
                None => request,
            }
        }
        Commands::Flush {
            project,
        } => action(ActionName::Flush).with(PROJECT_FIELD, project),
        Commands::Call {
            request,
        } => ActionRequest::from_form(request)
            .ok_or_else(|| CliError::new("request body is too large".to_string()))?,
        Commands::Config {
            ..
        } => return Err(CliError::new("config commands do not map to an action".to_string())),
    };
    Ok(request)
}

/// Starts a request for `name`.
fn action(name: ActionName) -> ActionRequest {
    ActionRequest::new().with(ACTION_FIELD, name.as_str())
}

/// Builds an `add_measure` request from `metric=value` pairs.
fn measure_request(project: &str, values: &[String]) -> CliResult<ActionRequest> {
    let mut request = action(ActionName::AddMeasure).with(PROJECT_FIELD, project);
    for pair in values {
        let Some((metric, value)) = pair.split_once('=') else {
            return Err(CliError::new(format!("expected metric=value, got {pair:?}")));
        };
        if metric == ACTION_FIELD || metric == PROJECT_FIELD {
            return Err(CliError::new(format!("metric label {metric:?} is reserved")));
        }
        request = request.with(metric, value);
    }
    Ok(request)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Renders a response for stdout: JSON gets a trailing newline, text is raw.
fn render(response: &ActionResponse) -> String {
    match response {
        ActionResponse::Json(_) => format!("{}\n", response.render()),
        ActionResponse::Text(text) => text.clone(),
    }
}

/// Writes text to stdout.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
