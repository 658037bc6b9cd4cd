// crates/run-recorder-api/src/actions.rs
// ============================================================================
// Module: Action Identifiers
// Description: Canonical action names accepted by the router.
// Purpose: Shared action naming for the router, audit events, and the CLI.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Canonical action identifiers. These names are part of the external request
//! contract and must stay stable.

use std::fmt;

use serde::Serialize;

/// Canonical action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    /// Report the store layout version.
    Version,
    /// Create a project (idempotent).
    AddProject,
    /// List projects.
    Projects,
    /// Register a metric with its default value.
    AddMetric,
    /// List the metrics of a project.
    Metrics,
    /// Record a measure.
    AddMeasure,
    /// Delete a measure and its values.
    DeleteMeasure,
    /// Read the dense projection as records.
    Measures,
    /// Read the dense projection as delimited text.
    Csv,
    /// Remove a project and everything recorded for it.
    Flush,
    /// List the available actions.
    Help,
}

impl ActionName {
    /// Returns the canonical string name for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::AddProject => "add_project",
            Self::Projects => "projects",
            Self::AddMetric => "add_metric",
            Self::Metrics => "metrics",
            Self::AddMeasure => "add_measure",
            Self::DeleteMeasure => "delete_measure",
            Self::Measures => "measures",
            Self::Csv => "csv",
            Self::Flush => "flush",
            Self::Help => "help",
        }
    }

    /// Returns the request shape shown by `help`.
    #[must_use]
    pub const fn usage(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::AddProject => "add_project&label=...",
            Self::Projects => "projects",
            Self::AddMetric => "add_metric&project=...&label=...&default=...",
            Self::Metrics => "metrics&project=...",
            Self::AddMeasure => "add_measure&project=...&...=...&...",
            Self::DeleteMeasure => "delete_measure&measure=...",
            Self::Measures => "measures&project=...[&last=...(default: 0)]",
            Self::Csv => "csv&project=...[&sep=...(default: &)]",
            Self::Flush => "flush&project=...",
            Self::Help => "help",
        }
    }

    /// Returns all actions in the order `help` lists them.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Version,
            Self::AddProject,
            Self::Projects,
            Self::AddMetric,
            Self::Metrics,
            Self::AddMeasure,
            Self::DeleteMeasure,
            Self::Measures,
            Self::Csv,
            Self::Flush,
        ]
    }

    /// Parses an action name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "version" => Some(Self::Version),
            "add_project" => Some(Self::AddProject),
            "projects" => Some(Self::Projects),
            "add_metric" => Some(Self::AddMetric),
            "metrics" => Some(Self::Metrics),
            "add_measure" => Some(Self::AddMeasure),
            "delete_measure" => Some(Self::DeleteMeasure),
            "measures" => Some(Self::Measures),
            "csv" => Some(Self::Csv),
            "flush" => Some(Self::Flush),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Renders the `help` listing.
    #[must_use]
    pub fn help_listing() -> String {
        Self::all().iter().map(|action| action.usage()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
