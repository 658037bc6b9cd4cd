// crates/run-recorder-core/src/core/serialization.rs
// ============================================================================
// Module: Run Recorder Projection Serialization
// Description: Delimited-text and labels/values record renderings.
// Purpose: Turn dense projections into client-facing output formats.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Two renderings of a [`DenseProjection`]:
//! - Delimited text: a header of metric labels, then one line per row, each
//!   line terminated by `\n`. The measure reference is not included.
//! - Records: `labels` starting with [`REF_COLUMN_LABEL`] and `values` rows
//!   starting with the measure reference. Every element is a string.
//!
//! Stored values never contain `&`, so the default separator needs no escaping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::labels::ValidationError;
use crate::core::projection::DenseProjection;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator used when a client supplies none.
pub const DEFAULT_SEPARATOR: &str = "&";

/// Leading label of the records form.
pub const REF_COLUMN_LABEL: &str = "Ref";

// ============================================================================
// SECTION: Separator
// ============================================================================

/// Non-empty delimiter for delimited-text output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Separator(String);

impl Separator {
    /// Validates a separator.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSeparator`] when `raw` is empty.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::InvalidSeparator);
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the separator text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self(DEFAULT_SEPARATOR.to_string())
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for Separator {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Separator> for String {
    fn from(value: Separator) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Labels/values rendering of a projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionRecords {
    /// `Ref` followed by the metric labels.
    pub labels: Vec<String>,
    /// One row per measure: reference, then cells.
    pub values: Vec<Vec<String>>,
}

// ============================================================================
// SECTION: Renderers
// ============================================================================

impl DenseProjection {
    /// Renders the projection as separator-delimited text.
    #[must_use]
    pub fn to_delimited_text(&self, separator: &Separator) -> String {
        let sep = separator.as_str();
        let header: Vec<&str> = self.columns.iter().map(|label| label.as_str()).collect();
        let mut text = header.join(sep);
        text.push('\n');
        for row in &self.rows {
            text.push_str(&row.cells.join(sep));
            text.push('\n');
        }
        text
    }

    /// Renders the projection in labels/values form.
    #[must_use]
    pub fn to_records(&self) -> ProjectionRecords {
        let mut labels = Vec::with_capacity(self.columns.len() + 1);
        labels.push(REF_COLUMN_LABEL.to_string());
        labels.extend(self.columns.iter().map(ToString::to_string));
        let values = self
            .rows
            .iter()
            .map(|row| {
                let mut line = Vec::with_capacity(row.cells.len() + 1);
                line.push(row.measure_ref.to_string());
                line.extend(row.cells.iter().cloned());
                line
            })
            .collect();
        ProjectionRecords { labels, values }
    }
}
