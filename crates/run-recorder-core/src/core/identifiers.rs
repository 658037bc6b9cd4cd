// crates/run-recorder-core/src/core/identifiers.rs
// ============================================================================
// Module: Run Recorder Identifiers
// Description: Numeric references for projects, metrics, and measures.
// Purpose: Keep row references strongly typed across stores and the router.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! References are the stable numeric handles assigned by a store on insert.
//! They serialize as plain integers and render as decimal strings in the
//! action payloads. Each reference kind is a distinct type so a measure handle
//! can never be passed where a project is expected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::labels::ValidationError;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Reference of a project row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectRef(i64);

impl ProjectRef {
    /// Creates a project reference from a raw row identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference of a metric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRef(i64);

impl MetricRef {
    /// Creates a metric reference from a raw row identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MetricRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference of a measure row, handed back to callers for later deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasureRef(i64);

impl MeasureRef {
    /// Creates a measure reference from a raw row identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Parses a measure reference supplied as text by a client.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidReference`] when the text is not a
    /// positive decimal integer.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(ValidationError::InvalidReference(raw.to_string())),
        }
    }
}

impl fmt::Display for MeasureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
