// crates/run-recorder-core/src/core/labels.rs
// ============================================================================
// Module: Run Recorder Labels and Values
// Description: Validated project/metric labels, default values, and measure values.
// Purpose: Enforce the text invariants that keep projections and delimited output safe.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every piece of client text that reaches a store passes through one of the
//! validated wrappers in this module:
//! - [`Label`]: project label, `^[A-Za-z][A-Za-z0-9_]*$`.
//! - [`MetricLabel`]: same pattern, minus the reserved request fields
//!   [`RESERVED_METRIC_LABELS`].
//! - [`DefaultValue`] and [`MeasureValue`]: non-empty, free of `"`, `=`, `&`
//!   so they survive the `&`-separated text output unescaped. Defaults read
//!   back from a store only need to be non-empty and free of `"`.
//!
//! Wrappers deserialize through their validating constructors, so a value
//! read back from a config or payload can never bypass the checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metric labels that collide with request envelope fields.
pub const RESERVED_METRIC_LABELS: [&str; 2] = ["project", "action"];

/// Characters that may never appear in a stored value or default.
const FORBIDDEN_VALUE_CHARS: [char; 3] = ['"', '=', '&'];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation failures for client supplied text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Label does not match the identifier pattern.
    #[error("the label {0:?} is invalid")]
    InvalidLabel(String),
    /// Label is reserved for the request envelope.
    #[error("the label {0:?} is reserved")]
    ReservedLabel(String),
    /// Default value is empty or contains a forbidden character.
    #[error("the default value {0:?} is invalid")]
    InvalidDefault(String),
    /// Measure value is empty or contains a forbidden character.
    #[error("the value {value:?} for metric {metric:?} is invalid")]
    InvalidValue {
        /// Metric label the value was supplied for.
        metric: String,
        /// Rejected raw value.
        value: String,
    },
    /// Delimited-text separator is empty.
    #[error("the separator must not be empty")]
    InvalidSeparator,
    /// Reference text is not a positive integer.
    #[error("the reference {0:?} is invalid")]
    InvalidReference(String),
    /// Measure limit text is not an integer.
    #[error("the measure limit {0:?} is invalid")]
    InvalidLimit(String),
    /// Store version text is not `MM.mm.pp`.
    #[error("the store version {0:?} is invalid")]
    InvalidVersion(String),
}

// ============================================================================
// SECTION: Pattern Helpers
// ============================================================================

/// Returns true when `raw` matches `^[A-Za-z][A-Za-z0-9_]*$`.
#[must_use]
pub fn is_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic() && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Returns true when `raw` is non-empty and free of forbidden characters.
fn is_storable_value(raw: &str) -> bool {
    !raw.is_empty() && !raw.contains(&FORBIDDEN_VALUE_CHARS[..])
}

/// Returns true when `raw` satisfies the rule for rows already persisted.
fn is_persisted_value(raw: &str) -> bool {
    !raw.is_empty() && !raw.contains('"')
}

// ============================================================================
// SECTION: Label Types
// ============================================================================

/// Validated project label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    /// Validates a project label.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLabel`] when the label fails the
    /// identifier pattern.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if is_identifier(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidLabel(raw.to_string()))
        }
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for Label {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Label> for String {
    fn from(value: Label) -> Self {
        value.0
    }
}

/// Validated metric label, unique within its project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricLabel(String);

impl MetricLabel {
    /// Validates a metric label.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLabel`] for pattern failures and
    /// [`ValidationError::ReservedLabel`] for `project` or `action`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if !is_identifier(raw) {
            return Err(ValidationError::InvalidLabel(raw.to_string()));
        }
        if RESERVED_METRIC_LABELS.contains(&raw) {
            return Err(ValidationError::ReservedLabel(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for MetricLabel {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MetricLabel> for String {
    fn from(value: MetricLabel) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Value Types
// ============================================================================

/// Fallback cell value for measures lacking an explicit value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DefaultValue(String);

impl DefaultValue {
    /// Validates a metric default value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDefault`] when the value is empty or
    /// contains `"`, `=` or `&`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if is_storable_value(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidDefault(raw.to_string()))
        }
    }

    /// Accepts a default read back from a store.
    ///
    /// Stores written by earlier layouts may hold `=` or `&` in defaults, so
    /// only emptiness and `"` are rejected here.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDefault`] when the value is empty or
    /// contains `"`.
    pub fn from_stored(raw: &str) -> Result<Self, ValidationError> {
        if is_persisted_value(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidDefault(raw.to_string()))
        }
    }

    /// Returns the default as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for DefaultValue {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DefaultValue> for String {
    fn from(value: DefaultValue) -> Self {
        value.0
    }
}

/// Explicitly recorded value of one metric on one measure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct MeasureValue(String);

impl MeasureValue {
    /// Validates a raw value supplied for `metric`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] when the value is empty or
    /// contains `"`, `=` or `&`.
    pub fn parse(metric: &str, raw: &str) -> Result<Self, ValidationError> {
        if is_storable_value(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidValue {
                metric: metric.to_string(),
                value: raw.to_string(),
            })
        }
    }

    /// Returns the value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<MeasureValue> for String {
    fn from(value: MeasureValue) -> Self {
        value.0
    }
}
