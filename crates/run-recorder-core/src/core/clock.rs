// crates/run-recorder-core/src/core/clock.rs
// ============================================================================
// Module: Run Recorder Measure Timestamps
// Description: Sortable UTC timestamps attached to measures.
// Purpose: Give every backend the same text form for measure ordering.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Measure timestamps are stored as UTC text `YYYY-MM-DD HH:MM:SS.mmm`. The
//! fixed-width form sorts lexicographically in the same order as time, and
//! legacy rows written without the millisecond suffix still sort correctly
//! because a shorter prefix orders before any extension of it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Text layout of a measure timestamp.
const MEASURED_AT_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

// ============================================================================
// SECTION: Types
// ============================================================================

/// Time at which a measure was recorded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasuredAt(String);

impl MeasuredAt {
    /// Captures the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns [`time::error::Format`] if the clock value cannot be rendered.
    pub fn now() -> Result<Self, time::error::Format> {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    /// Renders an arbitrary instant, normalized to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`time::error::Format`] if the value cannot be rendered.
    pub fn from_datetime(instant: OffsetDateTime) -> Result<Self, time::error::Format> {
        let utc = instant.to_offset(time::UtcOffset::UTC);
        utc.format(MEASURED_AT_FORMAT).map(Self)
    }

    /// Wraps timestamp text read back from a store.
    #[must_use]
    pub fn from_stored(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the timestamp text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeasuredAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
