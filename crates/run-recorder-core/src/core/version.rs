// crates/run-recorder-core/src/core/version.rs
// ============================================================================
// Module: Run Recorder Store Versions
// Description: Dotted store version markers and the known version constants.
// Purpose: Compare a persisted version marker against the running code.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A store carries a single version marker written as `MM.mm.pp`. Versions
//! compare numerically component by component, so `01.10.00` is newer than
//! `01.09.00` regardless of text width.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::labels::ValidationError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// First published layout: five tables and label-named views.
pub const LEGACY_STORE_VERSION: StoreVersion = StoreVersion::new(1, 0, 0);

/// Layout expected by this code.
pub const CURRENT_STORE_VERSION: StoreVersion = StoreVersion::new(1, 1, 0);

// ============================================================================
// SECTION: Types
// ============================================================================

/// Store layout version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreVersion {
    /// Major component.
    major: u16,
    /// Minor component.
    minor: u16,
    /// Patch component.
    patch: u16,
}

impl StoreVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses `MM.mm.pp` text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidVersion`] unless the text holds
    /// exactly three dot-separated unsigned integers.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidVersion(raw.to_string());
        let mut parts = raw.trim().split('.');
        let mut next = || -> Result<u16, ValidationError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u16>().map_err(|_| invalid())
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:02}", self.major, self.minor, self.patch)
    }
}

impl FromStr for StoreVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StoreVersion {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StoreVersion> for String {
    fn from(value: StoreVersion) -> Self {
        value.to_string()
    }
}
