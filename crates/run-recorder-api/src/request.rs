// crates/run-recorder-api/src/request.rs
// ============================================================================
// Module: Action Requests
// Description: Flat string-map requests and their form-encoded decoding.
// Purpose: Give the router one request shape regardless of transport.
// Dependencies: url
// ============================================================================

//! ## Overview
//! An [`ActionRequest`] is the flat `name -> value` map the router consumes.
//! Form-encoded bodies such as `action=add_measure&project=demo&latency=42`
//! decode into it; when a name repeats, the last occurrence wins.
//!
//! Security posture: request text is untrusted and bounded by
//! [`MAX_REQUEST_BYTES`] before decoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use url::form_urlencoded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Request field carrying the action name.
pub const ACTION_FIELD: &str = "action";
/// Request field carrying the project label.
pub const PROJECT_FIELD: &str = "project";
/// Maximum accepted size of a form-encoded request body.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Request
// ============================================================================

/// Flat request map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRequest {
    /// Request fields keyed by name.
    fields: BTreeMap<String, String>,
}

impl ActionRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a form-encoded request body.
    ///
    /// Returns `None` when the body exceeds [`MAX_REQUEST_BYTES`].
    #[must_use]
    pub fn from_form(body: &str) -> Option<Self> {
        if body.len() > MAX_REQUEST_BYTES {
            return None;
        }
        let fields = form_urlencoded::parse(body.as_bytes())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        Some(Self {
            fields,
        })
    }

    /// Sets a field, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the raw action name, if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.get(ACTION_FIELD)
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the candidate metric values: every field except the action
    /// and the project.
    #[must_use]
    pub fn measure_values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter(|(name, _)| name.as_str() != ACTION_FIELD && name.as_str() != PROJECT_FIELD)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Encodes the request back into form-encoded text.
    #[must_use]
    pub fn to_form(&self) -> String {
        form_urlencoded::Serializer::new(String::new()).extend_pairs(self.fields.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ActionRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect(),
        }
    }
}
