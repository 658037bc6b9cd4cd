// crates/run-recorder-api/src/response.rs
// ============================================================================
// Module: Action Responses
// Description: JSON and raw-text action payloads.
// Purpose: Build `ret`-coded payloads consistently across actions.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Every action answers with a JSON object carrying `ret` (`"0"` on success,
//! `"1"` on failure), except a successful `csv`, which answers with raw text.

use serde_json::Map;
use serde_json::Value;

/// Success code.
pub const RET_OK: &str = "0";
/// Failure code.
pub const RET_FAILED: &str = "1";

/// Payload produced by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResponse {
    /// JSON object payload.
    Json(Value),
    /// Raw text payload (`csv`).
    Text(String),
}

impl ActionResponse {
    /// Builds `{"ret":"0"}` extended with `fields`.
    #[must_use]
    pub fn success(fields: Map<String, Value>) -> Self {
        let mut payload = Map::new();
        payload.insert("ret".to_string(), Value::from(RET_OK));
        payload.extend(fields);
        Self::Json(Value::Object(payload))
    }

    /// Builds `{"ret":"1", "errMsg": message}` extended with `fields`.
    #[must_use]
    pub fn failure(message: &str, fields: Map<String, Value>) -> Self {
        let mut payload = Map::new();
        payload.insert("ret".to_string(), Value::from(RET_FAILED));
        payload.insert("errMsg".to_string(), Value::from(message));
        payload.extend(fields);
        Self::Json(Value::Object(payload))
    }

    /// Returns true unless the payload carries `"ret":"1"`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Json(value) => value.get("ret").and_then(Value::as_str) != Some(RET_FAILED),
            Self::Text(_) => true,
        }
    }

    /// Returns the JSON payload, if this is one.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Renders the payload as it goes on the wire.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}
