// crates/run-recorder-api/tests/router_actions.rs
// ============================================================================
// Module: Action Router Tests
// Description: Request/response contract of every action.
// Purpose: Ensure payload shapes, failure codes, and audit events are stable.
// ============================================================================

//! ## Overview
//! Drives the router over the in-memory store with form-encoded requests and
//! checks the `ret`-coded payloads and the audit trail.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;

use run_recorder_api::ActionAuditEvent;
use run_recorder_api::ActionOutcome;
use run_recorder_api::ActionRequest;
use run_recorder_api::ActionResponse;
use run_recorder_api::ActionRouter;
use run_recorder_api::AuditSink;
use run_recorder_core::CURRENT_STORE_VERSION;
use run_recorder_core::InMemoryMeasureStore;
use run_recorder_core::Separator;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Audit sink that keeps every action event.
#[derive(Default)]
struct RecordingSink {
    /// Events in arrival order.
    events: Mutex<Vec<ActionAuditEvent>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &ActionAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn router() -> (ActionRouter, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let router =
        ActionRouter::new(Arc::new(InMemoryMeasureStore::new()), sink.clone(), Separator::default());
    (router, sink)
}

fn call(router: &ActionRouter, body: &str) -> Value {
    match router.handle_form(body) {
        ActionResponse::Json(value) => value,
        ActionResponse::Text(text) => panic!("expected json, got text {text:?}"),
    }
}

fn text(router: &ActionRouter, body: &str) -> String {
    match router.handle_form(body) {
        ActionResponse::Text(text) => text,
        ActionResponse::Json(value) => panic!("expected text, got json {value}"),
    }
}

fn seed_demo(router: &ActionRouter) {
    assert_eq!(call(router, "action=add_project&label=demo")["ret"], "0");
    assert_eq!(call(router, "action=add_metric&project=demo&label=latency&default=0")["ret"], "0");
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn empty_request_succeeds_without_action() {
    let (router, sink) = router();
    assert_eq!(call(&router, ""), json!({"ret": "0"}));
    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, None);
}

#[test]
fn unknown_action_is_invalid() {
    let (router, sink) = router();
    assert_eq!(call(&router, "action=drop_tables"), json!({"ret": "1", "errMsg": "Invalid action"}));
    let events = sink.events.lock().unwrap();
    assert_eq!(events[0].outcome, ActionOutcome::Error);
    assert_eq!(events[0].error_kind, Some("invalid_action"));
}

#[test]
fn missing_input_is_invalid_action() {
    let (router, _) = router();
    let payload = call(&router, "action=add_metric&project=demo&label=latency");
    assert_eq!(payload["ret"], "1");
    assert!(payload["errMsg"].as_str().unwrap().starts_with("Invalid action"));
}

#[test]
fn version_reports_running_layout() {
    let (router, _) = router();
    let payload = call(&router, "action=version");
    assert_eq!(payload["ret"], "0");
    assert_eq!(payload["version"], CURRENT_STORE_VERSION.to_string());
}

#[test]
fn help_lists_every_action() {
    let (router, _) = router();
    let payload = call(&router, "action=help");
    let actions = payload["actions"].as_str().unwrap();
    for name in ["version", "add_project&label=...", "csv&project=...[&sep=...(default: &)]", "flush"] {
        assert!(actions.contains(name), "missing {name}");
    }
}

#[test]
fn add_project_is_idempotent_and_listed() {
    let (router, _) = router();
    let first = call(&router, "action=add_project&label=demo");
    let second = call(&router, "action=add_project&label=demo");
    assert_eq!(first, second);
    assert_eq!(first["refProject"], "1");
    assert_eq!(call(&router, "action=projects"), json!({"ret": "0", "projects": {"1": "demo"}}));
}

#[test]
fn add_project_rejects_bad_label() {
    let (router, _) = router();
    let payload = call(&router, "action=add_project&label=9lives");
    assert_eq!(payload["ret"], "1");
    assert!(payload["errMsg"].as_str().unwrap().contains("9lives"));
}

#[test]
fn metrics_payload_carries_label_and_default() {
    let (router, _) = router();
    seed_demo(&router);
    assert_eq!(
        call(&router, "action=metrics&project=demo"),
        json!({"ret": "0", "metrics": {"1": {"label": "latency", "defaultValue": "0"}}})
    );
}

#[test]
fn reserved_metric_label_is_rejected() {
    let (router, _) = router();
    seed_demo(&router);
    let payload = call(&router, "action=add_metric&project=demo&label=action&default=1");
    assert_eq!(payload["ret"], "1");
}

#[test]
fn unknown_project_fails() {
    let (router, sink) = router();
    let payload = call(&router, "action=metrics&project=ghost");
    assert_eq!(payload["ret"], "1");
    assert_eq!(payload["errMsg"], "project ghost not found");
    assert_eq!(sink.events.lock().unwrap()[0].error_kind, Some("not_found"));
}

#[test]
fn demo_scenario_round_trips_through_actions() {
    let (router, _) = router();
    seed_demo(&router);
    assert_eq!(call(&router, "action=add_measure&project=demo"), json!({"ret": "0", "refMeasure": "1"}));
    assert_eq!(
        call(&router, "action=add_measure&project=demo&latency=42"),
        json!({"ret": "0", "refMeasure": "2"})
    );
    assert_eq!(
        call(&router, "action=measures&project=demo"),
        json!({"ret": "0", "labels": ["Ref", "latency"], "values": [["1", "0"], ["2", "42"]]})
    );
    assert_eq!(text(&router, "action=csv&project=demo"), "latency\n0\n42\n");
    assert_eq!(text(&router, "action=csv&project=demo&sep=%3B"), "latency\n0\n42\n");
}

#[test]
fn measures_honours_last() {
    let (router, _) = router();
    seed_demo(&router);
    for value in ["1", "2", "3"] {
        call(&router, &format!("action=add_measure&project=demo&latency={value}"));
    }
    let payload = call(&router, "action=measures&project=demo&last=2");
    assert_eq!(payload["values"], json!([["2", "2"], ["3", "3"]]));
    let payload = call(&router, "action=measures&project=demo&last=-1");
    assert_eq!(payload["values"].as_array().unwrap().len(), 3);
    let payload = call(&router, "action=measures&project=demo&last=many");
    assert_eq!(payload["ret"], "1");
}

#[test]
fn partial_measure_keeps_reference() {
    let (router, sink) = router();
    seed_demo(&router);
    call(&router, "action=add_metric&project=demo&label=host&default=none");
    let payload = call(&router, "action=add_measure&project=demo&latency=4%262&host=alpha&ghost=1");
    assert_eq!(payload["ret"], "1");
    assert_eq!(payload["refMeasure"], "1");
    assert!(payload["errMsg"].as_str().unwrap().contains("latency"));
    assert_eq!(
        call(&router, "action=measures&project=demo")["values"],
        json!([["1", "alpha", "0"]])
    );
    let events = sink.events.lock().unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.outcome, ActionOutcome::Partial);
    assert_eq!(last.measure_ref, Some(1));
}

#[test]
fn delete_measure_removes_row() {
    let (router, _) = router();
    seed_demo(&router);
    call(&router, "action=add_measure&project=demo&latency=7");
    assert_eq!(call(&router, "action=delete_measure&measure=1"), json!({"ret": "0"}));
    assert_eq!(call(&router, "action=measures&project=demo")["values"], json!([]));
    assert_eq!(call(&router, "action=delete_measure&measure=1")["ret"], "1");
    assert_eq!(call(&router, "action=delete_measure&measure=abc")["ret"], "1");
}

#[test]
fn empty_separator_fails_as_json() {
    let (router, _) = router();
    seed_demo(&router);
    let response = router.handle_form("action=csv&project=demo&sep=");
    assert!(!response.is_success());
    assert!(response.as_json().is_some());
}

#[test]
fn configured_separator_applies_without_sep() {
    let store = Arc::new(InMemoryMeasureStore::new());
    let router =
        ActionRouter::new(store, Arc::new(RecordingSink::default()), Separator::parse(";").unwrap());
    call(&router, "action=add_project&label=demo");
    call(&router, "action=add_metric&project=demo&label=a&default=1");
    call(&router, "action=add_metric&project=demo&label=b&default=2");
    call(&router, "action=add_measure&project=demo");
    assert_eq!(text(&router, "action=csv&project=demo"), "a;b\n1;2\n");
}

#[test]
fn flush_removes_project() {
    let (router, _) = router();
    seed_demo(&router);
    call(&router, "action=add_measure&project=demo&latency=1");
    assert_eq!(call(&router, "action=flush&project=demo"), json!({"ret": "0"}));
    assert_eq!(call(&router, "action=projects"), json!({"ret": "0", "projects": {}}));
    assert_eq!(call(&router, "action=measures&project=demo")["ret"], "1");
}

#[test]
fn oversized_request_is_refused() {
    let (router, sink) = router();
    let body = format!("action=add_measure&project=demo&latency={}", "9".repeat(70_000));
    let response = router.handle_form(&body);
    assert!(!response.is_success());
    assert_eq!(sink.events.lock().unwrap()[0].error_kind, Some("request_too_large"));
}

#[test]
fn audit_events_never_carry_values() {
    let (router, sink) = router();
    seed_demo(&router);
    call(&router, "action=add_measure&project=demo&latency=31337");
    for event in sink.events.lock().unwrap().iter() {
        let line = serde_json::to_string(event).unwrap();
        assert!(!line.contains("31337"));
    }
}

#[test]
fn request_builder_matches_form_decoding() {
    let built = ActionRequest::new().with("action", "add_measure").with("project", "demo").with("a b", "x&y");
    let decoded = ActionRequest::from_form(&built.to_form()).unwrap();
    assert_eq!(built, decoded);
    let values = decoded.measure_values();
    assert_eq!(values.len(), 1);
    assert_eq!(values.get("a b").map(String::as_str), Some("x&y"));
}
