// crates/run-recorder-core/tests/proptest_labels.rs
// ============================================================================
// Module: Label and Value Property-Based Tests
// Description: Property tests for label, default, and value validation.
// Purpose: Pin the accepted text grammar across wide input ranges.
// ============================================================================

//! Property-based tests for label and value validation.

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

use proptest::prelude::*;
use run_recorder_core::DefaultValue;
use run_recorder_core::Label;
use run_recorder_core::MeasureLimit;
use run_recorder_core::MeasureRef;
use run_recorder_core::MeasureValue;
use run_recorder_core::MetricLabel;
use run_recorder_core::StoreVersion;
use run_recorder_core::ValidationError;
use run_recorder_core::is_identifier;

proptest! {
    #[test]
    fn identifier_pattern_is_accepted(raw in "[A-Za-z][A-Za-z0-9_]{0,24}") {
        prop_assert!(is_identifier(&raw));
        let label = Label::parse(&raw).unwrap();
        prop_assert_eq!(label.as_str(), raw.as_str());
    }

    #[test]
    fn leading_non_letter_is_rejected(raw in "[0-9_][A-Za-z0-9_]{0,8}") {
        prop_assert_eq!(Label::parse(&raw), Err(ValidationError::InvalidLabel(raw.clone())));
        prop_assert!(MetricLabel::parse(&raw).is_err());
    }

    #[test]
    fn labels_with_foreign_characters_are_rejected(
        prefix in "[A-Za-z]{1,4}",
        bad in "[ .=&\"/-]",
        suffix in "[a-z]{0,4}"
    ) {
        let raw = format!("{prefix}{bad}{suffix}");
        prop_assert!(!is_identifier(&raw));
        prop_assert!(Label::parse(&raw).is_err());
    }

    #[test]
    fn values_without_forbidden_characters_are_accepted(raw in "[^\"=&]{1,32}") {
        prop_assert!(MeasureValue::parse("m", &raw).is_ok());
        prop_assert!(DefaultValue::parse(&raw).is_ok());
    }

    #[test]
    fn values_with_forbidden_characters_are_rejected(
        head in "[a-z0-9]{0,6}",
        bad in "[\"=&]",
        tail in "[a-z0-9]{0,6}"
    ) {
        let raw = format!("{head}{bad}{tail}");
        prop_assert_eq!(
            MeasureValue::parse("m", &raw),
            Err(ValidationError::InvalidValue { metric: "m".to_string(), value: raw.clone() })
        );
        prop_assert_eq!(DefaultValue::parse(&raw), Err(ValidationError::InvalidDefault(raw.clone())));
    }

    #[test]
    fn version_text_survives_display(major in 0u16 .. 100, minor in 0u16 .. 100, patch in 0u16 .. 100) {
        let version = StoreVersion::new(major, minor, patch);
        prop_assert_eq!(StoreVersion::parse(&version.to_string()).unwrap(), version);
    }
}

#[test]
fn reserved_metric_labels_are_rejected() {
    assert_eq!(
        MetricLabel::parse("project"),
        Err(ValidationError::ReservedLabel("project".to_string()))
    );
    assert_eq!(
        MetricLabel::parse("action"),
        Err(ValidationError::ReservedLabel("action".to_string()))
    );
    assert!(Label::parse("project").is_ok());
}

#[test]
fn empty_values_are_rejected() {
    assert!(DefaultValue::parse("").is_err());
    assert!(MeasureValue::parse("m", "").is_err());
    assert!(Label::parse("").is_err());
}

#[test]
fn stored_defaults_allow_legacy_separators() {
    assert_eq!(DefaultValue::from_stored("a=b").unwrap().as_str(), "a=b");
    assert_eq!(DefaultValue::from_stored("x&y").unwrap().as_str(), "x&y");
    assert!(DefaultValue::parse("a=b").is_err());
    assert!(DefaultValue::from_stored("").is_err());
    assert_eq!(
        DefaultValue::from_stored("say \"hi\""),
        Err(ValidationError::InvalidDefault("say \"hi\"".to_string()))
    );
}

#[test]
fn versions_compare_numerically() {
    let older = StoreVersion::parse("01.09.00").unwrap();
    let newer = StoreVersion::parse("01.10.00").unwrap();
    assert!(older < newer);
    assert_eq!(newer.to_string(), "01.10.00");
    assert!(StoreVersion::parse("1.0").is_err());
    assert!(StoreVersion::parse("01.00.00.00").is_err());
    assert!(StoreVersion::parse("01.x.00").is_err());
}

#[test]
fn measure_inputs_parse_from_client_text() {
    assert_eq!(MeasureLimit::parse("0").unwrap(), MeasureLimit::All);
    assert_eq!(MeasureLimit::parse("3").unwrap(), MeasureLimit::Last(3));
    assert_eq!(MeasureLimit::parse("-1").unwrap(), MeasureLimit::All);
    assert_eq!(MeasureLimit::parse("-9223372036854775808").unwrap(), MeasureLimit::All);
    assert!(MeasureLimit::parse("two").is_err());
    assert!(MeasureLimit::parse("1.5").is_err());
    assert_eq!(MeasureRef::parse("12").unwrap().get(), 12);
    assert!(MeasureRef::parse("0").is_err());
    assert!(MeasureRef::parse("abc").is_err());
}
