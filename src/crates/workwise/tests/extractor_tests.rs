//! Integration tests for step extraction from model output.

use proptest::prelude::*;
use workwise::{extract, ExtractionErrorKind, WorkflowStep};

fn step_strategy() -> impl Strategy<Value = WorkflowStep> {
    ("[A-Za-z][A-Za-z ]{0,40}", 1u8..=10, "[A-Za-z0-9 .,:\"\\[\\]]{0,60}").prop_map(
        |(summary, score, explanation)| WorkflowStep::new(summary, f64::from(score), explanation),
    )
}

proptest! {
    #[test]
    fn prop_extracts_every_step_in_order(
        steps in prop::collection::vec(step_strategy(), 0..8),
        preamble in "[^\\[]{0,80}",
        trailer in "[^\\[]{0,80}",
    ) {
        let json = serde_json::to_string_pretty(&steps).unwrap();
        let raw = format!("{}{}{}", preamble, json, trailer);

        let extracted = extract(&raw).unwrap();
        prop_assert_eq!(extracted, steps);
    }

    #[test]
    fn prop_text_without_bracket_has_no_array(text in "[^\\[]{0,200}") {
        let err = extract(&text).unwrap_err();
        prop_assert_eq!(err.kind, ExtractionErrorKind::NoArrayFound);
    }

    #[test]
    fn prop_non_json_brackets_are_malformed(
        preamble in "[^\\[]{0,40}",
        word in "[a-z]{1,12}",
    ) {
        let raw = format!("{}[x{}]", preamble, word);
        let err = extract(&raw).unwrap_err();
        prop_assert_eq!(err.kind, ExtractionErrorKind::MalformedJson);
    }

    #[test]
    fn prop_extract_is_idempotent(text in "\\PC{0,200}") {
        prop_assert_eq!(extract(&text), extract(&text));
    }
}

#[test]
fn test_marker_then_array() {
    let raw = "Some preamble\n[JSON Output]\n[{\"step_summary\":\"Receive order\",\"efficiency_score\":6,\"explanation\":\"Manual entry delays processing.\"}]";
    let steps = extract(raw).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step_summary, "Receive order");
    assert_eq!(steps[0].efficiency_score, 6.0);
}

#[test]
fn test_no_json_at_all() {
    let err = extract("No JSON here at all.").unwrap_err();
    assert_eq!(err.kind, ExtractionErrorKind::NoArrayFound);
}

#[test]
fn test_missing_explanation_rejects_batch() {
    let err = extract(r#"[{"step_summary":"A","efficiency_score":3}]"#).unwrap_err();
    assert_eq!(err.kind, ExtractionErrorKind::MissingFields);
    assert!(err.detail.contains("explanation"));

    let mixed = r#"[
        {"step_summary":"A","efficiency_score":3,"explanation":"ok"},
        {"step_summary":"B","efficiency_score":4}
    ]"#;
    assert_eq!(extract(mixed).unwrap_err().kind, ExtractionErrorKind::MissingFields);
}

#[test]
fn test_truncated_output_is_malformed() {
    let raw = r#"Here you go: [{"step_summary":"A","efficiency_score":3,"explanation":"cut o"#;
    assert_eq!(extract(raw).unwrap_err().kind, ExtractionErrorKind::MalformedJson);
}

#[test]
fn test_fenced_block_with_trailing_prose() {
    let raw = "```json\n[{\"step_summary\":\"Ship [priority] goods\",\"efficiency_score\":8.5,\"explanation\":\"Uses \\\"]\\\" in text\"}]\n```\nLet me know if you need more.";
    let steps = extract(raw).unwrap();
    assert_eq!(steps[0].step_summary, "Ship [priority] goods");
    assert_eq!(steps[0].explanation, "Uses \"]\" in text");
    assert_eq!(steps[0].efficiency_score, 8.5);
}
