//! Recovering workflow steps from free-form model output.
//!
//! Models wrap their JSON in prose, code fences and labels such as
//! `[JSON Output]`. [`extract`] finds the first `[` that opens a parsable JSON
//! array, cuts it at the structurally matching `]` and validates every element.

use crate::error::ExtractionError;
use crate::step::WorkflowStep;
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use tracing::{debug, warn};

const REQUIRED_KEYS: [&str; 3] = ["step_summary", "efficiency_score", "explanation"];

/// Scale the scorer is asked to use.
const SCORE_SCALE: RangeInclusive<f64> = 1.0..=10.0;

/// Bracketed spans tried before giving up. Each try may scan to the end of
/// the text, so this keeps bracket-heavy input linear.
const MAX_CANDIDATES: usize = 256;

/// Extract the workflow steps embedded in `raw`.
///
/// Returns the steps in the order they appear in the array. Pure: the same
/// input always gives the same output.
///
/// # Errors
///
/// - `no_array_found` when the text has no `[` at all
/// - `malformed_json` when no bracketed span parses as a JSON array, including
///   truncated output whose array never closes, or when too many `[` precede it
/// - `missing_fields` when any element lacks a required key; the whole batch
///   is rejected
pub fn extract(raw: &str) -> Result<Vec<WorkflowStep>, ExtractionError> {
    if !raw.contains('[') {
        return Err(ExtractionError::no_array_found());
    }

    let mut last_problem = None;
    let mut search_from = 0;
    let mut candidates = 0;

    while let Some(offset) = raw[search_from..].find('[') {
        let start = search_from + offset;
        search_from = start + 1;

        candidates += 1;
        if candidates > MAX_CANDIDATES {
            last_problem = Some(format!("gave up after {} bracketed candidates", MAX_CANDIDATES));
            break;
        }

        let Some(end) = matching_bracket(raw, start) else {
            last_problem = Some(format!("array opened at byte {} never closes", start));
            continue;
        };

        match serde_json::from_str::<Value>(&raw[start..=end]) {
            Ok(Value::Array(items)) => {
                debug!(start, end, elements = items.len(), "found JSON array in model output");
                return items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| to_step(index, item))
                    .collect();
            }
            Ok(_) => {
                last_problem = Some(format!("bracketed text at byte {} is not an array", start));
            }
            Err(e) => {
                last_problem = Some(format!("bracketed text at byte {} is not valid JSON: {}", start, e));
            }
        }
    }

    Err(ExtractionError::malformed_json(
        last_problem.unwrap_or_else(|| "no parsable JSON array".to_string()),
    ))
}

/// Byte index of the `]` closing the `[` at `start`, skipping brackets that
/// sit inside JSON string literals.
fn matching_bracket(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn to_step(index: usize, item: &Value) -> Result<WorkflowStep, ExtractionError> {
    let obj = item.as_object().ok_or_else(|| {
        ExtractionError::missing_fields(format!("element {} is not an object", index))
    })?;

    if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !obj.contains_key(**key)) {
        return Err(ExtractionError::missing_fields(format!(
            "element {} is missing '{}'",
            index, missing
        )));
    }

    let efficiency_score = obj["efficiency_score"].as_f64().ok_or_else(|| {
        ExtractionError::missing_fields(format!(
            "element {} has a non-numeric 'efficiency_score'",
            index
        ))
    })?;
    if !SCORE_SCALE.contains(&efficiency_score) {
        warn!(index, efficiency_score, "efficiency score outside the 1 to 10 scale");
    }

    Ok(WorkflowStep {
        step_summary: string_field(obj, index, "step_summary")?,
        efficiency_score,
        explanation: string_field(obj, index, "explanation")?,
    })
}

fn string_field(obj: &Map<String, Value>, index: usize, key: &str) -> Result<String, ExtractionError> {
    obj[key].as_str().map(str::to_string).ok_or_else(|| {
        ExtractionError::missing_fields(format!("element {} has a non-string '{}'", index, key))
    })
}
