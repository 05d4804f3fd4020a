//! Trial outcome derivation
//!
//! Recovers key press, response side, correctness and reaction time from one
//! behavioral-log row. Missing inputs never raise; they leave the matching
//! output field absent.

use crate::config::{BehaviorColumns, ResponseKeys};
use crate::schema::Record;
use crate::types::{GroundTruth, ResponseSide, TrialOutcome};

/// Derive the full outcome of the trial recorded in `record`
pub fn derive_outcome(
    record: Record<'_>,
    columns: &BehaviorColumns,
    keys: &ResponseKeys,
) -> TrialOutcome {
    let key_pressed = record.get(&columns.key_response);
    let response_side = key_pressed.and_then(|k| response_side(k, keys));
    let is_correct = correctness(record.get(&columns.correct_label), response_side);
    let reaction_time_s = reaction_time(
        record.number(&columns.choice_stopped),
        record.number(&columns.left_shown),
        record.number(&columns.right_shown),
    );

    TrialOutcome {
        key_pressed: key_pressed.map(str::to_string),
        response_side,
        is_correct,
        reaction_time_s,
    }
}

/// Side implied by a key-press string. The left token is checked first.
pub fn response_side(key_pressed: &str, keys: &ResponseKeys) -> Option<ResponseSide> {
    if key_pressed.contains(keys.left.as_str()) {
        Some(ResponseSide::Left)
    } else if key_pressed.contains(keys.right.as_str()) {
        Some(ResponseSide::Right)
    } else {
        None
    }
}

/// Whether the response matches the ground-truth label.
///
/// Absent unless both inputs are present and the label is unambiguous.
pub fn correctness(label: Option<&str>, side: Option<ResponseSide>) -> Option<bool> {
    let side = side?;
    match GroundTruth::from_label(label?) {
        GroundTruth::Side(expected) => Some(expected == side),
        GroundTruth::Ambiguous => None,
        GroundTruth::Unrecognized => Some(false),
    }
}

/// Reaction time in seconds: choice stop minus the mean onset of both options
pub fn reaction_time(stop: Option<f64>, left_shown: Option<f64>, right_shown: Option<f64>) -> Option<f64> {
    Some(stop? - (left_shown? + right_shown?) / 2.0)
}
