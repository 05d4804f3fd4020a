//! Core types for the Dilemma Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: dilemma identifiers, derived trial outcomes, and the normalized
//! output table.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Column names of the canonical output prefix, in output order
pub const PARTICIPANT_COLUMN: &str = "participant";
pub const EVENT_COLUMN: &str = "event";
pub const KEY_PRESSED_COLUMN: &str = "key_pressed";
pub const RESPONSE_SIDE_COLUMN: &str = "response_side";
pub const IS_CORRECT_COLUMN: &str = "is_correct";
pub const REACTION_TIME_COLUMN: &str = "reaction_time_custom_s";

/// Fixed schema prefix shared by both extraction paths
pub const CANONICAL_COLUMNS: [&str; 6] = [
    PARTICIPANT_COLUMN,
    EVENT_COLUMN,
    KEY_PRESSED_COLUMN,
    RESPONSE_SIDE_COLUMN,
    IS_CORRECT_COLUMN,
    REACTION_TIME_COLUMN,
];

fn dilemma_re() -> &'static Regex {
    static DILEMMA_RE: OnceLock<Regex> = OnceLock::new();
    DILEMMA_RE.get_or_init(|| {
        Regex::new(r"dilemma_(.*?)_main_(\d+)").expect("valid dilemma identifier regex")
    })
}

/// Identifier of one dilemma trial: `{dilemma_type, dilemma_number}`
///
/// The number is kept as written so leading zeros survive into the
/// synthesized event names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DilemmaId {
    pub dilemma_type: String,
    pub dilemma_number: String,
}

impl DilemmaId {
    pub fn new(dilemma_type: impl Into<String>, dilemma_number: impl Into<String>) -> Self {
        Self {
            dilemma_type: dilemma_type.into(),
            dilemma_number: dilemma_number.into(),
        }
    }

    /// Find the first `dilemma_<type>_main_<number>` occurrence in `text`
    pub fn parse(text: &str) -> Option<Self> {
        let caps = dilemma_re().captures(text)?;
        Some(Self::new(&caps[1], &caps[2]))
    }

    /// Canonical onset-event name for this dilemma
    pub fn main_event_name(&self) -> String {
        format!(
            "images/Main/All/dilemma_{}_main_{}.jpg_start",
            self.dilemma_type, self.dilemma_number
        )
    }

    /// Canonical choice-screen event name for this dilemma
    pub fn choice_event_name(&self) -> String {
        format!(
            "images/Buttons/All_Buttons/dilemma_{}_choice_{}.jpg_start",
            self.dilemma_type, self.dilemma_number
        )
    }

    /// Substring a CHOICE event must contain to belong to this dilemma
    pub fn choice_fragment(&self) -> String {
        format!("dilemma_{}_choice_{}", self.dilemma_type, self.dilemma_number)
    }

    /// Substring identifying this dilemma in a behavioral stimulus field
    pub fn stimulus_fragment(&self) -> String {
        format!("{}_main_{}", self.dilemma_type, self.dilemma_number)
    }

    /// Whether a behavioral stimulus field refers to this dilemma.
    ///
    /// The number must not continue with another digit, so `_main_1` does not
    /// claim the stimulus of `_main_10`.
    pub fn matches_stimulus(&self, stimulus: &str) -> bool {
        let fragment = self.stimulus_fragment();
        stimulus.match_indices(&fragment).any(|(start, _)| {
            !stimulus[start + fragment.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
    }
}

impl fmt::Display for DilemmaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.dilemma_type, self.dilemma_number)
    }
}

/// Side of the screen the participant chose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSide {
    Left,
    Right,
}

impl ResponseSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSide::Left => "left",
            ResponseSide::Right => "right",
        }
    }
}

/// Interpretation of a ground-truth correctness label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruth {
    /// Label names exactly one side
    Side(ResponseSide),
    /// Label names both sides; correctness cannot be decided
    Ambiguous,
    /// Label names no side at all
    Unrecognized,
}

impl GroundTruth {
    pub fn from_label(label: &str) -> Self {
        match (label.contains("left"), label.contains("right")) {
            (true, true) => GroundTruth::Ambiguous,
            (true, false) => GroundTruth::Side(ResponseSide::Left),
            (false, true) => GroundTruth::Side(ResponseSide::Right),
            (false, false) => GroundTruth::Unrecognized,
        }
    }
}

/// Behavioral outcome of one trial. Every field may be absent on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub key_pressed: Option<String>,
    pub response_side: Option<ResponseSide>,
    pub is_correct: Option<bool>,
    pub reaction_time_s: Option<f64>,
}

/// Which extraction path produced a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    BehaviorOnly,
    EventMatched,
}

impl ExtractionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionPath::BehaviorOnly => "behavior_only",
            ExtractionPath::EventMatched => "event_matched",
        }
    }
}

/// One cell of the normalized output table
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Float(f64),
    Bool(bool),
}

impl Cell {
    pub fn text(value: Option<&str>) -> Self {
        value.map_or(Cell::Missing, |v| Cell::Text(v.to_string()))
    }

    pub fn float(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::Float)
    }

    pub fn boolean(value: Option<bool>) -> Self {
        value.map_or(Cell::Missing, Cell::Bool)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Normalized per-participant trial table: fixed prefix plus passthrough columns
#[derive(Debug, Clone, PartialEq)]
pub struct TrialTable {
    pub path: ExtractionPath,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TrialTable {
    pub fn new(path: ExtractionPath, columns: Vec<String>) -> Self {
        Self {
            path,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in column `name`, if both exist
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let col = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dilemma_id() {
        let id = DilemmaId::parse("images/Main/All/dilemma_trolley_main_3.jpg").unwrap();
        assert_eq!(id.dilemma_type, "trolley");
        assert_eq!(id.dilemma_number, "3");

        assert!(DilemmaId::parse("images/red_dot.png").is_none());
        assert!(DilemmaId::parse("dilemma_trolley_main_.jpg").is_none());
    }

    #[test]
    fn test_parse_keeps_type_with_underscores() {
        let id = DilemmaId::parse("dilemma_foot_bridge_main_07_start").unwrap();
        assert_eq!(id.dilemma_type, "foot_bridge");
        assert_eq!(id.dilemma_number, "07");
    }

    #[test]
    fn test_event_names() {
        let id = DilemmaId::new("trolley", "3");
        assert_eq!(
            id.main_event_name(),
            "images/Main/All/dilemma_trolley_main_3.jpg_start"
        );
        assert_eq!(
            id.choice_event_name(),
            "images/Buttons/All_Buttons/dilemma_trolley_choice_3.jpg_start"
        );
        assert_eq!(id.choice_fragment(), "dilemma_trolley_choice_3");
    }

    #[test]
    fn test_matches_stimulus_respects_number_boundary() {
        let one = DilemmaId::new("trolley", "1");
        assert!(one.matches_stimulus("images/dilemma_trolley_main_1.jpg"));
        assert!(!one.matches_stimulus("images/dilemma_trolley_main_10.jpg"));
        assert!(one.matches_stimulus("dilemma_trolley_main_10_dilemma_trolley_main_1"));
        assert!(!one.matches_stimulus("dilemma_bridge_main_1.jpg"));
    }

    #[test]
    fn test_ground_truth_from_label() {
        assert_eq!(
            GroundTruth::from_label("left"),
            GroundTruth::Side(ResponseSide::Left)
        );
        assert_eq!(
            GroundTruth::from_label("right_choice"),
            GroundTruth::Side(ResponseSide::Right)
        );
        assert_eq!(GroundTruth::from_label("left|right"), GroundTruth::Ambiguous);
        assert_eq!(GroundTruth::from_label("none"), GroundTruth::Unrecognized);
    }
}
