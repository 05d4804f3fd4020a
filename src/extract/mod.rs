//! Trial extraction
//!
//! Turns one participant's behavioral log, and optionally their eye-tracker
//! event summary, into a normalized trial table.
//!
//! Paths: behavioral log only -> `behavior_only`; both logs -> `event_matched`.
//! Both share the outcome derivation in `outcome`.

pub mod behavior_only;
pub mod event_matched;
pub mod outcome;

pub use behavior_only::extract_behavior_only;
pub use event_matched::{extract_event_matched, ChoiceLookup, SequenceCursor};
pub use outcome::derive_outcome;

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::schema::Table;
use crate::types::TrialTable;

/// Read the participant identifier from the first candidate column that has a value
pub fn participant_id<S: AsRef<str>>(behavior: &Table, candidates: &[S]) -> Result<String, ReconcileError> {
    behavior
        .first_value_of(candidates)
        .map(|id| id.trim().to_string())
        .ok_or_else(|| ReconcileError::MissingIdentifierColumn {
            file: behavior.name.clone(),
            candidates: candidates
                .iter()
                .map(|c| format!("'{}'", c.as_ref()))
                .collect::<Vec<_>>()
                .join(" or "),
        })
}

/// Pure extraction of trial tables, parameterized by configuration
#[derive(Debug, Clone, Default)]
pub struct TrialExtractor {
    config: ReconcileConfig,
}

impl TrialExtractor {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Extract the trial table for one participant.
    ///
    /// The event-matched path runs when `events` is present, the
    /// behavior-only path otherwise.
    pub fn extract(&self, behavior: &Table, events: Option<&Table>) -> Result<TrialTable, ReconcileError> {
        let participant = participant_id(behavior, &self.config.behavior.identifier_candidates)?;

        match events {
            Some(events) => extract_event_matched(behavior, events, &participant, &self.config),
            None => extract_behavior_only(behavior, &participant, &self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, ExtractionPath, PARTICIPANT_COLUMN};

    #[test]
    fn test_participant_from_alternate_column() {
        let behavior = Table::from_reader("b.csv", "ID,main_img\n,x\n S12 ,y\n".as_bytes()).unwrap();
        assert_eq!(participant_id(&behavior, &["participant", "ID"]).unwrap(), "S12");
    }

    #[test]
    fn test_participant_column_takes_priority() {
        let behavior = Table::from_reader("b.csv", "ID,participant\nS1,P1\n".as_bytes()).unwrap();
        assert_eq!(participant_id(&behavior, &["participant", "ID"]).unwrap(), "P1");
    }

    #[test]
    fn test_missing_identifier_column() {
        let behavior = Table::from_reader("b.csv", "main_img\nx\n".as_bytes()).unwrap();
        let err = participant_id(&behavior, &["participant", "ID"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No identifier column ('participant' or 'ID') with a value in b.csv"
        );
    }

    #[test]
    fn test_extractor_selects_path() {
        let behavior = Table::from_reader(
            "b.csv",
            "participant,main_img\nP7,dilemma_trolley_main_3.jpg\n".as_bytes(),
        )
        .unwrap();
        let events = Table::from_reader(
            "summary.csv",
            "event\ndilemma_trolley_main_3.jpg_start\n".as_bytes(),
        )
        .unwrap();
        let extractor = TrialExtractor::default();

        let only = extractor.extract(&behavior, None).unwrap();
        assert_eq!(only.path, ExtractionPath::BehaviorOnly);
        assert_eq!(only.len(), 2);
        assert_eq!(only.cell(0, PARTICIPANT_COLUMN), Some(&Cell::Text("P7".to_string())));

        let matched = extractor.extract(&behavior, Some(&events)).unwrap();
        assert_eq!(matched.path, ExtractionPath::EventMatched);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let behavior = Table::from_reader(
            "b.csv",
            "participant,main_img,key_resp.keys\nP7,dilemma_a_main_1.jpg,z\nP7,dilemma_b_main_2.jpg,m\n".as_bytes(),
        )
        .unwrap();
        let extractor = TrialExtractor::default();
        assert_eq!(
            extractor.extract(&behavior, None).unwrap(),
            extractor.extract(&behavior, None).unwrap()
        );
    }
}
