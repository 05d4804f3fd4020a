//! Event-matched extraction
//!
//! Used when an eye-tracker summary exists. MAIN events are taken from the
//! event log in file order; each one's CHOICE event is found positionally
//! (dilemma -> marker -> choice screen) and enriched from the behavioral log.

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::extract::outcome::derive_outcome;
use crate::schema::{Record, Table};
use crate::types::{
    Cell, DilemmaId, ExtractionPath, TrialOutcome, TrialTable, CANONICAL_COLUMNS, IS_CORRECT_COLUMN,
    KEY_PRESSED_COLUMN, PARTICIPANT_COLUMN, REACTION_TIME_COLUMN, RESPONSE_SIDE_COLUMN,
};
use tracing::{debug, warn};

/// Result of looking for the CHOICE event that follows a MAIN event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceLookup {
    /// Row index of the CHOICE event
    Found(usize),
    /// No marker row after the MAIN event
    NoMarker,
    /// Marker row found at this index but nothing follows it
    NoFollowingRow(usize),
}

/// Cursor over the event column of an event log.
///
/// Models the fixed screen sequence: from a MAIN row, advance to the next
/// marker row, then one more step to the choice screen.
pub struct SequenceCursor<'a> {
    events: Vec<Option<&'a str>>,
    position: usize,
}

impl<'a> SequenceCursor<'a> {
    pub fn new(events: Vec<Option<&'a str>>) -> Self {
        Self { events, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Place the cursor on row `index`
    pub fn seek(&mut self, index: usize) {
        self.position = index.min(self.events.len());
    }

    /// Advance past the current row to the next row containing `marker`
    pub fn advance_to_marker(&mut self, marker: &str) -> Option<usize> {
        let start = self.position + 1;
        let found = (start..self.events.len())
            .find(|&i| self.events[i].is_some_and(|e| e.contains(marker)));

        match found {
            Some(i) => {
                self.position = i;
                Some(i)
            }
            None => {
                self.position = self.events.len();
                None
            }
        }
    }

    /// Step onto the row after the current one
    pub fn step(&mut self) -> Option<usize> {
        let next = self.position + 1;
        if next < self.events.len() {
            self.position = next;
            Some(next)
        } else {
            None
        }
    }

    /// Locate the CHOICE row for the MAIN event at `main_index`
    pub fn locate_choice(&mut self, main_index: usize, marker: &str) -> ChoiceLookup {
        self.seek(main_index);
        let Some(marker_index) = self.advance_to_marker(marker) else {
            return ChoiceLookup::NoMarker;
        };
        match self.step() {
            Some(choice_index) => ChoiceLookup::Found(choice_index),
            None => ChoiceLookup::NoFollowingRow(marker_index),
        }
    }

    pub fn event_at(&self, index: usize) -> Option<&'a str> {
        self.events.get(index).copied().flatten()
    }
}

/// Build the normalized trial table from the event log, enriched by the behavioral log
pub fn extract_event_matched(
    behavior: &Table,
    events: &Table,
    participant: &str,
    config: &ReconcileConfig,
) -> Result<TrialTable, ReconcileError> {
    let event_col = events.require_column(&config.events.event_column)?;
    let stimulus_col = behavior.require_column(&config.behavior.stimulus)?;

    let layout = OutputLayout::new(events, event_col);
    let mut table = TrialTable::new(ExtractionPath::EventMatched, layout.columns());

    let mut cursor = SequenceCursor::new(events.records().map(|r| r.at(event_col)).collect());
    let main_indices: Vec<usize> = (0..events.len())
        .filter(|&i| {
            cursor
                .event_at(i)
                .is_some_and(|e| e.contains(config.events.main_marker.as_str()))
        })
        .collect();

    if main_indices.is_empty() {
        return Err(ReconcileError::NoTrials(format!(
            "no events containing '{}' in {}",
            config.events.main_marker, events.name
        )));
    }

    for main_index in main_indices {
        let Some(main_record) = events.record(main_index) else {
            continue;
        };
        table.rows.push(layout.row(main_record, participant, None));

        let main_event = cursor.event_at(main_index).unwrap_or_default();
        let Some(id) = DilemmaId::parse(main_event) else {
            warn!(
                file = %events.name,
                row = main_index,
                "{}",
                ReconcileError::UnparsableEventIdentifier(main_event.to_string())
            );
            continue;
        };

        let choice_index = match cursor.locate_choice(main_index, &config.events.sequence_marker) {
            ChoiceLookup::Found(index) => index,
            ChoiceLookup::NoMarker => {
                warn!(
                    "{}",
                    ReconcileError::SequenceMismatch {
                        main_event: main_event.to_string(),
                        reason: format!("no '{}' row follows", config.events.sequence_marker),
                    }
                );
                continue;
            }
            ChoiceLookup::NoFollowingRow(marker_index) => {
                warn!(
                    "{}",
                    ReconcileError::SequenceMismatch {
                        main_event: main_event.to_string(),
                        reason: format!("marker at row {} is the last row", marker_index),
                    }
                );
                continue;
            }
        };

        let choice_event = cursor.event_at(choice_index);
        if !choice_event.is_some_and(|e| e.contains(&id.choice_fragment())) {
            warn!(
                "{}",
                ReconcileError::SequenceMismatch {
                    main_event: main_event.to_string(),
                    reason: format!(
                        "row {} is '{}', expected {}",
                        choice_index,
                        choice_event.unwrap_or_default(),
                        id.choice_fragment()
                    ),
                }
            );
            continue;
        }

        let outcome = behavior
            .records()
            .find(|r| r.at(stimulus_col).is_some_and(|s| id.matches_stimulus(s)))
            .map(|r| derive_outcome(r, &config.behavior, &config.keys));
        if outcome.is_none() {
            debug!(dilemma = %id, "no behavioral row for dilemma; outcome left empty");
        }

        let Some(choice_record) = events.record(choice_index) else {
            continue;
        };
        table.rows.push(layout.row(
            choice_record,
            participant,
            Some(outcome.unwrap_or_default()),
        ));
    }

    Ok(table)
}

/// Canonical prefix followed by every other event-log column
struct OutputLayout {
    event_col: usize,
    participant_col: Option<usize>,
    /// Event-log columns that share a name with an enrichment column
    enrichment_cols: [Option<usize>; 4],
    passthrough: Vec<(String, usize)>,
}

impl OutputLayout {
    fn new(events: &Table, event_col: usize) -> Self {
        let passthrough = events
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !CANONICAL_COLUMNS.contains(&h.as_str()))
            .map(|(i, h)| (h.clone(), i))
            .collect();

        Self {
            event_col,
            participant_col: events.column(PARTICIPANT_COLUMN),
            enrichment_cols: [
                events.column(KEY_PRESSED_COLUMN),
                events.column(RESPONSE_SIDE_COLUMN),
                events.column(IS_CORRECT_COLUMN),
                events.column(REACTION_TIME_COLUMN),
            ],
            passthrough,
        }
    }

    fn columns(&self) -> Vec<String> {
        CANONICAL_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.passthrough.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    /// One output row from an event-log record.
    ///
    /// CHOICE rows pass `Some(outcome)`, which replaces the enrichment cells;
    /// MAIN rows keep whatever the event log had under those names.
    fn row(&self, record: Record<'_>, participant: &str, outcome: Option<TrialOutcome>) -> Vec<Cell> {
        let participant = match self.participant_col {
            Some(col) => Cell::text(record.at(col)),
            None => Cell::Text(participant.to_string()),
        };

        let mut row = Vec::with_capacity(CANONICAL_COLUMNS.len() + self.passthrough.len());
        row.push(participant);
        row.push(Cell::text(record.at(self.event_col)));

        match outcome {
            Some(outcome) => {
                row.push(Cell::text(outcome.key_pressed.as_deref()));
                row.push(Cell::text(outcome.response_side.map(|s| s.as_str())));
                row.push(Cell::boolean(outcome.is_correct));
                row.push(Cell::float(outcome.reaction_time_s));
            }
            None => {
                row.extend(
                    self.enrichment_cols
                        .iter()
                        .map(|col| Cell::text(col.and_then(|c| record.at(c)))),
                );
            }
        }

        row.extend(
            self.passthrough
                .iter()
                .map(|(_, col)| Cell::text(record.at(*col))),
        );
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_warnings;
    use crate::types::EVENT_COLUMN;
    use pretty_assertions::assert_eq;

    const BEHAVIOR: &str = "participant,main_img,key_resp.keys,correct,Dilemma.stopped,left_choice_image.started,right_choice_image.started\n\
        P01,images/dilemma_trolley_main_3.jpg,z,left,5.2,3.0,3.4\n\
        P01,images/dilemma_bridge_main_1.jpg,m,left,9.0,7.0,7.0\n";

    fn behavior() -> Table {
        Table::from_reader("psychopy.csv", BEHAVIOR.as_bytes()).unwrap()
    }

    fn events(rows: &[&str]) -> Table {
        let mut csv = String::from("time,event,fixation_count\n");
        for (i, event) in rows.iter().enumerate() {
            csv.push_str(&format!("{}.25,{},{}\n", i, event, i * 2));
        }
        Table::from_reader("summary_P01.csv", csv.as_bytes()).unwrap()
    }

    fn event_column(table: &TrialTable) -> Vec<String> {
        (0..table.len())
            .map(|i| {
                table
                    .cell(i, EVENT_COLUMN)
                    .and_then(Cell::as_text)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_cursor_two_step_lookahead() {
        let mut cursor = SequenceCursor::new(vec![
            Some("dilemma_a_main_1_start"),
            Some("fixation"),
            Some("red_dot_start"),
            Some("dilemma_a_choice_1_start"),
        ]);
        assert_eq!(cursor.locate_choice(0, "red_dot_start"), ChoiceLookup::Found(3));
        assert_eq!(cursor.position(), 3);

        let mut cursor = SequenceCursor::new(vec![Some("dilemma_a_main_1_start"), None]);
        assert_eq!(cursor.locate_choice(0, "red_dot_start"), ChoiceLookup::NoMarker);

        let mut cursor = SequenceCursor::new(vec![Some("main"), Some("red_dot_start")]);
        assert_eq!(cursor.locate_choice(0, "red_dot_start"), ChoiceLookup::NoFollowingRow(1));
    }

    #[test]
    fn test_matched_sequence() {
        let events = events(&[
            "images/Main/All/dilemma_trolley_main_3.jpg_start",
            "images/red_dot_start",
            "images/Buttons/All_Buttons/dilemma_trolley_choice_3.jpg_start",
            "images/Main/All/dilemma_bridge_main_1.jpg_start",
            "images/red_dot_start",
            "images/Buttons/All_Buttons/dilemma_bridge_choice_1.jpg_start",
        ]);
        let out = extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap();

        assert_eq!(
            out.columns,
            vec![
                "participant",
                "event",
                "key_pressed",
                "response_side",
                "is_correct",
                "reaction_time_custom_s",
                "time",
                "fixation_count",
            ]
        );
        assert_eq!(
            event_column(&out),
            vec![
                "images/Main/All/dilemma_trolley_main_3.jpg_start",
                "images/Buttons/All_Buttons/dilemma_trolley_choice_3.jpg_start",
                "images/Main/All/dilemma_bridge_main_1.jpg_start",
                "images/Buttons/All_Buttons/dilemma_bridge_choice_1.jpg_start",
            ]
        );

        assert_eq!(out.cell(1, RESPONSE_SIDE_COLUMN), Some(&Cell::Text("left".to_string())));
        assert_eq!(out.cell(1, IS_CORRECT_COLUMN), Some(&Cell::Bool(true)));
        assert_eq!(out.cell(3, RESPONSE_SIDE_COLUMN), Some(&Cell::Text("right".to_string())));
        assert_eq!(out.cell(3, IS_CORRECT_COLUMN), Some(&Cell::Bool(false)));

        // passthrough columns keep the original event-log values
        assert_eq!(out.cell(2, "time"), Some(&Cell::Text("3.25".to_string())));
        assert_eq!(out.cell(2, "fixation_count"), Some(&Cell::Text("6".to_string())));
        // participant comes from the behavioral log when the event log has none
        assert_eq!(out.cell(0, PARTICIPANT_COLUMN), Some(&Cell::Text("P01".to_string())));
    }

    #[test]
    fn test_missing_marker_keeps_main_only() {
        let events = events(&[
            "images/Main/All/dilemma_trolley_main_3.jpg_start",
            "images/Buttons/All_Buttons/dilemma_trolley_choice_3.jpg_start",
        ]);
        let (out, logs) = capture_warnings(|| {
            extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap()
        });

        assert_eq!(
            event_column(&out),
            vec!["images/Main/All/dilemma_trolley_main_3.jpg_start"]
        );
        assert!(logs.contains("WARN"), "no warning logged: {logs}");
        assert!(logs.contains("Sequence mismatch for images/Main/All/dilemma_trolley_main_3.jpg_start"));
        assert!(logs.contains("no 'red_dot_start' row follows"));

        let mut cursor = SequenceCursor::new(events.rows.iter().map(|r| r[1].as_deref()).collect());
        assert_eq!(cursor.locate_choice(0, "red_dot_start"), ChoiceLookup::NoMarker);
    }

    #[test]
    fn test_sequence_mismatch_drops_choice() {
        let events = events(&[
            "images/Main/All/dilemma_trolley_main_3.jpg_start",
            "images/red_dot_start",
            "images/Buttons/All_Buttons/dilemma_bridge_choice_1.jpg_start",
        ]);
        let out = extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_unmatched_behavior_nulls_enrichment() {
        let events = events(&[
            "images/Main/All/dilemma_lifeboat_main_2.jpg_start",
            "images/red_dot_start",
            "images/Buttons/All_Buttons/dilemma_lifeboat_choice_2.jpg_start",
        ]);
        let out = extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap();

        assert_eq!(out.len(), 2);
        for column in [KEY_PRESSED_COLUMN, RESPONSE_SIDE_COLUMN, IS_CORRECT_COLUMN, REACTION_TIME_COLUMN] {
            assert_eq!(out.cell(1, column), Some(&Cell::Missing));
        }
        assert_eq!(out.cell(1, "fixation_count"), Some(&Cell::Text("4".to_string())));
    }

    #[test]
    fn test_unparsable_main_emitted_without_choice() {
        let events = events(&[
            "images/Main/All/practice_main_x.jpg_start",
            "images/red_dot_start",
            "images/Buttons/All_Buttons/practice_choice_x.jpg_start",
        ]);
        let out = extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap();
        assert_eq!(
            event_column(&out),
            vec!["images/Main/All/practice_main_x.jpg_start"]
        );
    }

    #[test]
    fn test_no_main_events_is_no_trials() {
        let events = events(&["images/red_dot_start", "fixation"]);
        let err = extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::NoTrials(_)));
    }

    #[test]
    fn test_event_log_participant_column_is_used() {
        let csv = "participant,event\n\
                   ET-9,images/Main/All/dilemma_trolley_main_3.jpg_start\n\
                   ET-9,images/red_dot_start\n\
                   ET-9,images/Buttons/All_Buttons/dilemma_trolley_choice_3.jpg_start\n";
        let events = Table::from_reader("summary.csv", csv.as_bytes()).unwrap();
        let out = extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap();

        assert_eq!(out.columns.len(), 6);
        assert_eq!(out.cell(1, PARTICIPANT_COLUMN), Some(&Cell::Text("ET-9".to_string())));
        assert_eq!(out.cell(1, KEY_PRESSED_COLUMN), Some(&Cell::Text("z".to_string())));
    }

    #[test]
    fn test_event_log_outcome_columns_kept_on_main_replaced_on_choice() {
        let csv = "event,key_pressed,response_side,is_correct,reaction_time_custom_s\n\
                   images/Main/All/dilemma_trolley_main_3.jpg_start,x,right,False,9.5\n\
                   images/red_dot_start,,,,\n\
                   images/Buttons/All_Buttons/dilemma_trolley_choice_3.jpg_start,q,right,False,9.5\n";
        let events = Table::from_reader("summary.csv", csv.as_bytes()).unwrap();
        let out = extract_event_matched(&behavior(), &events, "P01", &ReconcileConfig::default()).unwrap();

        assert_eq!(out.columns, CANONICAL_COLUMNS.to_vec());
        assert_eq!(out.len(), 2);

        // MAIN row keeps the event-log values
        assert_eq!(out.cell(0, KEY_PRESSED_COLUMN), Some(&Cell::Text("x".to_string())));
        assert_eq!(out.cell(0, RESPONSE_SIDE_COLUMN), Some(&Cell::Text("right".to_string())));
        assert_eq!(out.cell(0, IS_CORRECT_COLUMN), Some(&Cell::Text("False".to_string())));
        assert_eq!(out.cell(0, REACTION_TIME_COLUMN), Some(&Cell::Text("9.5".to_string())));

        // CHOICE row carries the derived outcome
        assert_eq!(out.cell(1, KEY_PRESSED_COLUMN), Some(&Cell::Text("z".to_string())));
        assert_eq!(out.cell(1, RESPONSE_SIDE_COLUMN), Some(&Cell::Text("left".to_string())));
        assert_eq!(out.cell(1, IS_CORRECT_COLUMN), Some(&Cell::Bool(true)));
        match out.cell(1, REACTION_TIME_COLUMN) {
            Some(Cell::Float(rt)) => assert!((rt - 2.0).abs() < 1e-9),
            other => panic!("unexpected reaction time cell: {:?}", other),
        }
    }
}
