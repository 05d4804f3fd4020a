//! Behavior-only extraction
//!
//! Used when a participant has no eye-tracker summary. Each dilemma row of the
//! behavioral log becomes a synthesized MAIN row followed by a CHOICE row
//! carrying the derived outcome.

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::extract::outcome::derive_outcome;
use crate::schema::Table;
use crate::types::{Cell, DilemmaId, ExtractionPath, TrialOutcome, TrialTable, CANONICAL_COLUMNS};
use tracing::{debug, warn};

/// Build the normalized trial table from the behavioral log alone
pub fn extract_behavior_only(
    behavior: &Table,
    participant: &str,
    config: &ReconcileConfig,
) -> Result<TrialTable, ReconcileError> {
    let stimulus_col = behavior.require_column(&config.behavior.stimulus)?;

    let columns = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut table = TrialTable::new(ExtractionPath::BehaviorOnly, columns);

    for record in behavior.records() {
        let Some(stimulus) = record.at(stimulus_col) else {
            continue;
        };
        let token = config.tutorial_token.as_str();
        if !token.is_empty() && stimulus.contains(token) {
            debug!(row = record.index(), stimulus, "skipping tutorial stimulus");
            continue;
        }

        let Some(id) = DilemmaId::parse(stimulus) else {
            warn!(
                file = %behavior.name,
                row = record.index(),
                stimulus,
                "{}",
                ReconcileError::UnparsableEventIdentifier(stimulus.to_string())
            );
            continue;
        };

        table.rows.push(main_row(participant, &id));
        let outcome = derive_outcome(record, &config.behavior, &config.keys);
        table.rows.push(choice_row(participant, &id, &outcome));
    }

    Ok(table)
}

fn main_row(participant: &str, id: &DilemmaId) -> Vec<Cell> {
    vec![
        Cell::Text(participant.to_string()),
        Cell::Text(id.main_event_name()),
        Cell::Missing,
        Cell::Missing,
        Cell::Missing,
        Cell::Missing,
    ]
}

fn choice_row(participant: &str, id: &DilemmaId, outcome: &TrialOutcome) -> Vec<Cell> {
    vec![
        Cell::Text(participant.to_string()),
        Cell::Text(id.choice_event_name()),
        Cell::text(outcome.key_pressed.as_deref()),
        Cell::text(outcome.response_side.map(|s| s.as_str())),
        Cell::boolean(outcome.is_correct),
        Cell::float(outcome.reaction_time_s),
    ]
}
