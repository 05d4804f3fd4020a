//! Dilemma Flux - Trial reconciliation for moral-dilemma experiments
//!
//! Flux merges a participant's stimulus-engine trial log with their optional
//! eye-tracker event summary into one normalized table: a MAIN (onset) row and
//! a CHOICE (response) row per dilemma, with key press, response side,
//! correctness and reaction time.
//!
//! ## Modules
//!
//! - **Extraction**: behavior-only and event-matched trial extraction
//! - **Session driver**: per-participant batch processing and output files

pub mod config;
pub mod encoder;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::ReconcileConfig;
pub use encoder::TableEncoder;
pub use error::ReconcileError;
pub use extract::TrialExtractor;
pub use pipeline::{reconcile_csv, SessionDriver};
pub use report::{RunReport, UnitReport, UnitStatus};
pub use schema::Table;
pub use types::{Cell, DilemmaId, ExtractionPath, ResponseSide, TrialOutcome, TrialTable};

/// Flux version reported by the CLI
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name in JSON run reports
pub const PRODUCER_NAME: &str = "dilemma-flux";
