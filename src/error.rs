//! Error types for Dilemma Flux

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reconciling a participant unit
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Root directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Behavioral log not found in {}", .0.display())]
    MissingInputFile(PathBuf),

    #[error("No identifier column ({candidates}) with a value in {file}")]
    MissingIdentifierColumn { file: String, candidates: String },

    #[error("Missing required column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Unparsable dilemma identifier: {0}")]
    UnparsableEventIdentifier(String),

    #[error("Sequence mismatch for {main_event}: {reason}")]
    SequenceMismatch { main_event: String, reason: String },

    #[error("No trials found: {0}")]
    NoTrials(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
