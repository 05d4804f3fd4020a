//! Run and unit reports
//!
//! Every participant unit ends in exactly one status. The run report collects
//! them with provenance so a batch can be audited after the fact.

use crate::error::ReconcileError;
use crate::types::ExtractionPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Final status of one participant unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Processed,
    Skipped,
    Failed,
}

impl UnitStatus {
    /// Status a unit-level error leads to
    pub fn for_error(err: &ReconcileError) -> Self {
        match err {
            ReconcileError::MissingInputFile(_) | ReconcileError::NoTrials(_) => UnitStatus::Skipped,
            _ => UnitStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Processed => "processed",
            UnitStatus::Skipped => "skipped",
            UnitStatus::Failed => "failed",
        }
    }
}

/// Outcome of processing one participant directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitReport {
    /// Directory name of the unit
    pub unit: String,
    pub status: UnitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ExtractionPath>,
    /// Output rows written
    pub rows: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub outputs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl UnitReport {
    pub fn from_error(unit: impl Into<String>, err: &ReconcileError) -> Self {
        Self {
            unit: unit.into(),
            status: UnitStatus::for_error(err),
            participant: None,
            path: None,
            rows: 0,
            outputs: Vec::new(),
            reason: Some(err.to_string()),
        }
    }
}

/// Summary of a whole run over a root directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn count(&self, status: UnitStatus) -> usize {
        self.units.iter().filter(|u| u.status == status).count()
    }

    pub fn processed(&self) -> usize {
        self.count(UnitStatus::Processed)
    }

    pub fn skipped(&self) -> usize {
        self.count(UnitStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(UnitStatus::Failed)
    }
}
