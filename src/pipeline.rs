//! Session driver
//!
//! This module provides the batch API for Dilemma Flux. It walks a root
//! directory of participant units, runs the extractor on each one and writes
//! the normalized table next to the inputs.
//!
//! Units are independent: an error in one is reported and the run moves on.
//! Only a missing root directory aborts a run.

use crate::config::{LayoutSettings, ReconcileConfig};
use crate::encoder::TableEncoder;
use crate::error::ReconcileError;
use crate::extract::TrialExtractor;
use crate::report::{RunReport, UnitReport, UnitStatus};
use crate::schema::Table;
use crate::types::{ExtractionPath, TrialTable, PARTICIPANT_COLUMN};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Reconcile in-memory CSV logs into the normalized CSV table (stateless, one-shot).
///
/// # Arguments
/// * `behavior_csv` - Stimulus-engine trial log
/// * `summary_csv` - Eye-tracker event summary, if one was recorded
///
/// # Example
/// ```ignore
/// let table_csv = reconcile_csv(&psychopy_csv, Some(&summary_csv))?;
/// ```
pub fn reconcile_csv(behavior_csv: &str, summary_csv: Option<&str>) -> Result<String, ReconcileError> {
    let config = ReconcileConfig::default();
    let behavior = Table::from_reader("behavior", behavior_csv.as_bytes())?;
    let events = summary_csv
        .map(|csv| Table::from_reader("summary", csv.as_bytes()))
        .transpose()?;

    let table = TrialExtractor::new(config.clone()).extract(&behavior, events.as_ref())?;
    TableEncoder::new(config.float_precision).encode_csv(&table)
}

/// Input files found in a participant directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitFiles {
    pub behavior: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

impl UnitFiles {
    /// Path the extractor would take for these files
    pub fn planned_path(&self) -> Option<ExtractionPath> {
        if self.behavior.is_none() {
            return None;
        }
        Some(if self.summary.is_some() {
            ExtractionPath::EventMatched
        } else {
            ExtractionPath::BehaviorOnly
        })
    }
}

/// Classify the files of one participant directory.
///
/// `summary*.csv` is the event summary; any other `.csv` that is not a
/// previous output is the behavioral log. With several candidates the
/// lexicographically first wins.
pub fn discover_unit_files(dir: &Path, layout: &LayoutSettings) -> Result<UnitFiles, ReconcileError> {
    let extension = format!(".{}", layout.input_extension);
    let processed = format!("{}{}", layout.processed_suffix, extension);

    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(&extension))
        .collect();
    names.sort();

    let (summaries, behaviors): (Vec<String>, Vec<String>) = names
        .into_iter()
        .filter(|name| !name.ends_with(&processed))
        .partition(|name| name.starts_with(&layout.summary_prefix));

    if summaries.len() > 1 {
        warn!(unit = %dir.display(), candidates = ?summaries, "several event summaries, using the first");
    }
    if behaviors.len() > 1 {
        warn!(unit = %dir.display(), candidates = ?behaviors, "several behavioral logs, using the first");
    }

    Ok(UnitFiles {
        behavior: behaviors.first().map(|name| dir.join(name)),
        summary: summaries.first().map(|name| dir.join(name)),
    })
}

/// Participant directories under `root`, sorted by name
pub fn list_units(root: &Path) -> Result<Vec<PathBuf>, ReconcileError> {
    if !root.is_dir() {
        return Err(ReconcileError::RootNotFound(root.to_path_buf()));
    }

    let mut units: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    units.sort();
    Ok(units)
}

fn unit_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

/// Classification of one unit without processing it
#[derive(Debug, Clone, Serialize)]
pub struct UnitInspection {
    pub unit: String,
    pub files: UnitFiles,
    pub path: Option<ExtractionPath>,
}

/// Batch processor over participant units
pub struct SessionDriver {
    extractor: TrialExtractor,
    encoder: TableEncoder,
}

impl Default for SessionDriver {
    fn default() -> Self {
        Self::new(ReconcileConfig::default())
    }
}

impl SessionDriver {
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            encoder: TableEncoder::new(config.float_precision),
            extractor: TrialExtractor::new(config),
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        self.extractor.config()
    }

    /// Read a unit's inputs and extract its trial table without writing anything
    pub fn reconcile_unit(&self, dir: &Path) -> Result<TrialTable, ReconcileError> {
        let files = discover_unit_files(dir, &self.config().layout)?;
        let behavior_path = files
            .behavior
            .ok_or_else(|| ReconcileError::MissingInputFile(dir.to_path_buf()))?;

        info!(file = %behavior_path.display(), "behavioral log found");
        let behavior = Table::from_path(&behavior_path)?;

        let events = match &files.summary {
            Some(path) => {
                info!(file = %path.display(), "event summary found");
                Some(Table::from_path(path)?)
            }
            None => {
                warn!(unit = %dir.display(), "no event summary, using behavioral data only");
                None
            }
        };

        self.extractor.extract(&behavior, events.as_ref())
    }

    /// Output file paths for a unit: `(csv, xlsx)`
    pub fn output_paths(&self, dir: &Path) -> (PathBuf, PathBuf) {
        let stem = format!("{}{}", unit_name(dir), self.config().layout.processed_suffix);
        (
            dir.join(format!("{}.csv", stem)),
            dir.join(format!("{}.xlsx", stem)),
        )
    }

    /// Write both encodings of `table` into the unit directory
    pub fn write_outputs(&self, dir: &Path, table: &TrialTable) -> Result<Vec<PathBuf>, ReconcileError> {
        let (csv_path, xlsx_path) = self.output_paths(dir);
        let file = fs::File::create(&csv_path)?;
        self.encoder.write_csv(table, file)?;
        self.encoder.write_xlsx(table, &xlsx_path)?;
        Ok(vec![csv_path, xlsx_path])
    }

    fn try_process_unit(&self, dir: &Path) -> Result<UnitReport, ReconcileError> {
        let table = self.reconcile_unit(dir)?;
        let outputs = self.write_outputs(dir, &table)?;
        let participant = table
            .cell(0, PARTICIPANT_COLUMN)
            .and_then(|c| c.as_text())
            .map(str::to_string);

        Ok(UnitReport {
            unit: unit_name(dir),
            status: UnitStatus::Processed,
            participant,
            path: Some(table.path),
            rows: table.len(),
            outputs,
            reason: None,
        })
    }

    /// Process one participant directory. Never fails; errors become the report.
    pub fn process_unit(&self, dir: &Path) -> UnitReport {
        let unit = unit_name(dir);
        info!(unit = %unit, "processing unit");

        match self.try_process_unit(dir) {
            Ok(report) => {
                info!(unit = %unit, rows = report.rows, outputs = report.outputs.len(), "unit saved");
                report
            }
            Err(err) => {
                let report = UnitReport::from_error(&unit, &err);
                match report.status {
                    UnitStatus::Skipped => warn!(unit = %unit, "skipped: {}", err),
                    _ => error!(unit = %unit, "failed: {}", err),
                }
                report
            }
        }
    }

    /// Process every unit under `root`
    pub fn run(&self, root: &Path) -> Result<RunReport, ReconcileError> {
        let started_at = Utc::now();
        let units = list_units(root)?;
        info!(root = %root.display(), units = units.len(), "starting run");

        let reports: Vec<UnitReport> = units.iter().map(|dir| self.process_unit(dir)).collect();

        let report = RunReport {
            run_id: Uuid::new_v4(),
            root: root.to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            units: reports,
        };
        info!(
            processed = report.processed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "run finished"
        );
        Ok(report)
    }

    /// Classify every unit under `root` without reading or writing tables
    pub fn inspect(&self, root: &Path) -> Result<Vec<UnitInspection>, ReconcileError> {
        list_units(root)?
            .iter()
            .map(|dir| {
                let files = discover_unit_files(dir, &self.config().layout)?;
                Ok(UnitInspection {
                    unit: unit_name(dir),
                    path: files.planned_path(),
                    files,
                })
            })
            .collect()
    }
}
