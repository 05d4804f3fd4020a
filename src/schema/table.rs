//! Delimited tabular input
//!
//! Both input logs are header-first CSV files. Rows are kept in file order and
//! cells that spell a missing value are stored as `None`.

use crate::error::ReconcileError;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Cell spellings treated as an absent value
pub const MISSING_MARKERS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "None", "#N/A"];

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Parse a cell as a finite number
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// An in-memory tabular file with a header row
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Label used in diagnostics (usually the file name)
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Build a table from already-split values
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Read CSV from any reader
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self, ReconcileError> {
        let name = name.into();
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record.iter().map(normalize_cell).collect();
            if row.len() > headers.len() {
                let dropped = row[headers.len()..].iter().filter(|c| c.is_some()).count();
                warn!(
                    file = %name,
                    row = rows.len(),
                    fields = row.len(),
                    columns = headers.len(),
                    dropped,
                    "record has more fields than the header; extra fields ignored"
                );
            }
            row.resize(headers.len(), None);
            rows.push(row);
        }

        Ok(Self::new(name, headers, rows))
    }

    /// Read a CSV file from disk
    pub fn from_path(path: &Path) -> Result<Self, ReconcileError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)?;
        Self::from_reader(name, file)
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column index, or `MissingColumn` naming this table
    pub fn require_column(&self, name: &str) -> Result<usize, ReconcileError> {
        self.column(name).ok_or_else(|| ReconcileError::MissingColumn {
            file: self.name.clone(),
            column: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// View of the row at `index`
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        (index < self.rows.len()).then_some(Record { table: self, index })
    }

    /// All rows in file order
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        (0..self.rows.len()).map(move |index| Record { table: self, index })
    }

    /// First present value of the first candidate column that has one
    pub fn first_value_of<'a, S: AsRef<str>>(&'a self, candidates: &[S]) -> Option<&'a str> {
        candidates
            .iter()
            .filter_map(|name| self.column(name.as_ref()))
            .find_map(|col| self.rows.iter().find_map(|row| row[col].as_deref()))
    }
}

/// Borrowed view of a single table row
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Record<'a> {
    /// Position of the row in the source file
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of `column`; `None` if the column does not exist or the cell is missing
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let col = self.table.column(column)?;
        self.at(col)
    }

    pub fn at(&self, col: usize) -> Option<&'a str> {
        self.table.rows[self.index].get(col).and_then(|c| c.as_deref())
    }

    /// Numeric value of `column`; `None` if missing or not a number
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(parse_number)
    }

    pub fn values(&self) -> &'a [Option<String>] {
        &self.table.rows[self.index]
    }
}
