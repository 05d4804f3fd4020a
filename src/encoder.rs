//! Trial table encoding
//!
//! This module writes a normalized trial table as delimited text and as a
//! spreadsheet. Both encodings share the same column typing so a value reads
//! the same in either file.

use crate::error::ReconcileError;
use crate::schema::parse_number;
use crate::types::{Cell, TrialTable};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, Worksheet};
use std::io::Write;
use std::path::Path;

/// Type inferred for a column of raw text cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
}

/// Infer the kind of column `col`.
///
/// A column is numeric when every present text cell parses as a number; it is
/// a float column when at least one of them is written with a fraction or an
/// exponent.
pub fn infer_column_kind(table: &TrialTable, col: usize) -> ColumnKind {
    let mut texts = table
        .rows
        .iter()
        .filter_map(|row| row.get(col).and_then(Cell::as_text))
        .peekable();

    if texts.peek().is_none() {
        return ColumnKind::Text;
    }

    let mut fractional = false;
    for text in texts {
        if parse_number(text).is_none() {
            return ColumnKind::Text;
        }
        fractional |= text.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
    }

    if fractional {
        ColumnKind::Float
    } else {
        ColumnKind::Integer
    }
}

/// Encoder for trial tables
pub struct TableEncoder {
    precision: usize,
}

impl Default for TableEncoder {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TableEncoder {
    /// Create an encoder writing floats with `precision` decimal places
    pub fn new(precision: usize) -> Self {
        Self { precision }
    }

    fn format_float(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }

    fn render_cell(&self, cell: &Cell, kind: ColumnKind) -> String {
        match cell {
            Cell::Missing => String::new(),
            Cell::Text(text) => match (kind, parse_number(text)) {
                (ColumnKind::Float, Some(value)) => self.format_float(value),
                _ => text.clone(),
            },
            Cell::Float(value) => self.format_float(*value),
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
        }
    }

    fn column_kinds(table: &TrialTable) -> Vec<ColumnKind> {
        (0..table.columns.len())
            .map(|col| infer_column_kind(table, col))
            .collect()
    }

    /// Write the table as CSV with a header row
    pub fn write_csv<W: Write>(&self, table: &TrialTable, writer: W) -> Result<(), ReconcileError> {
        let kinds = Self::column_kinds(table);
        let mut wtr = csv::Writer::from_writer(writer);

        wtr.write_record(&table.columns)?;
        for row in &table.rows {
            wtr.write_record(
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| self.render_cell(cell, *kind)),
            )?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Encode to a CSV string
    pub fn encode_csv(&self, table: &TrialTable) -> Result<String, ReconcileError> {
        let mut buffer = Vec::new();
        self.write_csv(table, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            ReconcileError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn build_workbook(&self, table: &TrialTable) -> Result<Workbook, ReconcileError> {
        // Pinned creation time keeps reruns byte-identical
        let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
        let properties = DocProperties::new().set_creation_datetime(&created);

        let mut workbook = Workbook::new();
        workbook.set_properties(&properties);
        let worksheet = workbook.add_worksheet();
        self.fill_worksheet(worksheet, table)?;
        Ok(workbook)
    }

    fn fill_worksheet(&self, worksheet: &mut Worksheet, table: &TrialTable) -> Result<(), ReconcileError> {
        let header_format = Format::new().set_bold();
        let float_format = Format::new().set_num_format(self.number_format());
        let kinds = Self::column_kinds(table);

        for (col, name) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
        }

        for (i, row) in table.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, (cell, kind)) in row.iter().zip(&kinds).enumerate() {
                let c = col as u16;
                match cell {
                    Cell::Missing => {}
                    Cell::Text(text) => match (kind, parse_number(text)) {
                        (ColumnKind::Float, Some(value)) => {
                            worksheet.write_number_with_format(r, c, value, &float_format)?;
                        }
                        (ColumnKind::Integer, Some(value)) => {
                            worksheet.write_number(r, c, value)?;
                        }
                        _ => {
                            worksheet.write_string(r, c, text)?;
                        }
                    },
                    Cell::Float(value) => {
                        worksheet.write_number_with_format(r, c, *value, &float_format)?;
                    }
                    Cell::Bool(value) => {
                        worksheet.write_boolean(r, c, *value)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Spreadsheet number format matching the configured precision
    fn number_format(&self) -> String {
        if self.precision == 0 {
            "0".to_string()
        } else {
            format!("0.{}", "0".repeat(self.precision))
        }
    }

    /// Write the table to an `.xlsx` file
    pub fn write_xlsx(&self, table: &TrialTable, path: &Path) -> Result<(), ReconcileError> {
        let mut workbook = self.build_workbook(table)?;
        workbook.save(path)?;
        Ok(())
    }

    /// Encode to `.xlsx` bytes
    pub fn encode_xlsx(&self, table: &TrialTable) -> Result<Vec<u8>, ReconcileError> {
        let mut workbook = self.build_workbook(table)?;
        Ok(workbook.save_to_buffer()?)
    }
}
