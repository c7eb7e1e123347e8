//! CSV conversion of parsed race records
//!
//! Every row of a table has exactly as many fields as its header. Absent
//! entrants and unsettled payouts become empty fields, never missing ones.

mod rows;
mod schema;

pub use schema::{
    program_header, results_header, PROGRAM_FRAME_WIDTH, RESULTS_ENTRANT_WIDTH, SCHEMA_VERSION,
};

use crate::record::{RaceProgramRecord, RaceResultRecord};
use thiserror::Error;

/// Errors raised while converting records to CSV
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{schema} row for race {race_code} has {actual} fields, header has {expected}")]
    SchemaViolation {
        schema: &'static str,
        expected: usize,
        actual: usize,
        race_code: String,
    },

    #[error("CSV serialization failed: {0}")]
    Csv(String),
}

impl ConvertError {
    /// Whether the error means a row builder disagrees with its header
    ///
    /// Such a mismatch is a programming error, unlike a failing writer.
    pub fn is_contract_breach(&self) -> bool {
        matches!(self, Self::SchemaViolation { .. })
    }
}

/// A header plus rows of equal width
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    schema: &'static str,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    fn new(schema: &'static str, header: Vec<String>) -> Self {
        Self {
            schema,
            header,
            rows: Vec::new(),
        }
    }

    /// Appends a row after checking it against the header width
    fn push_row(&mut self, race_code: String, row: Vec<String>) -> Result<(), ConvertError> {
        if row.len() != self.header.len() {
            return Err(ConvertError::SchemaViolation {
                schema: self.schema,
                expected: self.header.len(),
                actual: row.len(),
                race_code,
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Renders the table as UTF-8 CSV with `\n` line endings
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Header line followed by one line per row
    /// * `Err(ConvertError::Csv)` - The writer failed
    pub fn to_csv_string(&self) -> Result<String, ConvertError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer
            .write_record(&self.header)
            .map_err(|e| ConvertError::Csv(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| ConvertError::Csv(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ConvertError::Csv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ConvertError::Csv(e.to_string()))
    }
}

/// Converts result records into a results table, one row per race
pub fn to_results_csv(records: &[RaceResultRecord]) -> Result<CsvTable, ConvertError> {
    let mut table = CsvTable::new("results", results_header());
    for record in records {
        table.push_row(record.id.race_code(), rows::result_row(record))?;
    }
    Ok(table)
}

/// Converts program records into a programs table, one row per race
pub fn to_program_csv(records: &[RaceProgramRecord]) -> Result<CsvTable, ConvertError> {
    let mut table = CsvTable::new("programs", program_header());
    for record in records {
        table.push_row(record.id.race_code(), rows::program_row(record))?;
    }
    Ok(table)
}
