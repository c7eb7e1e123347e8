//! Fixed-width parsing of results and program text
//!
//! The parsers walk canonical text lazily and yield one item per race
//! section. Per-race problems are reported as items of the iterator so the
//! caller can log and skip them; [`parse_results`] and [`parse_program`]
//! collect a whole file and fail only when no race could be parsed.

mod columns;
mod layout;
mod program;
mod results;
mod venue;

pub use columns::{char_width, collapse_spaces, display_width, normalize_width, slice_columns, Span};
pub use program::ProgramRecords;
pub use results::ResultRecords;

use crate::archive::ArchiveKind;
use crate::record::{RaceProgramRecord, RaceResultRecord};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while parsing source text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A race section could not be read; the race is skipped
    #[error("venue {venue} race {race} (line {line}): {reason}")]
    MalformedRace {
        venue: String,
        race: u8,
        line: usize,
        reason: String,
    },

    /// Not a single race could be parsed from the file
    #[error("no parseable races in file")]
    NoRaces,
}

/// Records of one file plus the races that were skipped
#[derive(Debug, Clone)]
pub struct ParsedFile<T> {
    pub records: Vec<T>,
    pub warnings: Vec<ParseError>,
}

impl<T> ParsedFile<T> {
    pub fn race_count(&self) -> usize {
        self.records.len()
    }
}

/// Parses a results file
///
/// # Returns
///
/// * `Ok(ParsedFile)` - At least one race was parsed
/// * `Err(ParseError::NoRaces)` - No race could be parsed
pub fn parse_results(
    text: &str,
    date: NaiveDate,
) -> Result<ParsedFile<RaceResultRecord>, ParseError> {
    collect(ResultRecords::new(text, date), ArchiveKind::Result, date)
}

/// Parses a program file
pub fn parse_program(
    text: &str,
    date: NaiveDate,
) -> Result<ParsedFile<RaceProgramRecord>, ParseError> {
    collect(ProgramRecords::new(text, date), ArchiveKind::Program, date)
}

fn collect<T, I>(items: I, kind: ArchiveKind, date: NaiveDate) -> Result<ParsedFile<T>, ParseError>
where
    I: Iterator<Item = Result<T, ParseError>>,
{
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for item in items {
        match item {
            Ok(record) => records.push(record),
            Err(error) => {
                tracing::warn!(
                    event = "race_skipped",
                    %date,
                    %kind,
                    error = %error,
                    "Skipping unparseable race"
                );
                warnings.push(error);
            }
        }
    }

    if records.is_empty() {
        return Err(ParseError::NoRaces);
    }

    Ok(ParsedFile { records, warnings })
}
