//! Typed race records
//!
//! Records are what the fixed-width parsers produce and what the CSV
//! converter consumes. Entrant slots are fixed-size arrays so every record
//! flattens to the same number of columns.

mod program;
mod result;

pub use program::{EntrantFrame, RaceProgramRecord, MEET_RESULT_SLOTS};
pub use result::{EntrantResult, Payout, Payouts, RaceResultRecord, RaceTime};

use chrono::NaiveDate;

/// Number of entrant slots in every race
pub const ENTRANT_SLOTS: usize = 6;

/// Identifies one race: date, venue and race number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RaceId {
    pub date: NaiveDate,
    /// Two-digit venue code, e.g. `01` for Kiryu
    pub venue_code: String,
    pub race_number: u8,
}

impl RaceId {
    pub fn new(date: NaiveDate, venue_code: impl Into<String>, race_number: u8) -> Self {
        Self {
            date,
            venue_code: venue_code.into(),
            race_number,
        }
    }

    /// `YYYYMMDD` + venue code + two-digit race number
    pub fn race_code(&self) -> String {
        format!(
            "{}{}{:02}",
            self.date.format("%Y%m%d"),
            self.venue_code,
            self.race_number
        )
    }
}

/// Meeting-level context shared by every race of a venue block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingInfo {
    /// Venue name without the `ボートレース` prefix, e.g. `桐生`
    pub venue_name: String,
    /// Meeting title
    pub title: String,
    /// Day ordinal as printed, e.g. `第３日` or `初日`
    pub day_label: String,
}
