//! Column layouts of the source text files
//!
//! Offsets are display columns (Shift_JIS byte offsets) as documented for
//! the published K (results) and B (programs) formats.

use crate::parse::columns::Span;

/// Venue banner line at the top of each venue block
pub mod banner {
    use super::Span;

    pub const VENUE: Span = Span::new(0, 18);
    pub const TITLE: Span = Span::new(35, 40);
    pub const DAY: Span = Span::new(81, 8);

    pub const VENUE_PREFIX: &str = "ボートレース";
}

/// Results (K) file
pub mod results {
    use super::Span;

    pub const BLOCK_BEGIN: &str = "KBGN";
    pub const BLOCK_END: &str = "KEND";

    /// Lines after a race header searched for the column header
    pub const HEADER_LOOKAHEAD: usize = 3;
    pub const COLUMN_HEADER_MARKER: &str = "着 艇 登番";

    pub const RACE_NUMBER: Span = Span::new(0, 5);
    pub const RACE_NAME: Span = Span::new(12, 24);
    pub const DISTANCE: Span = Span::new(38, 6);
    pub const WEATHER: Span = Span::new(46, 4);
    pub const WIND_DIRECTION: Span = Span::new(56, 6);
    pub const WIND_SPEED: Span = Span::new(62, 2);
    pub const WAVE_HEIGHT: Span = Span::new(71, 3);

    /// Winning technique, printed at the end of the column header line
    pub const TECHNIQUE: Span = Span::new(70, 10);

    pub const FINISH: Span = Span::new(2, 2);
    pub const BOAT_NUMBER: Span = Span::new(6, 1);
    pub const REGISTRATION: Span = Span::new(8, 4);
    pub const NAME: Span = Span::new(13, 16);
    pub const MOTOR: Span = Span::new(30, 2);
    pub const BOAT_ID: Span = Span::new(35, 2);
    pub const EXHIBITION: Span = Span::new(39, 4);
    pub const ENTRY_LANE: Span = Span::new(46, 1);
    pub const START_TIMING: Span = Span::new(51, 4);
    pub const RACE_TIME: Span = Span::new(60, 6);

    /// Payout lines are indented by exactly this many spaces
    pub const PAYOUT_INDENT: usize = 8;
    pub const PAYOUT_LABEL: Span = Span::new(8, 9);
    pub const PAYOUT_COMBINATION: Span = Span::new(17, 7);
    pub const PAYOUT_AMOUNT: Span = Span::new(24, 8);
    pub const PAYOUT_SECOND_COMBINATION: Span = Span::new(34, 7);
    pub const PAYOUT_SECOND_AMOUNT: Span = Span::new(41, 8);
    pub const POPULARITY_MARKER: Span = Span::new(34, 4);
    pub const POPULARITY: Span = Span::new(38, 4);
}

/// Programs (B) file
pub mod program {
    use super::Span;

    pub const BLOCK_BEGIN: &str = "BBGN";
    pub const BLOCK_END: &str = "BEND";

    pub const HEADER_LOOKAHEAD: usize = 4;
    /// Lines after the column header searched for the dashed separator
    pub const SEPARATOR_LOOKAHEAD: usize = 3;

    pub const RACE_NUMBER: Span = Span::new(0, 6);
    pub const RACE_NAME: Span = Span::new(8, 24);
    pub const DISTANCE: Span = Span::new(32, 12);
    pub const BETTING_CLOSE: Span = Span::new(62, 10);

    pub const FRAME: Span = Span::new(0, 1);
    pub const REGISTRATION: Span = Span::new(2, 4);
    pub const NAME: Span = Span::new(6, 8);
    pub const AGE: Span = Span::new(14, 2);
    pub const BRANCH: Span = Span::new(16, 4);
    pub const WEIGHT: Span = Span::new(20, 2);
    pub const CLASS_RANK: Span = Span::new(22, 2);
    pub const NATIONAL_WIN_RATE: Span = Span::new(25, 4);
    pub const NATIONAL_PLACE_RATE: Span = Span::new(30, 5);
    pub const LOCAL_WIN_RATE: Span = Span::new(36, 4);
    pub const LOCAL_PLACE_RATE: Span = Span::new(41, 5);
    pub const MOTOR: Span = Span::new(47, 2);
    pub const MOTOR_PLACE_RATE: Span = Span::new(50, 5);
    pub const BOAT: Span = Span::new(56, 2);
    pub const BOAT_PLACE_RATE: Span = Span::new(59, 5);
    /// Twelve one-column result slots
    pub const MEET_RESULTS_START: usize = 65;
    pub const DOUBLE_ENTRY: Span = Span::new(78, 2);
}
