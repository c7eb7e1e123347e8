//! Programs (B file) parser

use crate::parse::columns::{
    collapse_spaces, is_blank, normalize_width, parse_decimal, parse_digits, parse_number,
    slice_columns, trim_spaces,
};
use crate::parse::layout::program as layout;
use crate::parse::venue::{race_number, VenueCursor};
use crate::parse::ParseError;
use crate::record::{
    EntrantFrame, MeetingInfo, RaceId, RaceProgramRecord, ENTRANT_SLOTS, MEET_RESULT_SLOTS,
};
use chrono::{NaiveDate, NaiveTime};

/// Lazy iterator over the races of a program file
pub struct ProgramRecords<'a> {
    lines: Vec<&'a str>,
    position: usize,
    date: NaiveDate,
    cursor: VenueCursor,
}

impl<'a> ProgramRecords<'a> {
    pub fn new(text: &'a str, date: NaiveDate) -> Self {
        Self {
            lines: text.lines().collect(),
            position: 0,
            date,
            cursor: VenueCursor::new(layout::BLOCK_BEGIN, layout::BLOCK_END),
        }
    }

    fn is_section_end(&self, line: &str) -> bool {
        self.cursor.is_boundary(line) || race_number(layout::RACE_NUMBER.raw(line)).is_some()
    }

    fn parse_race(
        &mut self,
        header_index: usize,
        race: u8,
        venue_code: String,
        meeting: MeetingInfo,
    ) -> Result<RaceProgramRecord, ParseError> {
        let header = self.lines[header_index];
        let malformed = |reason: String| ParseError::MalformedRace {
            venue: venue_code.clone(),
            race,
            line: header_index + 1,
            reason,
        };

        let column_index = (header_index + 1..self.lines.len())
            .take(layout::HEADER_LOOKAHEAD)
            .take_while(|i| !self.is_section_end(self.lines[*i]))
            .find(|i| is_column_header(self.lines[*i]))
            .ok_or_else(|| {
                malformed("race header is not followed by a column header".to_string())
            })?;

        let separator_index = (column_index + 1..self.lines.len())
            .take(layout::SEPARATOR_LOOKAHEAD)
            .find(|i| self.lines[*i].starts_with("---"))
            .ok_or_else(|| malformed("column header is not followed by a separator".to_string()))?;

        let mut frames: [Option<EntrantFrame>; ENTRANT_SLOTS] = Default::default();
        let mut index = separator_index + 1;
        while index < self.lines.len() {
            let line = self.lines[index];
            if is_blank(line) || self.is_section_end(line) {
                break;
            }
            index += 1;

            let Some(frame) = parse_frame(line) else {
                tracing::debug!(
                    venue = %venue_code,
                    race,
                    line = index,
                    "Ignoring non-entrant line"
                );
                continue;
            };
            let slot = usize::from(frame.frame_number - 1);
            if frames[slot].is_some() {
                self.position = index;
                return Err(malformed(format!("frame {} listed twice", frame.frame_number)));
            }
            frames[slot] = Some(frame);
        }
        self.position = index;

        Ok(RaceProgramRecord {
            id: RaceId::new(self.date, venue_code, race),
            meeting,
            race_name: collapse_spaces(layout::RACE_NAME.text(header)),
            distance_m: parse_digits(layout::DISTANCE.text(header)),
            betting_close: parse_close_time(layout::BETTING_CLOSE.text(header)),
            frames,
        })
    }
}

impl<'a> Iterator for ProgramRecords<'a> {
    type Item = Result<RaceProgramRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.lines.len() {
            let index = self.position;
            let line = self.lines[index];
            self.position += 1;

            let Some(block) = self.cursor.observe(line) else {
                continue;
            };
            let Some(race) = race_number(layout::RACE_NUMBER.raw(line)) else {
                continue;
            };

            let venue_code = block.code.clone();
            let meeting = block.meeting.clone().unwrap_or_default();
            return Some(self.parse_race(index, race, venue_code, meeting));
        }
        None
    }
}

fn is_column_header(line: &str) -> bool {
    line.contains('艇') && line.contains("選手")
}

fn parse_close_time(text: &str) -> Option<NaiveTime> {
    let normalized = normalize_width(text);
    NaiveTime::parse_from_str(normalized.trim(), "%H:%M").ok()
}

/// Parses an entrant line; `None` when the frame or registration is missing
fn parse_frame(line: &str) -> Option<EntrantFrame> {
    let frame_number: u8 = parse_number(layout::FRAME.text(line))?;
    if !(1..=ENTRANT_SLOTS as u8).contains(&frame_number) {
        return None;
    }

    let registration = layout::REGISTRATION.text(line);
    if registration.len() != 4 || !registration.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut meet_results: [String; MEET_RESULT_SLOTS] = Default::default();
    for (slot, result) in meet_results.iter_mut().enumerate() {
        let mark = slice_columns(line, layout::MEET_RESULTS_START + slot, 1);
        *result = normalize_width(trim_spaces(mark));
    }

    Some(EntrantFrame {
        frame_number,
        registration_id: registration.to_string(),
        name: collapse_spaces(layout::NAME.text(line)),
        age: parse_number(layout::AGE.text(line)),
        branch: collapse_spaces(layout::BRANCH.text(line)),
        weight_kg: parse_number(layout::WEIGHT.text(line)),
        class_rank: layout::CLASS_RANK.text(line).to_string(),
        national_win_rate: parse_decimal(layout::NATIONAL_WIN_RATE.text(line)),
        national_place_rate: parse_decimal(layout::NATIONAL_PLACE_RATE.text(line)),
        local_win_rate: parse_decimal(layout::LOCAL_WIN_RATE.text(line)),
        local_place_rate: parse_decimal(layout::LOCAL_PLACE_RATE.text(line)),
        motor_number: parse_number(layout::MOTOR.text(line)),
        motor_place_rate: parse_decimal(layout::MOTOR_PLACE_RATE.text(line)),
        boat_number: parse_number(layout::BOAT.text(line)),
        boat_place_rate: parse_decimal(layout::BOAT_PLACE_RATE.text(line)),
        meet_results,
        double_entry: layout::DOUBLE_ENTRY.text(line).to_string(),
    })
}
