//! Results (K file) parser
//!
//! Each venue block holds repeating race sections:
//!
//! ```text
//!    1R       予選 ...  H1800m  晴    風  北西   1m  波    2cm
//!   着 艇 登番 　選　手　名 ...                                  逃げ
//! -------------------------------------------------------------------
//!   01  1 4319 中村　　亮太　　 42   39  6.75   1    0.14     1.50.5
//!   ...
//!         単勝     1           140
//!         ...
//! ```

use crate::parse::columns::{
    collapse_spaces, is_blank, normalize_width, parse_decimal, parse_digits, parse_number,
};
use crate::parse::layout::results as layout;
use crate::parse::venue::{race_number, VenueCursor};
use crate::parse::ParseError;
use crate::record::{
    EntrantResult, Payout, Payouts, RaceId, RaceResultRecord, RaceTime, ENTRANT_SLOTS,
};
use chrono::NaiveDate;

/// Lazy iterator over the races of a results file
///
/// Yields one item per race header found inside a venue block: the parsed
/// record, or a per-race [`ParseError`] when the section is malformed.
/// Create a new iterator to parse the text again.
pub struct ResultRecords<'a> {
    lines: Vec<&'a str>,
    position: usize,
    date: NaiveDate,
    cursor: VenueCursor,
}

impl<'a> ResultRecords<'a> {
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
        meeting: crate::record::MeetingInfo,
    ) -> Result<RaceResultRecord, ParseError> {
        let header = self.lines[header_index];
        let malformed = |reason: &str| ParseError::MalformedRace {
            venue: venue_code.clone(),
            race,
            line: header_index + 1,
            reason: reason.to_string(),
        };

        let column_index = (header_index + 1..self.lines.len())
            .take(layout::HEADER_LOOKAHEAD)
            .take_while(|i| !self.is_section_end(self.lines[*i]))
            .find(|i| self.lines[*i].contains(layout::COLUMN_HEADER_MARKER))
            .ok_or_else(|| malformed("race header is not followed by a column header"))?;

        let technique = collapse_spaces(layout::TECHNIQUE.text(self.lines[column_index]));

        let mut entrants: [Option<EntrantResult>; ENTRANT_SLOTS] = Default::default();
        let mut entrant_count = 0;
        let mut payouts = PayoutCollector::default();

        let mut index = column_index + 1;
        while index < self.lines.len() && !self.is_section_end(self.lines[index]) {
            let line = self.lines[index];
            if is_entrant_line(line) {
                if entrant_count == ENTRANT_SLOTS {
                    return Err(malformed("more than six entrant lines"));
                }
                entrants[entrant_count] = Some(parse_entrant(line));
                entrant_count += 1;
            } else if !is_blank(line) {
                payouts.observe(line);
            }
            index += 1;
        }
        self.position = index;

        let id = RaceId::new(self.date, venue_code, race);
        let mut record = RaceResultRecord {
            id,
            meeting,
            race_name: collapse_spaces(layout::RACE_NAME.text(header)),
            distance_m: parse_digits(layout::DISTANCE.text(header)),
            weather: collapse_spaces(layout::WEATHER.text(header)),
            wind_direction: collapse_spaces(layout::WIND_DIRECTION.text(header)),
            wind_speed_m: parse_number(layout::WIND_SPEED.text(header)),
            wave_height_cm: parse_number(layout::WAVE_HEIGHT.text(header)),
            winning_technique: technique,
            valid: false,
            payouts: None,
            entrants,
        };

        record.valid = record.has_finisher();
        if record.valid {
            let payouts = payouts.finish();
            record.payouts = (!payouts.is_empty()).then_some(payouts);
        }

        Ok(record)
    }
}

impl<'a> Iterator for ResultRecords<'a> {
    type Item = Result<RaceResultRecord, ParseError>;

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

fn is_entrant_line(line: &str) -> bool {
    let registration = layout::REGISTRATION.text(line);
    registration.len() == 4 && registration.bytes().all(|b| b.is_ascii_digit())
}

fn parse_entrant(line: &str) -> EntrantResult {
    let finish_code = normalize_width(layout::FINISH.text(line));

    EntrantResult {
        finish_position: finish_code.parse::<u8>().ok().filter(|p| (1..=6).contains(p)),
        finish_code,
        boat_number: parse_number(layout::BOAT_NUMBER.text(line)),
        registration_id: layout::REGISTRATION.text(line).to_string(),
        name: collapse_spaces(layout::NAME.text(line)),
        motor_number: parse_number(layout::MOTOR.text(line)),
        boat_id: parse_number(layout::BOAT_ID.text(line)),
        exhibition_time: parse_decimal(layout::EXHIBITION.text(line)),
        entry_lane: parse_number(layout::ENTRY_LANE.text(line)),
        start_timing: parse_start_timing(layout::START_TIMING.text(line)),
        race_time: RaceTime::parse(layout::RACE_TIME.text(line)),
    }
}

/// Parses a start timing; a leading `F` marks a flying start (`F.01` → -0.01)
fn parse_start_timing(text: &str) -> Option<f64> {
    let normalized = normalize_width(text);
    let text = normalized.trim();
    match text.strip_prefix('F') {
        Some(rest) => parse_decimal(&format!("0{}", rest)).map(|value| -value),
        None => parse_decimal(text),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayoutLabel {
    Win,
    Place,
    Exacta,
    Quinella,
    Wide,
    Trifecta,
    Trio,
}

impl PayoutLabel {
    fn from_text(text: &str) -> Option<Self> {
        match normalize_width(text).as_str() {
            "単勝" => Some(Self::Win),
            "複勝" => Some(Self::Place),
            "2連単" => Some(Self::Exacta),
            "2連複" => Some(Self::Quinella),
            "拡連複" => Some(Self::Wide),
            "3連単" => Some(Self::Trifecta),
            "3連複" => Some(Self::Trio),
            _ => None,
        }
    }
}

/// Accumulates payout lines of one race
#[derive(Debug, Default)]
struct PayoutCollector {
    payouts: Payouts,
    last_label: Option<PayoutLabel>,
    wide_count: usize,
}

impl PayoutCollector {
    fn observe(&mut self, line: &str) {
        let indent = line.chars().take_while(|c| *c == ' ').count();
        if indent != layout::PAYOUT_INDENT && indent < layout::PAYOUT_COMBINATION.start {
            self.last_label = None;
            return;
        }

        let label_text = layout::PAYOUT_LABEL.text(line);
        let label = if label_text.is_empty() {
            // Continuation lines only exist for the wide bet
            match self.last_label {
                Some(PayoutLabel::Wide) => PayoutLabel::Wide,
                _ => return,
            }
        } else {
            match PayoutLabel::from_text(label_text) {
                Some(label) => label,
                None => {
                    self.last_label = None;
                    return;
                }
            }
        };
        self.last_label = Some(label);

        let Some(first) = parse_payout(line) else {
            return;
        };

        match label {
            PayoutLabel::Win => self.payouts.win = Some(first),
            PayoutLabel::Place => {
                self.payouts.place[0] = Some(first);
                let second = normalize_width(layout::PAYOUT_SECOND_COMBINATION.text(line));
                if !second.is_empty() {
                    self.payouts.place[1] = Some(Payout {
                        combination: second,
                        amount: parse_number(layout::PAYOUT_SECOND_AMOUNT.text(line)),
                        popularity: None,
                    });
                }
            }
            PayoutLabel::Exacta => self.payouts.exacta = Some(first),
            PayoutLabel::Quinella => self.payouts.quinella = Some(first),
            PayoutLabel::Wide => {
                if self.wide_count < self.payouts.wide.len() {
                    self.payouts.wide[self.wide_count] = Some(first);
                    self.wide_count += 1;
                }
            }
            PayoutLabel::Trifecta => self.payouts.trifecta = Some(first),
            PayoutLabel::Trio => self.payouts.trio = Some(first),
        }
    }

    fn finish(self) -> Payouts {
        self.payouts
    }
}

fn parse_payout(line: &str) -> Option<Payout> {
    let combination = normalize_width(layout::PAYOUT_COMBINATION.text(line));
    if combination.is_empty() {
        return None;
    }

    let popularity = if layout::POPULARITY_MARKER.text(line) == "人気" {
        parse_number(layout::POPULARITY.text(line))
    } else {
        None
    };

    Some(Payout {
        combination,
        amount: parse_number(layout::PAYOUT_AMOUNT.text(line)),
        popularity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/k_sample.txt");

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()
    }

    fn parse_all() -> Vec<Result<RaceResultRecord, ParseError>> {
        ResultRecords::new(FIXTURE, date()).collect()
    }

    #[test]
    fn test_yields_every_race_header_in_order() {
        let items = parse_all();
        assert_eq!(items.len(), 5);

        let codes: Vec<String> = items
            .iter()
            .filter_map(|item| item.as_ref().ok())
            .map(|record| record.id.race_code())
            .collect();
        assert_eq!(
            codes,
            vec!["202312010101", "202312010102", "202312010103", "202312012412"]
        );
    }

    #[test]
    fn test_race_header_and_meeting_fields() {
        let items = parse_all();
        let race = items[0].as_ref().unwrap();

        assert_eq!(race.meeting.venue_name, "桐生");
        assert_eq!(race.meeting.title, "第５回上毛新聞社杯");
        assert_eq!(race.meeting.day_label, "第3日");
        assert_eq!(race.race_name, "予選");
        assert_eq!(race.distance_m, Some(1800));
        assert_eq!(race.weather, "晴");
        assert_eq!(race.wind_direction, "北西");
        assert_eq!(race.wind_speed_m, Some(1));
        assert_eq!(race.wave_height_cm, Some(2));
        assert_eq!(race.winning_technique, "逃げ");
        assert!(race.valid);
    }

    #[test]
    fn test_entrant_fields() {
        let items = parse_all();
        let race = items[0].as_ref().unwrap();
        assert_eq!(race.entrant_count(), 6);

        let first = race.entrants[0].as_ref().unwrap();
        assert_eq!(first.finish_position, Some(1));
        assert_eq!(first.finish_code, "01");
        assert_eq!(first.boat_number, Some(1));
        assert_eq!(first.registration_id, "4319");
        assert_eq!(first.name, "中村 亮太");
        assert_eq!(first.motor_number, Some(42));
        assert_eq!(first.boat_id, Some(39));
        assert_eq!(first.exhibition_time, Some(6.75));
        assert_eq!(first.entry_lane, Some(1));
        assert_eq!(first.start_timing, Some(0.14));
        assert_eq!(first.race_time, RaceTime::parse("1.50.5"));

        let last = race.entrants[5].as_ref().unwrap();
        assert_eq!(last.name, "佐々木 康幸");
        assert_eq!(last.race_time, None);
    }

    #[test]
    fn test_undecodable_byte_in_name_keeps_later_columns() {
        use crate::archive::decode_shift_jis;
        use encoding_rs::SHIFT_JIS;

        let line = FIXTURE.lines().find(|line| line.contains("中村")).unwrap();
        let (encoded, _, _) = SHIFT_JIS.encode(line);

        for stray in [0xFD, 0x80] {
            // the last ideographic space of the name covers bytes 27..29
            let mut bytes = encoded.to_vec();
            bytes[27] = stray;
            bytes[28] = b' ';

            let decoded = decode_shift_jis(&bytes);
            assert!(decoded.had_replacements);

            let entrant = parse_entrant(&decoded.text);
            assert_eq!(entrant.registration_id, "4319");
            assert_eq!(entrant.name, "中村 亮太 \u{fffd}");
            assert_eq!(entrant.motor_number, Some(42));
            assert_eq!(entrant.boat_id, Some(39));
            assert_eq!(entrant.exhibition_time, Some(6.75));
            assert_eq!(entrant.entry_lane, Some(1));
            assert_eq!(entrant.start_timing, Some(0.14));
            assert_eq!(entrant.race_time, RaceTime::parse("1.50.5"));
        }
    }

    #[test]
    fn test_payouts_including_wide_continuations() {
        let items = parse_all();
        let payouts = items[0].as_ref().unwrap().payouts.clone().unwrap();

        let win = payouts.win.unwrap();
        assert_eq!((win.combination.as_str(), win.amount), ("1", Some(140)));

        let place_second = payouts.place[1].clone().unwrap();
        assert_eq!(place_second.combination, "3");
        assert_eq!(place_second.amount, Some(150));

        let exacta = payouts.exacta.unwrap();
        assert_eq!(exacta.combination, "1-3");
        assert_eq!(exacta.amount, Some(520));
        assert_eq!(exacta.popularity, Some(2));

        let wide: Vec<(String, Option<u32>, Option<u32>)> = payouts
            .wide
            .iter()
            .flatten()
            .map(|p| (p.combination.clone(), p.amount, p.popularity))
            .collect();
        assert_eq!(
            wide,
            vec![
                ("1-3".to_string(), Some(190), Some(2)),
                ("1-2".to_string(), Some(210), Some(3)),
                ("2-3".to_string(), Some(530), Some(8)),
            ]
        );

        let trifecta = payouts.trifecta.unwrap();
        assert_eq!(trifecta.combination, "1-3-2");
        assert_eq!(trifecta.amount, Some(1460));
        assert_eq!(trifecta.popularity, Some(5));
        assert_eq!(payouts.trio.unwrap().amount, Some(450));
    }

    #[test]
    fn test_flying_start_and_short_field() {
        let items = parse_all();
        let race = items[1].as_ref().unwrap();

        assert_eq!(race.entrant_count(), 5);
        assert!(race.entrants[5].is_none());
        assert_eq!(race.winning_technique, "まくり");

        let flyer = race.entrants[4].as_ref().unwrap();
        assert_eq!(flyer.finish_position, None);
        assert_eq!(flyer.finish_code, "F");
        assert_eq!(flyer.start_timing, Some(-0.01));
        assert_eq!(flyer.race_time, None);
    }

    #[test]
    fn test_race_without_finisher_is_invalid_but_kept() {
        let items = parse_all();
        let race = items[2].as_ref().unwrap();

        assert!(!race.valid);
        assert!(race.payouts.is_none());
        assert_eq!(race.entrant_count(), 6);
        assert!(race
            .entrants
            .iter()
            .flatten()
            .all(|e| e.finish_code == "K0" && e.finish_position.is_none()));
        assert_eq!(race.winning_technique, "");
    }

    #[test]
    fn test_malformed_header_is_a_race_error() {
        let items = parse_all();
        match &items[3] {
            Err(ParseError::MalformedRace { venue, race, .. }) => {
                assert_eq!(venue, "01");
                assert_eq!(*race, 4);
            }
            other => panic!("expected malformed race, got {:?}", other),
        }
    }

    #[test]
    fn test_second_venue_block() {
        let items = parse_all();
        let race = items[4].as_ref().unwrap();

        assert_eq!(race.meeting.venue_name, "大村");
        assert_eq!(race.meeting.day_label, "初日");
        assert_eq!(race.race_name, "優勝戦");
        assert_eq!(race.wind_speed_m, Some(0));
        assert_eq!(race.winning_technique, "差し");
        assert_eq!(race.entrants[0].as_ref().unwrap().name, "津田 裕絵");
        assert_eq!(race.payouts.as_ref().unwrap().trifecta.as_ref().unwrap().amount, Some(2980));
    }

    #[test]
    fn test_start_timing() {
        assert_eq!(parse_start_timing("0.14"), Some(0.14));
        assert_eq!(parse_start_timing("F.01"), Some(-0.01));
        assert_eq!(parse_start_timing("L"), None);
        assert_eq!(parse_start_timing(""), None);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let first: Vec<_> = ResultRecords::new(FIXTURE, date()).filter_map(Result::ok).collect();
        let second: Vec<_> = ResultRecords::new(FIXTURE, date()).filter_map(Result::ok).collect();
        assert_eq!(first, second);
    }
}
