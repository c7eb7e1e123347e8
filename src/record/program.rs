use crate::record::{MeetingInfo, RaceId, ENTRANT_SLOTS};
use chrono::NaiveTime;

/// In-meet result slots per entrant: six days, two races each
pub const MEET_RESULT_SLOTS: usize = 12;

/// One frame (boat slot) of a race program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrantFrame {
    /// Frame number 1 to 6
    pub frame_number: u8,
    pub registration_id: String,
    pub name: String,
    pub age: Option<u8>,
    /// Home branch, e.g. `群馬`
    pub branch: String,
    pub weight_kg: Option<u32>,
    /// Class rank: A1, A2, B1 or B2
    pub class_rank: String,
    pub national_win_rate: Option<f64>,
    pub national_place_rate: Option<f64>,
    pub local_win_rate: Option<f64>,
    pub local_place_rate: Option<f64>,
    pub motor_number: Option<u32>,
    pub motor_place_rate: Option<f64>,
    pub boat_number: Option<u32>,
    pub boat_place_rate: Option<f64>,
    /// Finishing marks so far in the meeting; blank slots are empty strings
    pub meet_results: [String; MEET_RESULT_SLOTS],
    /// Same-day double-entry marker (早見), the other race this entrant rides
    pub double_entry: String,
}

/// A race of a program (B) file
#[derive(Debug, Clone, PartialEq)]
pub struct RaceProgramRecord {
    pub id: RaceId,
    pub meeting: MeetingInfo,
    /// Race class / name, e.g. `予選` or `優勝戦`
    pub race_name: String,
    pub distance_m: Option<u32>,
    /// Telephone betting close time
    pub betting_close: Option<NaiveTime>,
    /// Frames 1 to 6 by index; an absent entrant leaves its slot `None`
    pub frames: [Option<EntrantFrame>; ENTRANT_SLOTS],
}

impl RaceProgramRecord {
    pub fn entrant_count(&self) -> usize {
        self.frames.iter().flatten().count()
    }
}
