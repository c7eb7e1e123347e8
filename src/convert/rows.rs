//! Flattening of race records into CSV rows

use crate::convert::schema::{
    PROGRAM_BASE_WIDTH, PROGRAM_FRAME_WIDTH, RESULTS_BASE_WIDTH, RESULTS_ENTRANT_WIDTH,
    RESULTS_PAYOUT_WIDTH,
};
use crate::record::{
    EntrantFrame, EntrantResult, Payout, Payouts, RaceId, RaceProgramRecord, RaceResultRecord,
};
use std::fmt::Display;

fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn decimal(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn race_round(id: &RaceId) -> String {
    format!("{:02}R", id.race_number)
}

/// Columns shared by both schemas, up to and including the race name
fn race_columns(id: &RaceId, meeting: &crate::record::MeetingInfo, race_name: &str) -> Vec<String> {
    vec![
        id.race_code(),
        meeting.title.clone(),
        meeting.day_label.clone(),
        id.date.format("%Y-%m-%d").to_string(),
        meeting.venue_name.clone(),
        race_round(id),
        race_name.to_string(),
    ]
}

fn push_payout(row: &mut Vec<String>, payout: Option<&Payout>, with_popularity: bool) {
    match payout {
        Some(payout) => {
            row.push(payout.combination.clone());
            row.push(opt(payout.amount));
            if with_popularity {
                row.push(opt(payout.popularity));
            }
        }
        None => {
            let width = if with_popularity { 3 } else { 2 };
            row.extend(std::iter::repeat(String::new()).take(width));
        }
    }
}

fn payout_columns(payouts: Option<&Payouts>) -> Vec<String> {
    let mut row = Vec::with_capacity(RESULTS_PAYOUT_WIDTH);
    let Some(payouts) = payouts else {
        row.resize(RESULTS_PAYOUT_WIDTH, String::new());
        return row;
    };

    push_payout(&mut row, payouts.win.as_ref(), false);
    for place in &payouts.place {
        push_payout(&mut row, place.as_ref(), false);
    }
    push_payout(&mut row, payouts.exacta.as_ref(), true);
    push_payout(&mut row, payouts.quinella.as_ref(), true);
    for wide in &payouts.wide {
        push_payout(&mut row, wide.as_ref(), true);
    }
    push_payout(&mut row, payouts.trifecta.as_ref(), true);
    push_payout(&mut row, payouts.trio.as_ref(), true);
    row
}

fn entrant_columns(entrant: Option<&EntrantResult>) -> Vec<String> {
    let Some(entrant) = entrant else {
        return vec![String::new(); RESULTS_ENTRANT_WIDTH];
    };

    let finish = match entrant.finish_position {
        Some(position) => position.to_string(),
        None => entrant.finish_code.clone(),
    };

    vec![
        finish,
        opt(entrant.boat_number),
        entrant.registration_id.clone(),
        entrant.name.clone(),
        opt(entrant.motor_number),
        opt(entrant.boat_id),
        decimal(entrant.exhibition_time),
        opt(entrant.entry_lane),
        decimal(entrant.start_timing),
        opt(entrant.race_time),
    ]
}

fn frame_columns(frame: Option<&EntrantFrame>) -> Vec<String> {
    let Some(frame) = frame else {
        return vec![String::new(); PROGRAM_FRAME_WIDTH];
    };

    let mut row = vec![
        frame.frame_number.to_string(),
        frame.registration_id.clone(),
        frame.name.clone(),
        opt(frame.age),
        frame.branch.clone(),
        opt(frame.weight_kg),
        frame.class_rank.clone(),
        decimal(frame.national_win_rate),
        decimal(frame.national_place_rate),
        decimal(frame.local_win_rate),
        decimal(frame.local_place_rate),
        opt(frame.motor_number),
        decimal(frame.motor_place_rate),
        opt(frame.boat_number),
        decimal(frame.boat_place_rate),
    ];
    row.extend(frame.meet_results.iter().cloned());
    row.push(frame.double_entry.clone());
    row
}

/// Flattens a result record; invalid races carry empty payout columns
pub(crate) fn result_row(record: &RaceResultRecord) -> Vec<String> {
    let mut row = race_columns(&record.id, &record.meeting, &record.race_name);
    row.extend([
        opt(record.distance_m),
        record.weather.clone(),
        record.wind_direction.clone(),
        opt(record.wind_speed_m),
        opt(record.wave_height_cm),
        record.winning_technique.clone(),
        if record.valid { "1" } else { "0" }.to_string(),
    ]);
    debug_assert_eq!(row.len(), RESULTS_BASE_WIDTH);

    let payouts = if record.valid { record.payouts.as_ref() } else { None };
    row.extend(payout_columns(payouts));

    for entrant in &record.entrants {
        row.extend(entrant_columns(entrant.as_ref()));
    }
    row
}

/// Flattens a program record, one fixed block per frame
pub(crate) fn program_row(record: &RaceProgramRecord) -> Vec<String> {
    let mut row = race_columns(&record.id, &record.meeting, &record.race_name);
    row.push(opt(record.distance_m));
    row.push(
        record
            .betting_close
            .map(|time| time.format("%H:%M").to_string())
            .unwrap_or_default(),
    );
    debug_assert_eq!(row.len(), PROGRAM_BASE_WIDTH);

    for frame in &record.frames {
        row.extend(frame_columns(frame.as_ref()));
    }
    row
}
