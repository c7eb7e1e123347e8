//! Column schemas of the CSV archive
//!
//! Column names and order are part of the archive format. Any change must
//! bump [`SCHEMA_VERSION`].

use crate::record::{ENTRANT_SLOTS, MEET_RESULT_SLOTS};

pub const SCHEMA_VERSION: u32 = 1;

const RESULTS_BASE: [&str; 14] = [
    "レースコード",
    "タイトル",
    "日次",
    "レース日",
    "レース場",
    "レース回",
    "レース名",
    "距離(m)",
    "天候",
    "風向",
    "風速(m)",
    "波の高さ(cm)",
    "決まり手",
    "有効",
];

const RESULTS_PAYOUTS: [&str; 27] = [
    "単勝_艇番",
    "単勝_払戻金",
    "複勝_1着_艇番",
    "複勝_1着_払戻金",
    "複勝_2着_艇番",
    "複勝_2着_払戻金",
    "2連単_組番",
    "2連単_払戻金",
    "2連単_人気",
    "2連複_組番",
    "2連複_払戻金",
    "2連複_人気",
    "拡連複_1-2着_組番",
    "拡連複_1-2着_払戻金",
    "拡連複_1-2着_人気",
    "拡連複_1-3着_組番",
    "拡連複_1-3着_払戻金",
    "拡連複_1-3着_人気",
    "拡連複_2-3着_組番",
    "拡連複_2-3着_払戻金",
    "拡連複_2-3着_人気",
    "3連単_組番",
    "3連単_払戻金",
    "3連単_人気",
    "3連複_組番",
    "3連複_払戻金",
    "3連複_人気",
];

const RESULTS_ENTRANT: [&str; 10] = [
    "着順",
    "艇番",
    "登録番号",
    "選手名",
    "モーター番号",
    "ボート番号",
    "展示タイム",
    "進入コース",
    "スタートタイミング",
    "レースタイム",
];

const PROGRAM_BASE: [&str; 9] = [
    "レースコード",
    "タイトル",
    "日次",
    "レース日",
    "レース場",
    "レース回",
    "レース名",
    "距離(m)",
    "電話投票締切予定",
];

const PROGRAM_FRAME: [&str; 15] = [
    "艇番",
    "登録番号",
    "選手名",
    "年齢",
    "支部",
    "体重",
    "級別",
    "全国勝率",
    "全国2連対率",
    "当地勝率",
    "当地2連対率",
    "モーター番号",
    "モーター2連対率",
    "ボート番号",
    "ボート2連対率",
];

/// Columns per entrant block of the results schema
pub const RESULTS_ENTRANT_WIDTH: usize = RESULTS_ENTRANT.len();

/// Columns per frame block of the program schema
pub const PROGRAM_FRAME_WIDTH: usize = PROGRAM_FRAME.len() + MEET_RESULT_SLOTS + 1;

/// Header of the results CSV
pub fn results_header() -> Vec<String> {
    let mut header: Vec<String> = RESULTS_BASE.iter().map(|s| s.to_string()).collect();
    header.extend(RESULTS_PAYOUTS.iter().map(|s| s.to_string()));
    for slot in 1..=ENTRANT_SLOTS {
        header.extend(RESULTS_ENTRANT.iter().map(|field| format!("{}着_{}", slot, field)));
    }
    header
}

/// Header of the program CSV
pub fn program_header() -> Vec<String> {
    let mut header: Vec<String> = PROGRAM_BASE.iter().map(|s| s.to_string()).collect();
    for frame in 1..=ENTRANT_SLOTS {
        header.extend(PROGRAM_FRAME.iter().map(|field| format!("{}枠_{}", frame, field)));
        for slot in 0..MEET_RESULT_SLOTS {
            header.push(format!("{}枠_今節成績_{}-{}", frame, slot / 2 + 1, slot % 2 + 1));
        }
        header.push(format!("{}枠_早見", frame));
    }
    header
}

pub(crate) const RESULTS_BASE_WIDTH: usize = RESULTS_BASE.len();
pub(crate) const RESULTS_PAYOUT_WIDTH: usize = RESULTS_PAYOUTS.len();
pub(crate) const PROGRAM_BASE_WIDTH: usize = PROGRAM_BASE.len();
