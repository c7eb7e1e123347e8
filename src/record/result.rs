use crate::record::{MeetingInfo, RaceId, ENTRANT_SLOTS};
use std::fmt;

/// Elapsed race time, printed by the source as `m.ss.t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RaceTime {
    tenths: u32,
}

impl RaceTime {
    pub fn from_tenths(tenths: u32) -> Self {
        Self { tenths }
    }

    /// Parses `1.50.5` (one minute, 50.5 seconds)
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.');
        let minutes: u32 = parts.next()?.parse().ok()?;
        let seconds: u32 = parts.next()?.parse().ok()?;
        let tenths: u32 = parts.next()?.parse().ok()?;
        if parts.next().is_some() || seconds >= 60 || tenths >= 10 {
            return None;
        }
        Some(Self {
            tenths: (minutes * 60 + seconds) * 10 + tenths,
        })
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.tenths as f64 / 10.0
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.tenths / 10;
        write!(f, "{}.{:02}.{}", seconds / 60, seconds % 60, self.tenths % 10)
    }
}

/// One settled bet: combination, payout in yen and popularity rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub combination: String,
    pub amount: Option<u32>,
    pub popularity: Option<u32>,
}

/// Payouts of a settled race
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payouts {
    /// 単勝
    pub win: Option<Payout>,
    /// 複勝, up to two winning boats
    pub place: [Option<Payout>; 2],
    /// ２連単
    pub exacta: Option<Payout>,
    /// ２連複
    pub quinella: Option<Payout>,
    /// 拡連複, one per pair of the first three
    pub wide: [Option<Payout>; 3],
    /// ３連単
    pub trifecta: Option<Payout>,
    /// ３連複
    pub trio: Option<Payout>,
}

impl Payouts {
    pub fn is_empty(&self) -> bool {
        self.win.is_none()
            && self.place.iter().all(Option::is_none)
            && self.exacta.is_none()
            && self.quinella.is_none()
            && self.wide.iter().all(Option::is_none)
            && self.trifecta.is_none()
            && self.trio.is_none()
    }
}

/// One entrant line of a result section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrantResult {
    /// Finishing position, absent for non-finishers
    pub finish_position: Option<u8>,
    /// Finish column as printed (`01`, `F`, `K0`, `S1`, ...)
    pub finish_code: String,
    pub boat_number: Option<u8>,
    pub registration_id: String,
    pub name: String,
    pub motor_number: Option<u32>,
    pub boat_id: Option<u32>,
    pub exhibition_time: Option<f64>,
    pub entry_lane: Option<u8>,
    /// Start timing in seconds; negative for a flying start
    pub start_timing: Option<f64>,
    pub race_time: Option<RaceTime>,
}

/// A race of a results (K) file
#[derive(Debug, Clone, PartialEq)]
pub struct RaceResultRecord {
    pub id: RaceId,
    pub meeting: MeetingInfo,
    pub race_name: String,
    pub distance_m: Option<u32>,
    pub weather: String,
    pub wind_direction: String,
    pub wind_speed_m: Option<u32>,
    pub wave_height_cm: Option<u32>,
    pub winning_technique: String,
    /// False when no entrant has a finishing position
    pub valid: bool,
    /// Present only for valid, settled races
    pub payouts: Option<Payouts>,
    /// Entrants in file order; unused slots are `None`
    pub entrants: [Option<EntrantResult>; ENTRANT_SLOTS],
}

impl RaceResultRecord {
    pub fn entrant_count(&self) -> usize {
        self.entrants.iter().flatten().count()
    }

    pub fn has_finisher(&self) -> bool {
        self.entrants
            .iter()
            .flatten()
            .any(|entrant| entrant.finish_position.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_time_parse_and_display() {
        let time = RaceTime::parse("1.50.5").unwrap();
        assert_eq!(time.as_secs_f64(), 110.5);
        assert_eq!(time.to_string(), "1.50.5");

        assert_eq!(RaceTime::from_tenths(1083).to_string(), "1.48.3");
        assert_eq!(RaceTime::from_tenths(605).to_string(), "1.00.5");
    }

    #[test]
    fn test_race_time_rejects_garbage() {
        assert_eq!(RaceTime::parse(""), None);
        assert_eq!(RaceTime::parse("1.50"), None);
        assert_eq!(RaceTime::parse("1.75.0"), None);
        assert_eq!(RaceTime::parse("."), None);
    }

    #[test]
    fn test_payouts_is_empty() {
        let mut payouts = Payouts::default();
        assert!(payouts.is_empty());

        payouts.wide[2] = Some(Payout {
            combination: "2-3".to_string(),
            amount: Some(530),
            popularity: Some(8),
        });
        assert!(!payouts.is_empty());
    }
}
