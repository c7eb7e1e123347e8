use crate::parse::columns::{collapse_spaces, is_blank, normalize_width, strip_spaces};
use crate::parse::layout::banner;
use crate::record::MeetingInfo;

/// Returns the venue code of a block marker line such as `01KBGN`
pub(crate) fn block_code<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let line = line.trim_end();
    if !line.is_ascii() || line.len() != 2 + marker.len() || !line.ends_with(marker) {
        return None;
    }
    let code = &line[..2];
    code.bytes().all(|b| b.is_ascii_digit()).then_some(code)
}

/// Parses the banner line opening a venue block
pub(crate) fn parse_banner(line: &str) -> MeetingInfo {
    let venue = strip_spaces(banner::VENUE.text(line));
    let venue_name = venue
        .strip_prefix(banner::VENUE_PREFIX)
        .unwrap_or(&venue)
        .to_string();

    MeetingInfo {
        venue_name,
        title: collapse_spaces(banner::TITLE.text(line)),
        day_label: normalize_width(&strip_spaces(banner::DAY.text(line))),
    }
}

/// Parses a race token such as `1R`, `12R` or `１２Ｒ`
pub(crate) fn race_number(token: &str) -> Option<u8> {
    let normalized = normalize_width(token);
    let digits = normalized.trim().strip_suffix('R')?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n >= 1)
}

/// A venue block being read
#[derive(Debug, Clone)]
pub(crate) struct VenueBlock {
    pub code: String,
    pub meeting: Option<MeetingInfo>,
}

/// Tracks `NNxBGN` / `NNxEND` blocks and their banner line
#[derive(Debug)]
pub(crate) struct VenueCursor {
    begin_marker: &'static str,
    end_marker: &'static str,
    current: Option<VenueBlock>,
}

impl VenueCursor {
    pub fn new(begin_marker: &'static str, end_marker: &'static str) -> Self {
        Self {
            begin_marker,
            end_marker,
            current: None,
        }
    }

    /// Feeds one line; returns the active block when the line is race content
    ///
    /// Block markers and the banner line are consumed here and yield `None`,
    /// as does anything outside a block.
    pub fn observe(&mut self, line: &str) -> Option<&VenueBlock> {
        if let Some(code) = block_code(line, self.begin_marker) {
            self.current = Some(VenueBlock {
                code: code.to_string(),
                meeting: None,
            });
            return None;
        }

        if block_code(line, self.end_marker).is_some() {
            self.current = None;
            return None;
        }

        let block = self.current.as_mut()?;
        if block.meeting.is_none() {
            if !is_blank(line) {
                block.meeting = Some(parse_banner(line));
            }
            return None;
        }

        self.current.as_ref()
    }

    /// Whether `line` closes or opens a block
    pub fn is_boundary(&self, line: &str) -> bool {
        block_code(line, self.begin_marker).is_some() || block_code(line, self.end_marker).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_code() {
        assert_eq!(block_code("01KBGN", "KBGN"), Some("01"));
        assert_eq!(block_code("24KEND\r", "KEND"), Some("24"));
        assert_eq!(block_code("STARTK", "KBGN"), None);
        assert_eq!(block_code("01BBGN", "KBGN"), None);
        assert_eq!(block_code("xxKBGN", "KBGN"), None);
    }

    #[test]
    fn test_parse_banner() {
        let line = "ボートレース桐　生   １２月　１日  第５回上毛新聞社杯　　　　　　　　　　　      第　３日";
        let meeting = parse_banner(line);
        assert_eq!(meeting.venue_name, "桐生");
        assert_eq!(meeting.title, "第５回上毛新聞社杯");
        assert_eq!(meeting.day_label, "第3日");
    }

    #[test]
    fn test_race_number() {
        assert_eq!(race_number("   1R"), Some(1));
        assert_eq!(race_number("  12R"), Some(12));
        assert_eq!(race_number("　１Ｒ"), Some(1));
        assert_eq!(race_number("１２Ｒ"), Some(12));
        assert_eq!(race_number("R"), None);
        assert_eq!(race_number("123R"), None);
        assert_eq!(race_number("[払戻"), None);
        assert_eq!(race_number("0R"), None);
    }

    #[test]
    fn test_cursor_tracks_blocks() {
        let mut cursor = VenueCursor::new("KBGN", "KEND");
        assert!(cursor.observe("STARTK").is_none());
        assert!(cursor.observe("01KBGN").is_none());
        assert!(cursor.observe("").is_none());
        assert!(cursor
            .observe("ボートレース桐　生   １２月　１日  第５回上毛新聞社杯")
            .is_none());

        let block = cursor.observe("   1R  ...").unwrap();
        assert_eq!(block.code, "01");
        assert_eq!(block.meeting.as_ref().unwrap().venue_name, "桐生");

        assert!(cursor.observe("01KEND").is_none());
        assert!(cursor.observe("   2R  ...").is_none());
    }
}
