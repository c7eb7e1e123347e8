//! Display-column slicing and permissive field conversion
//!
//! Source records are laid out in Shift_JIS byte columns. After decoding, a
//! character occupies one column if it was a single byte in Shift_JIS (ASCII,
//! half-width katakana and the U+FFFD standing in for one undecodable byte)
//! and two columns otherwise, so byte offsets of the original layout can be
//! applied to the decoded text directly.

use crate::archive::REPLACEMENT;
use std::str::FromStr;

const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// A field position: start column and width in display columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub width: usize,
}

impl Span {
    pub const fn new(start: usize, width: usize) -> Self {
        Self { start, width }
    }

    /// Raw slice of `line` covered by this span
    pub fn raw<'a>(&self, line: &'a str) -> &'a str {
        slice_columns(line, self.start, self.width)
    }

    /// Slice of `line` covered by this span, trimmed of ASCII and ideographic spaces
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        trim_spaces(self.raw(line))
    }
}

/// Width of `c` in source columns
pub fn char_width(c: char) -> usize {
    if c.is_ascii() || c == REPLACEMENT || ('\u{FF61}'..='\u{FF9F}').contains(&c) {
        1
    } else {
        2
    }
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Returns the characters lying entirely inside columns `[start, start + width)`
///
/// A double-width character straddling either edge is left out.
pub fn slice_columns(line: &str, start: usize, width: usize) -> &str {
    let end = start + width;
    let mut column = 0;
    let mut begin = None;
    let mut finish = line.len();

    for (index, c) in line.char_indices() {
        let w = char_width(c);
        if column + w > end {
            finish = index;
            break;
        }
        if begin.is_none() && column >= start {
            begin = Some(index);
        }
        column += w;
    }

    match begin {
        Some(begin) => &line[begin..finish],
        None => "",
    }
}

fn is_space(c: char) -> bool {
    c == ' ' || c == IDEOGRAPHIC_SPACE
}

pub fn trim_spaces(text: &str) -> &str {
    text.trim_matches(is_space)
}

pub fn is_blank(line: &str) -> bool {
    line.chars().all(|c| is_space(c) || c == '\r')
}

/// Maps full-width ASCII variants (`１`, `Ｒ`, `：`) to ASCII and the
/// ideographic space to a plain space
pub fn normalize_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            IDEOGRAPHIC_SPACE => ' ',
            _ => c,
        })
        .collect()
}

/// Trims and collapses every run of spaces into a single ASCII space
///
/// `中村　　亮太` becomes `中村 亮太`.
pub fn collapse_spaces(text: &str) -> String {
    trim_spaces(text)
        .split(is_space)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes every space, ASCII or ideographic
pub fn strip_spaces(text: &str) -> String {
    text.chars().filter(|c| !is_space(*c)).collect()
}

/// Parses a numeric field; blank or unparseable text yields `None`
pub fn parse_number<T: FromStr>(text: &str) -> Option<T> {
    let normalized = normalize_width(text);
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse().ok()
    }
}

/// Parses a decimal field such as `6.75` or `30.00`
pub fn parse_decimal(text: &str) -> Option<f64> {
    parse_number::<f64>(text).filter(|value| value.is_finite())
}

/// Keeps only ASCII digits of a field and parses them (`H1800m` → 1800)
pub fn parse_digits(text: &str) -> Option<u32> {
    let digits: String = normalize_width(text)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
