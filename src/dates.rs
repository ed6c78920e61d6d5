//! Conversion between the display date format (`DD-MM-YYYY`) and the
//! canonical wire format (`YYYY-MM-DD`).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::data::CellValue;

pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

static DISPLAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").expect("display date pattern compiles")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

/// Lenient parser for dates arriving from the feed or typed by a user.
///
/// Timestamps keep the calendar date exactly as written; no timezone
/// conversion is applied.
pub fn parse_loose_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

pub fn format_canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

/// Renders a cell as `DD-MM-YYYY`, or returns its text untouched when it
/// does not parse as a date.
pub fn to_display(value: &CellValue) -> String {
    match value {
        CellValue::Text(text) => text_to_display(text),
        other => other.as_text().unwrap_or_default(),
    }
}

pub fn text_to_display(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    match parse_loose_date(text) {
        Some(date) => format_display(date),
        None => text.to_string(),
    }
}

/// Converts user input in `DD-MM-YYYY` to `YYYY-MM-DD`.
///
/// Input matching the strict pattern must name a real calendar date between
/// 1900 and 2100. Anything else goes through [`parse_loose_date`]. `None`
/// means the input is unusable and the edit must be refused.
pub fn to_canonical(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(date) = strict_display_date(trimmed) {
        return Some(format_canonical(date));
    }
    parse_loose_date(trimmed).map(format_canonical)
}

fn strict_display_date(text: &str) -> Option<NaiveDate> {
    let captures = DISPLAY_PATTERN.captures(text)?;
    let day: u32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let year: i32 = captures[3].parse().ok()?;
    if !(1..=31).contains(&day)
        || !(1..=12).contains(&month)
        || !(MIN_YEAR..=MAX_YEAR).contains(&year)
    {
        return None;
    }
    // from_ymd_opt rejects dates such as 31-02-2024 that pass the range checks
    NaiveDate::from_ymd_opt(year, month, day)
}
