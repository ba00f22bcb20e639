//! Date normalization and whole-minute durations.
//!
//! Cells arrive as native date-times, spreadsheet serial numbers, or free
//! text. Everything is reduced to a zone-free `NaiveDateTime`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::DateOrder;
use crate::models::CellValue;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const MILLIS_PER_MINUTE: i64 = 60_000;

const DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

const SEPARATORS: [char; 3] = ['/', '-', '.'];

const CLOCK_FORMATS: [&str; 4] = ["%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

/// Midnight, 30 December 1899: day zero of spreadsheet serial dates.
pub fn spreadsheet_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

pub fn normalize_date(value: &CellValue, order: DateOrder) -> Option<NaiveDateTime> {
    match value {
        CellValue::DateTime(value) => Some(*value),
        CellValue::Number(days) => from_serial(*days),
        CellValue::Text(text) => parse_text(text, order),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Epoch plus `days`, to the millisecond.
pub fn from_serial(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() {
        return None;
    }
    let millis = (days * MILLIS_PER_DAY).round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    let offset = chrono::Duration::try_milliseconds(millis as i64)?;
    spreadsheet_epoch()?.checked_add_signed(offset)
}

/// Maps Arabic-Indic and Extended Arabic-Indic digits to ASCII.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => ascii_digit(c as u32 - 0x0660),
            '\u{06F0}'..='\u{06F9}' => ascii_digit(c as u32 - 0x06F0),
            other => other,
        })
        .collect()
}

fn ascii_digit(offset: u32) -> char {
    char::from_digit(offset, 10).unwrap_or('0')
}

fn parse_text(text: &str, order: DateOrder) -> Option<NaiveDateTime> {
    let normalized = normalize_digits(text.trim());
    if normalized.is_empty() {
        return None;
    }
    parse_generic(&normalized).or_else(|| parse_separated(&normalized, order))
}

fn parse_generic(text: &str) -> Option<NaiveDateTime> {
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.naive_utc());
    }
    if let Ok(value) = DateTime::parse_from_rfc2822(text) {
        return Some(value.naive_utc());
    }
    // chrono's %Y takes any digit run; "03-04-24" must not become year 3.
    if !text.chars().take(4).all(|c| c.is_ascii_digit()) {
        return None;
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(value);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Splits `a<sep>b<sep>year[ time]` and reads the parts in `order`.
/// Everything after the year must be a clock time.
fn parse_separated(text: &str, order: DateOrder) -> Option<NaiveDateTime> {
    let separator = SEPARATORS.iter().copied().find(|sep| text.contains(*sep))?;
    let mut parts = text.splitn(3, separator);
    let first: u32 = parts.next()?.trim().parse().ok()?;
    let second: u32 = parts.next()?.trim().parse().ok()?;
    let rest = parts.next()?.trim();

    let (year, clock) = match rest.split_once(char::is_whitespace) {
        Some((year, clock)) => (year, Some(clock.trim())),
        None => (rest, None),
    };
    let year: i32 = year.parse().ok()?;
    let time = match clock {
        Some(clock) => parse_clock(clock)?,
        None => NaiveTime::MIN,
    };

    let (day, month) = match order {
        DateOrder::Dmy => (first, second),
        DateOrder::Mdy => (second, first),
    };
    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.and_time(time))
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    CLOCK_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

/// Whole minutes from `start` to `end`, half a minute rounding up.
/// `None` when `end` precedes `start`.
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> Option<u32> {
    let millis = end.signed_duration_since(start).num_milliseconds();
    if millis < 0 {
        return None;
    }
    let minutes = (millis + MILLIS_PER_MINUTE / 2) / MILLIS_PER_MINUTE;
    u32::try_from(minutes).ok()
}
