//! Japanese date/time formatting for the `datetime` token.
//!
//! `2025年9月22日（月） 15:00-19:00`

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Weekday names, Sunday first
pub const WEEKDAYS_JA: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

/// Four-digit years only
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateFormatError {
    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("{field} is not a number: '{value}'")]
    NotANumber { field: &'static str, value: String },

    #[error("{year}-{month}-{day} is not a calendar date")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Format the event date and time span, or explain why it cannot be formatted
pub fn try_format_jp_date(
    year: &str,
    month: &str,
    day: &str,
    start: &str,
    end: &str,
) -> Result<String, DateFormatError> {
    let year = require("year", year)?;
    let month = require("month", month)?;
    let day = require("day", day)?;
    // Times are cut as given; blank ones still count as missing
    require("start time", start)?;
    require("end time", end)?;

    let year: i32 = parse_number("year", year)?;
    let month: u32 = parse_number("month", month)?;
    let day: u32 = parse_number("day", day)?;

    let date = Some(year)
        .filter(|year| YEAR_RANGE.contains(year))
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or(DateFormatError::InvalidDate { year, month, day })?;
    let weekday = WEEKDAYS_JA[date.weekday().num_days_from_sunday() as usize];

    Ok(format!(
        "{}年{}月{}日（{}） {}-{}",
        year,
        month,
        day,
        weekday,
        first_chars(start, 5),
        first_chars(end, 5)
    ))
}

/// Like [`try_format_jp_date`], but an empty string when any input is
/// missing or the date does not exist
pub fn format_jp_date(year: &str, month: &str, day: &str, start: &str, end: &str) -> String {
    try_format_jp_date(year, month, day, start, end).unwrap_or_default()
}

fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, DateFormatError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DateFormatError::Missing(field))
    } else {
        Ok(trimmed)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, DateFormatError> {
    value.parse().map_err(|_| DateFormatError::NotANumber {
        field,
        value: value.to_string(),
    })
}

fn first_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
