//! Date/time normalization with a single output grain per column.
//!
//! Parsing never fails loudly: anything that cannot be read as the requested
//! grain comes back as [`DateValue::Missing`].

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::table::Cell;

/// The precision a normalized date column is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGrain {
    /// Calendar date, time of day discarded.
    Date,
    /// Time of day only.
    Time,
    Day,
    Month,
    Year,
    /// Display form `MM/YYYY`.
    MonthYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue {
    Date(NaiveDate),
    Time(NaiveTime),
    Component(i32),
    MonthYear { year: i32, month: u32 },
    Missing,
}

impl DateValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, DateValue::Missing)
    }

    pub fn into_cell(self) -> Cell {
        match self {
            DateValue::Date(d) => Cell::Date(d),
            DateValue::Time(t) => Cell::Time(t),
            DateValue::Component(c) => Cell::Int(c as i64),
            DateValue::MonthYear { year, month } => Cell::Text(format!("{:02}/{:04}", month, year)),
            DateValue::Missing => Cell::Missing,
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%Y %B %d",
    "%B %Y %d",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%Y.%m.%d",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Normalize `raw` to `grain`. With `format`, only that strftime pattern is
/// accepted; without it the format is inferred from a fixed list.
pub fn normalize_date(raw: &str, grain: DateGrain, format: Option<&str>) -> DateValue {
    let raw = raw.trim();
    if raw.is_empty() {
        return DateValue::Missing;
    }
    let parsed = match format {
        Some(fmt) => parse_with_format(raw, grain, fmt),
        None => parse_inferred(raw, grain),
    };
    match parsed {
        Some(p) => reduce(p, grain),
        None => DateValue::Missing,
    }
}

/// Normalize a cell; absent cells are missing.
pub fn normalize_cell(cell: &Cell, grain: DateGrain, format: Option<&str>) -> DateValue {
    match cell {
        Cell::Date(d) if format.is_none() => reduce(Parsed::Date(*d), grain),
        Cell::Time(t) if grain == DateGrain::Time => DateValue::Time(*t),
        other => other
            .to_text()
            .map(|s| normalize_date(&s, grain, format))
            .unwrap_or(DateValue::Missing),
    }
}

enum Parsed {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

fn reduce(parsed: Parsed, grain: DateGrain) -> DateValue {
    let date = match parsed {
        Parsed::DateTime(dt) if grain == DateGrain::Time => return DateValue::Time(dt.time()),
        Parsed::Time(t) if grain == DateGrain::Time => return DateValue::Time(t),
        Parsed::Time(_) => return DateValue::Missing,
        Parsed::Date(_) if grain == DateGrain::Time => return DateValue::Missing,
        Parsed::DateTime(dt) => dt.date(),
        Parsed::Date(d) => d,
    };
    match grain {
        DateGrain::Date => DateValue::Date(date),
        DateGrain::Day => DateValue::Component(date.day() as i32),
        DateGrain::Month => DateValue::Component(date.month() as i32),
        DateGrain::Year => DateValue::Component(date.year()),
        DateGrain::MonthYear => DateValue::MonthYear {
            year: date.year(),
            month: date.month(),
        },
        DateGrain::Time => DateValue::Missing,
    }
}

fn parse_inferred(raw: &str, grain: DateGrain) -> Option<Parsed> {
    if grain == DateGrain::Time {
        if let Some(t) = TIME_FORMATS
            .iter()
            .find_map(|f| NaiveTime::parse_from_str(raw, f).ok())
        {
            return Some(Parsed::Time(t));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Parsed::DateTime(dt.naive_local()));
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    {
        return Some(Parsed::DateTime(dt));
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .map(Parsed::Date)
}

fn parse_with_format(raw: &str, grain: DateGrain, fmt: &str) -> Option<Parsed> {
    if grain == DateGrain::Time {
        return NaiveTime::parse_from_str(raw, fmt)
            .map(Parsed::Time)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, fmt).map(Parsed::DateTime))
            .ok();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
        return Some(Parsed::DateTime(dt));
    }
    let (text, pattern) = complete_format(raw, fmt);
    NaiveDate::parse_from_str(&text, &pattern).ok().map(Parsed::Date)
}

/// Append defaults for calendar fields the pattern does not mention, so a
/// pattern such as `%m` or `%m/%y` still yields a full date.
fn complete_format(raw: &str, fmt: &str) -> (String, String) {
    let has = |directives: &[&str]| directives.iter().any(|d| fmt.contains(d));
    let mut text = raw.to_string();
    let mut pattern = fmt.to_string();
    if !has(&["%Y", "%y", "%G", "%C"]) {
        text.push_str("|2000");
        pattern.push_str("|%Y");
    }
    if !has(&["%m", "%b", "%B", "%h", "%j"]) {
        text.push_str("|01");
        pattern.push_str("|%m");
    }
    if !has(&["%d", "%e", "%j"]) {
        text.push_str("|01");
        pattern.push_str("|%d");
    }
    (text, pattern)
}
