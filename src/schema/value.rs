//! Value classification and conversion
//!
//! The same parsers decide a value's type while profiling and turn raw text
//! into canonical warehouse literals while loading, so a value that profiled
//! as a type always converts to it.

use super::types::{ColumnType, DECIMAL_PRECISION};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Whole numbers: no leading zeros, optional thousands grouping
static INTEGER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:0|[1-9]\d*|[1-9]\d{0,2}(?:,\d{3})+)$").unwrap());

/// Fixed-point numbers with a fractional part
static DECIMAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:0|[1-9]\d*|[1-9]\d{0,2}(?:,\d{3})+)?\.(\d+)$").unwrap()
});

/// First year a two-digit year resolves to: `75` reads as 2075, `85` as 1985
pub const TWO_DIGIT_CENTURY_START: i32 = 1980;

/// Accepted date formats, in priority order
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%y", "%d-%b-%Y", "%b %d, %Y"];

/// Accepted timestamp formats without an offset, in priority order
pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%b %d, %Y %I:%M:%S %p",
    "%d-%b-%y %I.%M.%S%.f %p",
];

/// Timestamp formats carrying a UTC offset
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Whether a raw value counts as NULL
///
/// Empty (after trimming) values are always null; `markers` adds more.
pub fn is_null(raw: &str, markers: &[String]) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || markers.iter().any(|m| m == trimmed)
}

/// Parse a boolean literal
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parse a date in one of [`DATE_FORMATS`]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(value, fmt)
            .ok()
            .and_then(|d| pivot_century(d, fmt))
    })
}

/// Parse a timestamp, normalising offsets to UTC
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = OFFSET_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
    {
        return Some(dt.naive_utc());
    }

    TIMESTAMP_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .and_then(|ts| pivot_century(ts, fmt))
    })
}

/// Move a two-digit year into the century window starting at
/// [`TWO_DIGIT_CENTURY_START`]
fn pivot_century<T: Datelike>(value: T, fmt: &str) -> Option<T> {
    if !fmt.contains("%y") || value.year() >= TWO_DIGIT_CENTURY_START {
        return Some(value);
    }
    value.with_year(value.year() + 100)
}

/// Classify a non-null value into its narrowest type
///
/// Attempts run in the fixed priority order BOOLEAN, INTEGER, DECIMAL,
/// DATE, TIMESTAMP; anything else is STRING. Numbers with leading zeros
/// ("007") never match INTEGER or DECIMAL.
pub fn classify(value: &str) -> ColumnType {
    let value = value.trim();

    if parse_bool(value).is_some() {
        return ColumnType::Boolean;
    }
    if let Some(ty) = classify_number(value) {
        return ty;
    }
    if parse_date(value).is_some() {
        return ColumnType::Date;
    }
    if parse_timestamp(value).is_some() {
        return ColumnType::Timestamp;
    }
    ColumnType::String
}

fn classify_number(value: &str) -> Option<ColumnType> {
    if INTEGER_REGEX.is_match(value) {
        if strip_grouping(value).parse::<i64>().is_ok() {
            return Some(ColumnType::Integer);
        }
        // Too wide for BIGINT: fits a DECIMAL(38, 0) or falls through to STRING
        return (integer_digits(value) <= DECIMAL_PRECISION as usize)
            .then_some(ColumnType::Decimal { scale: 0 });
    }

    let caps = DECIMAL_REGEX.captures(value)?;
    let scale = caps.get(1).map_or(0, |m| m.len());
    if scale + integer_digits(value) > DECIMAL_PRECISION as usize {
        return None;
    }
    Some(ColumnType::Decimal { scale: scale as u8 })
}

/// Digits before the decimal point of a numeric value
///
/// Sign and grouping are ignored; a bare `0` integer part counts as none.
pub fn integer_digits(value: &str) -> usize {
    let digits = strip_grouping(value.trim());
    let whole = digits
        .trim_start_matches(['+', '-'])
        .split('.')
        .next()
        .unwrap_or_default();
    if whole == "0" {
        0
    } else {
        whole.len()
    }
}

fn strip_grouping(value: &str) -> String {
    value.replace(',', "")
}

/// Convert a non-null raw value into the canonical literal for `target`
///
/// Returns a human-readable reason when the value does not fit.
pub fn canonicalize(raw: &str, target: &ColumnType) -> std::result::Result<String, String> {
    let value = raw.trim();
    match target {
        ColumnType::String => Ok(raw.to_string()),
        ColumnType::Boolean => parse_bool(value)
            .map(|b| b.to_string())
            .ok_or_else(|| format!("'{value}' is not a boolean")),
        ColumnType::Integer => {
            if !INTEGER_REGEX.is_match(value) {
                return Err(format!("'{value}' is not an integer"));
            }
            strip_grouping(value)
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| format!("'{value}' is out of range for INTEGER"))
        }
        ColumnType::Decimal { scale } => {
            match classify_number(value) {
                Some(ColumnType::Decimal { scale: s }) if s > *scale => {
                    return Err(format!(
                        "'{value}' has {s} fractional digits, column allows {scale}"
                    ));
                }
                Some(ColumnType::Integer | ColumnType::Decimal { .. }) => {}
                _ => return Err(format!("'{value}' is not a decimal number")),
            }
            let digits = integer_digits(value);
            if !target.holds_integer_digits(digits) {
                return Err(format!(
                    "'{value}' has {digits} integer digits, column allows {}",
                    (DECIMAL_PRECISION as usize).saturating_sub(*scale as usize)
                ));
            }
            Ok(strip_grouping(value))
        }
        ColumnType::Date => parse_date(value)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| format!("'{value}' is not a recognised date")),
        ColumnType::Timestamp => parse_timestamp(value)
            .or_else(|| {
                parse_date(value).and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            .ok_or_else(|| format!("'{value}' is not a recognised timestamp")),
    }
}
