// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use crate::types::DateParts;
use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const MONTH_LABELS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Abbreviations as they appear in the export, case-sensitive.
static MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"]
        .into_iter()
        .zip(0u32..)
        .collect()
});

/// Iterate over the non-blank lines of a CSV export.
///
/// Lines are split on `\n` with an optional trailing `\r` removed. Lines that
/// are empty after trimming are skipped, including any before the header.
pub fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}

/// Split a single CSV line into raw (untrimmed) fields.
///
/// - Commas inside a double-quoted region do not split.
/// - `""` inside a quoted region becomes a literal `"`.
/// - Any other `"` toggles the quoted state, wherever it appears.
/// - An unterminated quote simply runs to the end of the line.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut value = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                value.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut value)),
            _ => value.push(c),
        }
    }

    fields.push(value);
    fields
}

/// Parse a date like `Jan 5, 2024` into its month index, day and year.
///
/// Internal whitespace is collapsed first, so `"Jan   5,  2024"` is accepted.
/// Anything else (extra tokens, unknown month, non-numeric parts) is `None`.
/// The day is not range-checked here; the month scoper does that.
pub fn parse_date_parts(s: &str) -> Option<DateParts> {
    let mut tokens = s.split_whitespace();
    let (month, day, year) = (tokens.next()?, tokens.next()?, tokens.next()?);
    if tokens.next().is_some() {
        return None;
    }

    if month.len() != 3 || !month.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let month_index = *MONTHS.get(month)?;

    let day = day.strip_suffix(',')?;
    if !(1..=2).contains(&day.len()) || !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(DateParts {
        month_index,
        day: day.parse().ok()?,
        year: year.parse().ok()?,
    })
}

/// Parse a numeric cell, returning `None` for blank or unparsable text.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric cells never fail a row: anything unparsable counts as zero.
pub fn parse_f64_or_zero(s: Option<&str>) -> f64 {
    parse_f64_safe(s).unwrap_or(0.0)
}

/// Number of days in the month at `month_index` (0-based) of `year`.
pub fn days_in_month(year: i32, month_index: u32) -> u32 {
    let (next_year, next_month) = if month_index >= 11 {
        (year + 1, 1)
    } else {
        (year, month_index + 2)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn month_name(month_index: u32) -> &'static str {
    MONTH_LABELS
        .get(month_index as usize)
        .copied()
        .unwrap_or_default()
}

/// `January 2024`
pub fn month_label(month_index: u32, year: i32) -> String {
    format!("{} {}", month_name(month_index), year)
}

/// `January 5 2024`
pub fn day_label(month_index: u32, day: u32, year: i32) -> String {
    format!("{} {} {}", month_name(month_index), day, year)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators, e.g. `1,234.50`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: i64 = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
