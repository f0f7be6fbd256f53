// Parsing and small statistics helpers.
//
// All the forgiving cell/number/date handling lives here so the loader and
// the normalizer can stay about structure and the rest of the crate can
// assume typed values.
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

use crate::types::Cell;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

// Slash dates: month-first before day-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Parse a string-like value into `f64`, forgiving the usual export noise.
///
/// - Trims whitespace; empty is `None`.
/// - Rejects values containing alphabetic characters (`nan`, `n/a`, `1e5`).
/// - Strips `,` thousands separators before parsing.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Like [`parse_f64_safe`] after removing every `%` sign.
pub fn parse_percent(s: &str) -> Option<f64> {
    parse_f64_safe(Some(&s.replace('%', "")))
}

pub fn cell_to_f64(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_f64_safe(Some(s)),
        _ => None,
    }
}

pub fn cell_to_percent(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_percent(s),
        _ => None,
    }
}

/// Excel 1900-system serial day number to a date (time of day dropped).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    // Day 0 is 1899-12-30 once Excel's phantom 1900-02-29 is accounted for.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

pub fn parse_date_cell(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Text(s) => parse_date_text(s),
        Cell::Empty => None,
    }
}

/// Parse a column header naming a reporting month; the result is the first of that month.
pub fn parse_period_cell(cell: &Cell) -> Option<NaiveDate> {
    let date = match cell {
        Cell::Text(s) => {
            let s = s.trim();
            parse_date_text(s)
                .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
                .or_else(|| NaiveDate::parse_from_str(&format!("01 {s}"), "%d %b %Y").ok())
                .or_else(|| NaiveDate::parse_from_str(&format!("01 {s}"), "%d %B %Y").ok())
        }
        other => parse_date_cell(other),
    }?;
    date.with_day(1)
}

/// First and last day of the calendar month containing `date`.
pub fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = date.with_day(1)?;
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let last = NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()?;
    Some((first, last))
}

/// Sum of the present values; `0.0` when nothing is present.
pub fn sum_present<I: IntoIterator<Item = Option<f64>>>(values: I) -> f64 {
    values.into_iter().flatten().sum()
}

/// Mean of the present values; `None` when nothing is present.
pub fn mean_present<I: IntoIterator<Item = Option<f64>>>(values: I) -> Option<f64> {
    let present: Vec<f64> = values.into_iter().flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(average(&present))
    }
}

pub fn average(v: &[f64]) -> f64 {
    // Returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Fixed decimals with `,` thousands separators, e.g. `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return String::new();
    }
    let s = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    // Keep "-0" from showing up for values that round to zero.
    if n.is_sign_negative() && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
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

pub fn display_ton(v: &f64) -> String {
    format_number(*v, 1)
}

/// Display text for one table cell: `%` columns get two decimals and a
/// percent sign, bunch counts are whole numbers, missing is blank.
pub fn format_cell(column: &str, value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if column.contains('%') => format!("{:.2}%", v),
        Some(v) if column.contains("(JJG)") => format_number(v, 0),
        Some(v) => format_number(v, 2),
    }
}
