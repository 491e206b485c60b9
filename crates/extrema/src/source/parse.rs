//! Cell parsers used by the row sources.

use chrono::{Month, NaiveDate};

/// Parses a month given as a number (`1`-`12`), a full English name
/// (`"March"`) or a three-letter abbreviation (`"mar"`), ignoring case.
pub fn parse_month(cell: &str) -> Option<Month> {
    let cell = cell.trim();
    if let Ok(number) = cell.parse::<u8>() {
        return Month::try_from(number).ok();
    }
    cell.parse::<Month>().ok()
}

/// Resolves a year cell and a month cell to the first day of that month.
pub fn year_month(year: &str, month: &str) -> Option<NaiveDate> {
    let year = year.trim().parse::<i32>().ok()?;
    let month = parse_month(month)?;
    NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)
}

/// Parses an ISO date, either `YYYY-MM-DD` or `YYYY-MM` (first of the
/// month).
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            let (year, month) = cell.split_once('-')?;
            if month.len() > 2 {
                return None;
            }
            year_month(year, month)
        })
}

/// Parses a numeric cell, accepting `,` thousands separators.  Blank cells
/// yield `None`.
pub fn parse_value(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if cell.contains(',') {
        cell.replace(',', "").parse().ok()
    } else {
        cell.parse().ok()
    }
}
