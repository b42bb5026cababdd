use crate::error::{PaceError, Result};
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, TimeZone, Utc};

/// Week bucket used by the diff-delta accumulator: the Monday that starts the
/// week, as `YYYY-MM-DD`, in the commit's own offset.
pub fn monday_week_key(timestamp: &DateTime<FixedOffset>) -> String {
    let date = timestamp.date_naive();
    let offset = date.weekday().num_days_from_monday() as u64;
    let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
    monday.format("%Y-%m-%d").to_string()
}

/// ISO-8601 week bucket (`YYYY-Www`). Uses the ISO week-year, so the last days
/// of December can land in week 1 of the following year.
pub fn iso_week_key(timestamp: &DateTime<FixedOffset>) -> String {
    iso_week_key_for_date(timestamp.date_naive())
}

pub fn iso_week_key_for_date(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Division that yields zero for an empty denominator.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    // RFC3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    // YYYY-MM-DD
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&datetime));
        }
    }

    Err(PaceError::InvalidDate(format!(
        "'{input}' is neither RFC3339 nor YYYY-MM-DD"
    )))
}
