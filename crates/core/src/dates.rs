//! Birth-date conversions between the three date representations.
//!
//! The form layer works with `YYYY-MM-DD` strings, the domain model with
//! [`NaiveDate`], and the store persists a UTC-midnight timestamp. The
//! conversions here are lossless for the calendar date; any time of day on a
//! stored timestamp is discarded.

use crate::error::FieldError;
use chrono::{DateTime, NaiveDate, Utc};

/// Format a calendar date the way the form displays it: `YYYY-MM-DD`.
pub fn form_string_from_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a form date string into a calendar date.
///
/// # Errors
///
/// Returns `FieldError::Required` for blank input and
/// `FieldError::InvalidDate` when the string is not a valid `YYYY-MM-DD`
/// date.
pub fn date_from_form_string(value: &str) -> Result<NaiveDate, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| FieldError::InvalidDate)
}

/// Convert a calendar date into the store's native representation: a
/// timestamp at UTC midnight.
pub fn store_timestamp_from_date(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Recover the calendar date from a stored timestamp, discarding the time of
/// day.
pub fn date_from_store_timestamp(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}
