//! Dashboard time-range helpers.
//!
//! Agents pass dashboard time ranges in IST using a UTC-looking `...Z` format; the portal
//! expects real UTC.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::schema::FieldError;
use crate::{Error, Result};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Convert an IST timestamp (`YYYY-MM-DDTHH:MM:SSZ`) into UTC in the same format.
///
/// A result landing exactly on 18:29:00 UTC (23:59 IST) is pushed to 18:29:59 so that
/// end-of-day ranges include the final minute.
pub fn ist_to_utc(field: &str, value: &str) -> Result<String> {
    let ist = NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        Error::validation(
            "invalid timestamp",
            vec![FieldError::with_path(
                format!("expected YYYY-MM-DDTHH:MM:SSZ, got '{}' ({})", value, e),
                field,
            )],
        )
    })?;

    let mut utc = ist - Duration::minutes(5 * 60 + 30);
    if NaiveTime::from_hms_opt(18, 29, 0) == Some(utc.time()) {
        utc += Duration::seconds(59);
    }
    Ok(utc.format(TIMESTAMP_FORMAT).to_string())
}

/// Unix seconds of a `YYYY-MM-DDTHH:MM:SSZ` timestamp, taken as UTC.
pub fn unix_seconds(field: &str, value: &str) -> Result<i64> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|e| {
            Error::validation(
                "invalid timestamp",
                vec![FieldError::with_path(
                    format!("expected YYYY-MM-DDTHH:MM:SSZ, got '{}' ({})", value, e),
                    field,
                )],
            )
        })
}
