//! Qiita feed timestamps.
//!
//! Qiita publishes Atom with ISO-8601 `published` values, normally carrying
//! an offset (`2023-10-24T10:00:00+09:00`). Offset-less values are read as
//! wall-clock time in the reference zone.

use crate::error::DigestError;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 timestamp and convert it to `tz`.
pub fn parse_published(raw: &str, tz: Tz) -> Result<DateTime<Tz>, DigestError> {
    let raw_trimmed = raw.trim();
    let parse_error = |reason: String| DigestError::Parse {
        value: raw.to_string(),
        reason,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw_trimmed) {
        return Ok(dt.with_timezone(&tz));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw_trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&tz));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw_trimmed, fmt).ok())
        .ok_or_else(|| parse_error("not an ISO-8601 timestamp".to_string()))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| parse_error(format!("{naive} does not exist in {tz}")))
}
