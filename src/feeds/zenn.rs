//! Zenn feed timestamps.
//!
//! Zenn publishes RSS 2.0 with RFC-822 `pubDate` values such as
//! `Tue, 24 Oct 2023 15:00:00 GMT`.

use crate::error::DigestError;
use chrono::DateTime;
use chrono_tz::Tz;

/// Parse an RFC-822 timestamp and convert it to `tz`.
pub fn parse_published(raw: &str, tz: Tz) -> Result<DateTime<Tz>, DigestError> {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.with_timezone(&tz))
        .map_err(|e| DigestError::Parse {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
