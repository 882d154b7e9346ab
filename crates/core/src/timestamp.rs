//! Backing-store timestamp parsing
//!
//! Swift reports object modification times as `YYYY-MM-DDTHH:MM:SS.ffffff`
//! (UTC, no offset) and container timestamps as fractional epoch seconds.
//! Both are normalized to whole epoch seconds.

use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::error::{Error, Result};

const LISTING_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a listing `last_modified` value into epoch seconds
///
/// Any fractional suffix after the first `.` is discarded before parsing.
pub fn parse_last_modified(value: &str) -> Result<i64> {
    let truncated = strip_fraction(value);
    let civil = DateTime::strptime(LISTING_FORMAT, truncated)
        .map_err(|e| Error::Parse(format!("timestamp '{value}': {e}")))?;
    let zoned = civil
        .to_zoned(TimeZone::UTC)
        .map_err(|e| Error::Parse(format!("timestamp '{value}': {e}")))?;
    Ok(zoned.timestamp().as_second())
}

/// Parse an `X-Timestamp` style header (`1700000000.12345`) into epoch seconds
pub fn parse_epoch_header(value: &str) -> Result<i64> {
    let truncated = strip_fraction(value.trim());
    truncated
        .parse::<i64>()
        .map_err(|e| Error::Parse(format!("epoch timestamp '{value}': {e}")))
}

fn strip_fraction(value: &str) -> &str {
    match value.split_once('.') {
        Some((whole, _)) => whole,
        None => value,
    }
}
