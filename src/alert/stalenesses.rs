/// Location reading staleness detection.
///
/// A drain sensor that stops reporting keeps its last water level on the map
/// indefinitely, which looks exactly like a healthy sensor at that level. This
/// module lets the info panel flag pins whose reading is too old to trust.
///
/// # Clock injection
/// Staleness takes a `now: DateTime<Utc>` parameter; nothing here reads
/// the clock.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::model::LocationReading;

/// Format the backend uses when it stores timestamps itself (SQLite
/// `CURRENT_TIMESTAMP`), always UTC.
const BACKEND_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parses a reading timestamp as either RFC 3339 or the backend's naive UTC
/// format (optionally with fractional seconds).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty timestamp".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, BACKEND_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("unrecognised timestamp '{}': {}", raw, e))
}

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` if the reading's timestamp is older than `max_age_minutes`
/// relative to `now`.
///
/// Staleness is defined as strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
///
/// Returns an error if the reading has no timestamp or it cannot be parsed.
pub fn is_stale_at(
    reading: &LocationReading,
    max_age_minutes: u64,
    now: DateTime<Utc>,
) -> Result<bool, String> {
    let raw = reading
        .timestamp
        .as_deref()
        .ok_or_else(|| "reading has no timestamp".to_string())?;
    let reading_time = parse_timestamp(raw)?;

    let age_minutes = (now - reading_time).num_minutes();
    if age_minutes < 0 {
        return Ok(false);
    }
    Ok(age_minutes as u64 > max_age_minutes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
