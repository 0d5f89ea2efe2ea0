//! Conversion of timestamp-like values into epoch milliseconds.
//!
//! CloudLog expects the `timestamp` field of every envelope to hold a Unix
//! millisecond timestamp. Envelope values are JSON, so wall-clock values show
//! up in their serde forms: RFC 3339 strings from `chrono`, and
//! `{secs_since_epoch, nanos_since_epoch}` objects from `std::time::SystemTime`.

use chrono::{DateTime, TimeZone};
use serde_json::{Map, Value};

const SECS_KEY: &str = "secs_since_epoch";
const NANOS_KEY: &str = "nanos_since_epoch";

/// Milliseconds since the Unix epoch for the given wall-clock time, in UTC.
pub fn epoch_millis<Tz: TimeZone>(time: &DateTime<Tz>) -> i64 {
    time.timestamp_millis()
}

/// Convert `value` to a Unix millisecond timestamp where possible.
///
/// Integers are returned unchanged, as is `null`. RFC 3339 strings and
/// serialised `SystemTime` values are converted. Anything else, including
/// values whose conversion would overflow, is returned as-is.
pub fn normalize_timestamp(value: Value) -> Value {
    match &value {
        Value::String(text) => match DateTime::parse_from_rfc3339(text) {
            Ok(time) => Value::from(epoch_millis(&time)),
            Err(_) => value,
        },
        Value::Object(fields) => system_time_millis(fields).map_or(value, Value::from),
        _ => value,
    }
}

fn system_time_millis(fields: &Map<String, Value>) -> Option<i64> {
    if fields.len() != 2 {
        return None;
    }
    let secs = fields.get(SECS_KEY)?.as_u64()?;
    let nanos = fields.get(NANOS_KEY)?.as_u64()?;
    let millis = secs.checked_mul(1000)?.checked_add(nanos / 1_000_000)?;
    i64::try_from(millis).ok()
}
