//! Wall-clock helpers.

use chrono::Utc;

/// Current Unix time in milliseconds.
#[inline]
pub fn unix_ms() -> i64 {
    Utc::now().timestamp_millis()
}
