//! Wall-clock helpers.
//!
//! Scheduler operations take `now` as an argument; these helpers are what
//! production callers pass in.

use chrono::{DateTime, Duration, Utc};

/// Current wall-clock time in UTC.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Whole days from `now` until `until`, rounded up and clamped at zero.
///
/// `0` means the instant has already passed (or is exactly now).
#[must_use]
pub fn days_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = until - now;
    if remaining <= Duration::zero() {
        return 0;
    }
    let day_ms = Duration::days(1).num_milliseconds();
    let ms = remaining.num_milliseconds();
    (ms + day_ms - 1) / day_ms
}
