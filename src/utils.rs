use chrono::{TimeZone, Utc};

/// Refresh-timer floor: never arm the login refresh closer than this, so a
/// long-idle restart cannot produce a timer firing in the past.
pub const REFRESH_FLOOR_SECS: i64 = 6;

/// Retry delay floors for the submit scheduler (normal vs. after an errored
/// submission attempt).
pub const SUBMIT_FLOOR_SECS: i64 = 5;
pub const SUBMIT_ERROR_FLOOR_SECS: i64 = 30;

pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Seconds until the access token should be refreshed.
///
/// The remaining lifetime is `expires_in - (now - login_time)`, floored at
/// [`REFRESH_FLOOR_SECS`] to guard against clock skew and restored sessions
/// that are already past their expiry.
pub fn refresh_interval_secs(expires_in: i64, login_time: i64, now: i64) -> i64 {
    let remaining = expires_in - (now - login_time);
    remaining.max(REFRESH_FLOOR_SECS)
}

/// Delay before the next submission attempt.
///
/// The configured submit delay applies, but never below 5 seconds, or 30
/// seconds when the previous attempt errored. Two-tier backoff rather than
/// unbounded exponential growth; the queue is retried indefinitely.
pub fn submit_delay_secs(configured: i64, last_errored: bool) -> i64 {
    let floor = if last_errored {
        SUBMIT_ERROR_FLOOR_SECS
    } else {
        SUBMIT_FLOOR_SECS
    };
    configured.max(floor)
}

/// Formats an epoch timestamp for table output, e.g. `2026-08-29 14:03:11`.
pub fn format_epoch(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => ts.to_string(),
    }
}
