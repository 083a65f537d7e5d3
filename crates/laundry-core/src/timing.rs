//! Time model
//!
//! Every countdown is derived from absolute timestamps so that observers with
//! different clocks and tick phases agree. All results are whole seconds.

use chrono::{DateTime, Utc};

/// Seconds since `start`, clamped at zero for starts in the future
pub fn elapsed_seconds(now: DateTime<Utc>, start: DateTime<Utc>) -> u64 {
    (now - start).num_seconds().max(0) as u64
}

/// Seconds left in a cycle; never negative and never more than `duration`
pub fn remaining(now: DateTime<Utc>, start: DateTime<Utc>, duration_seconds: u64) -> u64 {
    duration_seconds.saturating_sub(elapsed_seconds(now, start))
}

pub fn is_expired(now: DateTime<Utc>, start: DateTime<Utc>, duration_seconds: u64) -> bool {
    remaining(now, start, duration_seconds) == 0
}

/// Seconds left before a finished cycle may be auto-released
pub fn auto_release_remaining(
    now: DateTime<Utc>,
    complete: DateTime<Utc>,
    window_seconds: u64,
) -> u64 {
    window_seconds.saturating_sub(elapsed_seconds(now, complete))
}

pub fn is_auto_release_due(
    now: DateTime<Utc>,
    complete: DateTime<Utc>,
    window_seconds: u64,
) -> bool {
    auto_release_remaining(now, complete, window_seconds) == 0
}

/// The instant a cycle started at `start` finishes
pub fn completion_instant(start: DateTime<Utc>, duration_seconds: u64) -> DateTime<Utc> {
    start + chrono::Duration::seconds(duration_seconds as i64)
}
