//! Wall-clock helpers.
//!
//! All record timestamps are unix seconds; the database stores them as plain
//! integers.
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
///
/// # Panics
///
/// Panics if the system clock is set before the unix epoch.
#[must_use]
pub fn now_unix() -> i64 {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is set before the unix epoch");

    i64::try_from(duration.as_secs()).expect("unix time overflows i64")
}
