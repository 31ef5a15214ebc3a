//! Time helpers.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, TimeZone, Utc};
use once_cell::sync::Lazy;
use std::time::Instant;

static TIMER_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Current unix timestamp in whole seconds.
pub fn current_unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Monotonic timer with second precision.
///
/// Not unix time: the origin is the first call in this process, and the
/// value does not move when the system clock is changed.
pub fn timer() -> u64 {
    TIMER_START.elapsed().as_secs()
}

/// Current UTC time truncated to whole seconds.
pub fn datenow() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// The moment `offset` from now, truncated to whole seconds.
pub fn ttl(offset: Duration) -> DateTime<Utc> {
    datenow() + offset
}

/// The moment `seconds` from now.
pub fn ttl_seconds(seconds: i64) -> DateTime<Utc> {
    ttl(Duration::seconds(seconds))
}

/// Parses a `2016-10-24T11:30:52.000000Z` style UTC timestamp.
pub fn parse_utc_timestamp(value: &str) -> CoreResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| CoreError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Renders a unix timestamp for humans; out-of-range values render raw.
pub fn format_unix_timestamp(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map_or_else(|| seconds.to_string(), |t| t.format("%a %b %e %H:%M:%S %Y").to_string())
}
