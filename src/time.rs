//! Integer-millisecond timestamps.
//!
//! This system never advances a simulated clock; it only sorts and does arithmetic over a
//! pre-recorded event series, so there is no `SimClock`-style abstraction here, just the alias
//! and the conversions a caller needs to build fixtures from RFC3339 strings.

/// Milliseconds since Unix epoch.
pub type Millis = i64;

pub const MILLIS_PER_SEC: Millis = 1_000;

/// Parse an RFC3339 timestamp string into epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Option<Millis> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Format epoch milliseconds back into an RFC3339 string (UTC).
pub fn format_timestamp(ms: Millis) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339())
}
