//! Canonical timestamp handling for the job store.
//!
//! The store keeps timestamps as TEXT and compares them lexicographically
//! (readiness checks, `created_at` ordering). That only works if every writer
//! uses the same fixed-width form, so this module is the single producer of
//! the canonical representation: ISO-8601 UTC with a six-digit fractional
//! second and a trailing `Z`.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time in UTC.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp in the canonical fixed-width form.
///
/// Lexicographic order over this form equals temporal order.
pub fn to_canonical(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Canonical form of the current time.
pub fn now_canonical() -> String {
    to_canonical(now())
}

/// Parse a timestamp in the canonical form (any RFC 3339 offset is accepted
/// and normalized to UTC).
pub fn parse_canonical(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}
