//! Timestamp rules for persisted documents.
//!
//! Accepted: RFC 3339 / ISO-8601 with an offset or a trailing `Z`, and naive
//! ISO-8601 date-times (and bare dates). Aware values are compared against UTC
//! "now", naive ones against local "now". Anything later than now plus the
//! configured skew tolerance is rejected.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const AWARE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// Both readings of "now" used for the future check, taken together so the
/// local/UTC offset is consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationClock {
    pub utc: DateTime<Utc>,
    pub local: NaiveDateTime,
}

impl ValidationClock {
    pub fn now() -> Self {
        Self {
            utc: Utc::now(),
            local: Local::now().naive_local(),
        }
    }

    /// A clock whose local time equals UTC. Used by tests and by hosts that
    /// store naive timestamps in UTC.
    pub fn fixed(utc: DateTime<Utc>) -> Self {
        Self {
            utc,
            local: utc.naive_utc(),
        }
    }

    fn local_offset(&self) -> Duration {
        self.local - self.utc.naive_utc()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

pub fn parse_timestamp(raw: &str) -> Option<ParsedTimestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(ParsedTimestamp::Aware(dt));
    }
    for format in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(ParsedTimestamp::Aware(dt));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ParsedTimestamp::Naive(naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(ParsedTimestamp::Naive)
}

/// Parse `value` and enforce the future bound. Returns the instant in UTC.
pub fn validate_timestamp(
    value: Option<&Value>,
    clock: &ValidationClock,
    tolerance_secs: i64,
) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    // A tolerance too large for chrono leaves the future bound open.
    let tolerance = Duration::try_seconds(tolerance_secs);

    match parse_timestamp(raw)? {
        ParsedTimestamp::Aware(dt) => {
            let utc = dt.with_timezone(&Utc);
            let limit = tolerance.and_then(|t| clock.utc.checked_add_signed(t));
            limit.map_or(true, |limit| utc <= limit).then_some(utc)
        }
        ParsedTimestamp::Naive(naive) => {
            let limit = tolerance.and_then(|t| clock.local.checked_add_signed(t));
            if limit.is_some_and(|limit| naive > limit) {
                return None;
            }
            // Dates at the edge of chrono's range cannot be shifted to UTC.
            naive
                .checked_sub_signed(clock.local_offset())
                .map(|shifted| shifted.and_utc())
        }
    }
}
