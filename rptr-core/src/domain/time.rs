//! Canonical timestamp shared by the bar timeline and the order stream.
//!
//! Both inputs are normalised to whole epoch seconds (UTC) through the same
//! parser, so the exact-equality join in the aligner never sees one side in
//! milliseconds and the other in seconds.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integers at or above this magnitude are read as epoch milliseconds.
pub const MILLIS_THRESHOLD: i64 = 100_000_000_000;

const SECONDS_PER_DAY: i64 = 86_400;

/// Instant in whole seconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("unrecognised timestamp '{0}'")]
    Unrecognised(String),

    #[error("millisecond timestamp {0} is not a whole second")]
    SubSecond(i64),
}

impl Timestamp {
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn secs(self) -> i64 {
        self.0
    }

    /// Parse any of the accepted textual forms.
    ///
    /// Accepted: RFC 3339, `YYYY-MM-DD HH:MM:SS±HH:MM`, naive
    /// `YYYY-MM-DD[ T]HH:MM:SS` (taken as UTC), `YYYY-MM-DD` (midnight UTC),
    /// and integer epoch seconds or milliseconds.
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        let s = raw.trim();

        if let Ok(n) = s.parse::<i64>() {
            return Self::from_epoch_integer(n);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.timestamp()));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(Self(dt.timestamp()));
            }
        }
        for fmt in [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self(naive.and_utc().timestamp()));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(midnight.and_utc().timestamp()));
            }
        }

        Err(TimestampError::Unrecognised(raw.to_string()))
    }

    fn from_epoch_integer(n: i64) -> Result<Self, TimestampError> {
        if n.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
            if n % 1000 != 0 {
                return Err(TimestampError::SubSecond(n));
            }
            return Ok(Self(n / 1000));
        }
        Ok(Self(n))
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }

    /// Whole days from `earlier` to `self`, truncated toward zero.
    pub fn days_since(self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0) / SECONDS_PER_DAY
    }

    /// `YYYY-MM-DD` in UTC.
    pub fn date_string(self) -> String {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.0.to_string())
    }

    /// `YYYY-MM-DD HH:MM` in UTC.
    pub fn minute_string(self) -> String {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pandas_offset_format() {
        let ts = Timestamp::parse("2021-01-01 00:00:00+00:00").unwrap();
        assert_eq!(ts.secs(), 1_609_459_200);
    }

    #[test]
    fn rfc3339_and_naive_agree() {
        let a = Timestamp::parse("2021-01-01T12:30:00Z").unwrap();
        let b = Timestamp::parse("2021-01-01 12:30:00").unwrap();
        let c = Timestamp::parse("2021-01-01T14:30:00+02:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let ts = Timestamp::parse("2021-01-02").unwrap();
        assert_eq!(ts.secs(), 1_609_459_200 + 86_400);
    }

    #[test]
    fn epoch_seconds_and_millis_canonicalise() {
        assert_eq!(Timestamp::parse("60").unwrap(), Timestamp(60));
        assert_eq!(
            Timestamp::parse("1609459200000").unwrap(),
            Timestamp(1_609_459_200)
        );
        assert_eq!(
            Timestamp::parse("1609459200123"),
            Err(TimestampError::SubSecond(1_609_459_200_123))
        );
        assert_eq!(
            Timestamp::parse("-1609459200000").unwrap(),
            Timestamp(-1_609_459_200)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(TimestampError::Unrecognised(_))
        ));
        assert_eq!(
            Timestamp::parse("-9223372036854775808"),
            Err(TimestampError::SubSecond(i64::MIN))
        );
    }

    #[test]
    fn days_since_truncates() {
        let start = Timestamp(0);
        assert_eq!(Timestamp(86_399).days_since(start), 0);
        assert_eq!(Timestamp(86_400).days_since(start), 1);
        assert_eq!(Timestamp(365 * 86_400 + 3_600).days_since(start), 365);
    }

    #[test]
    fn display_strings() {
        let ts = Timestamp::parse("2021-03-04 05:06:07").unwrap();
        assert_eq!(ts.date_string(), "2021-03-04");
        assert_eq!(ts.minute_string(), "2021-03-04 05:06");
        assert_eq!(ts.to_string(), "2021-03-04 05:06:07");
    }
}
