//! Timestamps with explicit timezone awareness.
//!
//! Board exports mix two shapes of date: RFC 3339 strings with a `Z` or an
//! offset, and bare local date-times without any zone. The two are kept apart
//! in [`Timestamp`] and every comparison between them fails with
//! [`TimezoneMismatchError`] instead of guessing an offset.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc,
};
use thiserror::Error;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Whether a timestamp carries an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Awareness {
    Aware,
    Naive,
}

impl fmt::Display for Awareness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Awareness::Aware => f.write_str("timezone-aware"),
            Awareness::Naive => f.write_str("naive"),
        }
    }
}

/// A naive timestamp was compared with an aware one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot compare a {left} timestamp with a {right} timestamp")]
pub struct TimezoneMismatchError {
    pub left: Awareness,
    pub right: Awareness,
}

/// Input could not be read as any supported timestamp form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp '{input}'")]
pub struct ParseTimestampError {
    input: String,
}

/// A point in time as reported by the board API.
///
/// # Example
///
/// ```rust
/// use boardpulse_types::Timestamp;
///
/// let created: Timestamp = "2024-01-01T09:00:00.000Z".parse().unwrap();
/// let done: Timestamp = "2024-01-05T09:00:00.000Z".parse().unwrap();
/// assert_eq!(done.days_since(&created).unwrap(), 4.0);
///
/// let local: Timestamp = "2024-01-05T09:00:00".parse().unwrap();
/// assert!(local.try_cmp(&done).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    /// Carries its own UTC offset.
    Aware(DateTime<FixedOffset>),
    /// Wall-clock time with no zone information.
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Current time as an aware UTC timestamp.
    pub fn now_utc() -> Self {
        Timestamp::Aware(Utc::now().fixed_offset())
    }

    pub fn awareness(&self) -> Awareness {
        match self {
            Timestamp::Aware(_) => Awareness::Aware,
            Timestamp::Naive(_) => Awareness::Naive,
        }
    }

    pub fn is_aware(&self) -> bool {
        matches!(self, Timestamp::Aware(_))
    }

    /// Fails unless `other` has the same awareness as `self`.
    pub fn ensure_same_awareness(&self, other: &Timestamp) -> Result<(), TimezoneMismatchError> {
        if self.awareness() == other.awareness() {
            Ok(())
        } else {
            Err(TimezoneMismatchError {
                left: self.awareness(),
                right: other.awareness(),
            })
        }
    }

    /// Chronological comparison. Aware values compare by instant, naive
    /// values by wall clock.
    pub fn try_cmp(&self, other: &Timestamp) -> Result<Ordering, TimezoneMismatchError> {
        match (self, other) {
            (Timestamp::Aware(a), Timestamp::Aware(b)) => Ok(a.cmp(b)),
            (Timestamp::Naive(a), Timestamp::Naive(b)) => Ok(a.cmp(b)),
            _ => Err(TimezoneMismatchError {
                left: self.awareness(),
                right: other.awareness(),
            }),
        }
    }

    pub fn signed_duration_since(
        &self,
        earlier: &Timestamp,
    ) -> Result<TimeDelta, TimezoneMismatchError> {
        match (self, earlier) {
            (Timestamp::Aware(a), Timestamp::Aware(b)) => Ok(a.signed_duration_since(*b)),
            (Timestamp::Naive(a), Timestamp::Naive(b)) => Ok(a.signed_duration_since(*b)),
            _ => Err(TimezoneMismatchError {
                left: self.awareness(),
                right: earlier.awareness(),
            }),
        }
    }

    /// Elapsed fractional days since `earlier` (negative if `earlier` is later).
    pub fn days_since(&self, earlier: &Timestamp) -> Result<f64, TimezoneMismatchError> {
        let delta = self.signed_duration_since(earlier)?;
        Ok(delta.num_milliseconds() as f64 / MILLIS_PER_DAY)
    }

    /// Calendar date of this timestamp.
    ///
    /// Aware timestamps are first shifted into `offset` when one is given;
    /// otherwise their own offset decides the date. Naive timestamps ignore
    /// `offset`.
    pub fn date_in(&self, offset: Option<FixedOffset>) -> NaiveDate {
        match (self, offset) {
            (Timestamp::Aware(dt), Some(offset)) => dt.with_timezone(&offset).date_naive(),
            (Timestamp::Aware(dt), None) => dt.date_naive(),
            (Timestamp::Naive(dt), _) => dt.date(),
        }
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Timestamp::Aware(dt) => Some(*dt.offset()),
            Timestamp::Naive(_) => None,
        }
    }
}

impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Timestamp::Aware(dt));
        }

        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Timestamp::Naive(dt));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Timestamp::Naive(date.and_time(NaiveTime::MIN)));
        }

        Err(ParseTimestampError {
            input: s.to_string(),
        })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Aware(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Timestamp::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Timestamp::Aware(dt)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Timestamp::Naive(dt)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trello_dates() {
        let ts: Timestamp = "2024-03-10T14:30:00.000Z".parse().unwrap();
        assert!(ts.is_aware());
        assert_eq!(ts.to_string(), "2024-03-10T14:30:00Z");

        let offset: Timestamp = "2024-03-10T14:30:00-03:00".parse().unwrap();
        assert_eq!(offset.offset(), FixedOffset::west_opt(3 * 3600));
    }

    #[test]
    fn test_parse_naive_forms() {
        let ts: Timestamp = "2024-03-10T14:30:00".parse().unwrap();
        assert_eq!(ts.awareness(), Awareness::Naive);

        let spaced: Timestamp = "2024-03-10 14:30:00.250".parse().unwrap();
        assert_eq!(spaced.awareness(), Awareness::Naive);

        let date_only: Timestamp = "2024-03-10".parse().unwrap();
        assert_eq!(date_only.to_string(), "2024-03-10T00:00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "yesterday".parse::<Timestamp>().unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn test_mixed_awareness_fails() {
        let aware: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
        let naive: Timestamp = "2024-01-01T00:00:00".parse().unwrap();

        let err = aware.try_cmp(&naive).unwrap_err();
        assert_eq!(err.left, Awareness::Aware);
        assert_eq!(err.right, Awareness::Naive);
        assert!(naive.days_since(&aware).is_err());
        assert!(aware.ensure_same_awareness(&naive).is_err());
    }

    #[test]
    fn test_aware_compares_by_instant() {
        let utc: Timestamp = "2024-01-01T12:00:00Z".parse().unwrap();
        let brt: Timestamp = "2024-01-01T09:00:00-03:00".parse().unwrap();
        assert_eq!(utc.try_cmp(&brt).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_days_since_fractional() {
        let start: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
        let end: Timestamp = "2024-01-02T12:00:00Z".parse().unwrap();
        assert_eq!(end.days_since(&start).unwrap(), 1.5);
        assert_eq!(start.days_since(&end).unwrap(), -1.5);
    }

    #[test]
    fn test_date_in_offset() {
        let ts: Timestamp = "2024-01-02T01:00:00Z".parse().unwrap();
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        assert_eq!(ts.date_in(None), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(ts.date_in(Some(brt)), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_as_string() {
        let ts: Timestamp = "2024-01-02T01:00:00Z".parse().unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-01-02T01:00:00Z\"");

        let none: Option<Timestamp> = serde_json::from_str("null").unwrap();
        assert!(none.is_none());
    }
}
