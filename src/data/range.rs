//! Inclusive date ranges and reporting periods.

use std::cmp::Ordering;
use std::fmt;

use chrono::{
    DateTime, Days, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
};

use boardpulse_types::Timestamp;

use super::MetricError;

/// How timestamps map to calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayZone {
    /// Wall-clock dates; only naive timestamps fit.
    Naive,
    /// One offset for every day of the range.
    Fixed(FixedOffset),
    /// The system timezone. Each date uses its own offset, so days on both
    /// sides of a daylight-saving change start at local midnight.
    Local,
}

/// An inclusive `[start, end]` interval.
///
/// Both bounds share timezone awareness. Checking a timestamp of the other
/// awareness against the range fails with [`MetricError::TimezoneMismatch`].
///
/// # Example
///
/// ```
/// use boardpulse::data::DateRange;
/// use chrono::{FixedOffset, NaiveDate};
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let range = DateRange::from_dates(
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
///     utc,
/// )
/// .unwrap();
///
/// assert_eq!(range.day_count(), 10);
/// assert!(range.contains(&"2024-01-10T23:00:00Z".parse().unwrap()).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Timestamp,
    end: Timestamp,
    zone: DayZone,
}

impl DateRange {
    /// Range between two instants. Days are counted in the start bound's
    /// offset.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, MetricError> {
        if start.try_cmp(&end)? == Ordering::Greater {
            return Err(MetricError::invalid_range(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        let zone = start.offset().map_or(DayZone::Naive, DayZone::Fixed);
        Ok(Self { start, end, zone })
    }

    /// Whole calendar days `start..=end` counted in `zone`.
    pub fn in_zone(start: NaiveDate, end: NaiveDate, zone: DayZone) -> Result<Self, MetricError> {
        match zone {
            DayZone::Naive => Self::naive_dates(start, end),
            DayZone::Fixed(offset) => Self::from_dates(start, end, offset),
            DayZone::Local => Self::local_dates(start, end),
        }
    }

    /// Whole calendar days `start..=end` in `offset`: from midnight of the
    /// first day to the last instant of the last.
    pub fn from_dates(
        start: NaiveDate,
        end: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Self, MetricError> {
        let (first, last) = day_bounds(start, end);
        let first = offset
            .from_local_datetime(&first)
            .single()
            .ok_or_else(|| no_instant(start, offset))?;
        let last = offset
            .from_local_datetime(&last)
            .single()
            .ok_or_else(|| no_instant(end, offset))?;
        Self::new(first.into(), last.into())
    }

    /// Whole calendar days in the system timezone, from local midnight of
    /// `start` to the last local instant of `end`.
    pub fn local_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, MetricError> {
        let (first, last) = day_bounds(start, end);
        let first = local_instant(first, false).ok_or_else(|| no_instant(start, "local time"))?;
        let last = local_instant(last, true).ok_or_else(|| no_instant(end, "local time"))?;
        let range = Self::new(first.into(), last.into())?;
        Ok(Self {
            zone: DayZone::Local,
            ..range
        })
    }

    /// Whole calendar days as a naive (wall-clock) range.
    pub fn naive_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, MetricError> {
        let (first, last) = day_bounds(start, end);
        Self::new(first.into(), last.into())
    }

    pub fn start(&self) -> &Timestamp {
        &self.start
    }

    pub fn end(&self) -> &Timestamp {
        &self.end
    }

    /// Offset of the start bound; `None` for naive ranges.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.start.offset()
    }

    pub fn zone(&self) -> DayZone {
        self.zone
    }

    /// Whether `ts` lies within the range, bounds included.
    pub fn contains(&self, ts: &Timestamp) -> Result<bool, MetricError> {
        Ok(ts.try_cmp(&self.start)? != Ordering::Less
            && ts.try_cmp(&self.end)? != Ordering::Greater)
    }

    /// Calendar date of `ts` as counted by this range.
    pub fn date_of(&self, ts: &Timestamp) -> NaiveDate {
        match (self.zone, ts) {
            (DayZone::Local, Timestamp::Aware(dt)) => dt.with_timezone(&Local).date_naive(),
            (DayZone::Fixed(offset), _) => ts.date_in(Some(offset)),
            _ => ts.date_in(None),
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.date_of(&self.start)
    }

    pub fn end_date(&self) -> NaiveDate {
        self.date_of(&self.end)
    }

    /// Every calendar date of the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date();
        self.start_date().iter_days().take_while(move |d| *d <= end)
    }

    pub fn day_count(&self) -> usize {
        (self.end_date() - self.start_date()).num_days() as usize + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_date(), self.end_date())
    }
}

fn day_bounds(start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let last_instant =
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    (start.and_time(NaiveTime::MIN), end.and_time(last_instant))
}

/// Resolve a wall-clock time in the system timezone. Repeated times take the
/// earliest or latest instant; times skipped by a forward jump move an hour
/// past the gap in the same direction.
fn local_instant(at: NaiveDateTime, latest: bool) -> Option<DateTime<FixedOffset>> {
    let pick = |at: NaiveDateTime| {
        let resolved = Local.from_local_datetime(&at);
        if latest {
            resolved.latest()
        } else {
            resolved.earliest()
        }
    };
    let step = if latest {
        -TimeDelta::hours(1)
    } else {
        TimeDelta::hours(1)
    };
    pick(at)
        .or_else(|| at.checked_add_signed(step).and_then(pick))
        .map(|dt| dt.fixed_offset())
}

fn no_instant(date: NaiveDate, zone: impl fmt::Display) -> MetricError {
    MetricError::invalid_range(format!("{} has no instant in {}", date, zone))
}

/// A reporting period relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    LastMonth,
    LastQuarter,
    LastHalfYear,
    LastYear,
    Custom { from: NaiveDate, to: NaiveDate },
}

impl Period {
    /// Days covered before today, for the rolling presets.
    pub fn days_back(&self) -> Option<u64> {
        match self {
            Period::LastMonth => Some(30),
            Period::LastQuarter => Some(90),
            Period::LastHalfYear => Some(180),
            Period::LastYear => Some(365),
            Period::Custom { .. } => None,
        }
    }

    /// Concrete range for this period, with days counted in `zone`.
    /// Presets end on `today` and start `days_back` days earlier.
    pub fn resolve(&self, today: NaiveDate, zone: DayZone) -> Result<DateRange, MetricError> {
        match *self {
            Period::Custom { from, to } => DateRange::in_zone(from, to, zone),
            preset => {
                let back = preset.days_back().unwrap_or(0);
                let start = today.checked_sub_days(Days::new(back)).ok_or_else(|| {
                    MetricError::invalid_range(format!(
                        "{} days before {} is out of range",
                        back, today
                    ))
                })?;
                DateRange::in_zone(start, today, zone)
            }
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    /// Accepts the preset names used on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "last-month" | "30d" => Ok(Period::LastMonth),
            "quarter" | "last-quarter" | "90d" => Ok(Period::LastQuarter),
            "half-year" | "last-half-year" | "180d" => Ok(Period::LastHalfYear),
            "year" | "last-year" | "365d" => Ok(Period::LastYear),
            other => Err(format!(
                "unknown period '{}' (expected month, quarter, half-year or year)",
                other
            )),
        }
    }
}
