//! Working-time arithmetic.
//!
//! All functions are pure and operate on wall-clock times in one fixed
//! reference timezone. [`BusinessCalendar`] does the UTC to local
//! conversion once and hands naive local times to the free functions.

use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{CalendarError, Result};
use crate::holidays::HolidaySet;
use crate::window::WorkWindow;

/// Wall-clock duration between two instants.
///
/// Zero when either endpoint is absent or `end` precedes `start`.
pub fn raw_duration(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Duration {
    match (start, end) {
        (Some(start), Some(end)) if end >= start => (end - start).to_std().unwrap_or_default(),
        _ => Duration::ZERO,
    }
}

/// Working time between two instants under `window`.
///
/// Every date in `start.date()..=end.date()` that is neither a weekend day
/// nor a holiday contributes the overlap of `[window.start, window.end]`
/// with `[start, end]` on that date. Zero when either endpoint is absent or
/// `end` precedes `start`.
pub fn business_duration(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    window: &WorkWindow,
    holidays: &HolidaySet,
) -> Duration {
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if end >= start => (start, end),
        _ => return Duration::ZERO,
    };

    let mut total = chrono::Duration::zero();
    for day in start.date().iter_days() {
        if day > end.date() {
            break;
        }
        if is_weekend(day.weekday()) || holidays.contains(day) {
            continue;
        }
        let from = day.and_time(window.start()).max(start);
        let to = day.and_time(window.end()).min(end);
        if to > from {
            total += to - from;
        }
    }
    total.to_std().unwrap_or_default()
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Raw, business-hour and 24-hour durations for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Durations {
    pub raw: Duration,
    pub business: Duration,
    pub full_day: Duration,
}

/// A work window pinned to a timezone.
///
/// Holidays are not owned by the calendar; callers pass the snapshot
/// taken for the current cycle.
#[derive(Debug, Clone)]
pub struct BusinessCalendar {
    tz: Tz,
    window: WorkWindow,
    full_day: WorkWindow,
}

impl BusinessCalendar {
    pub fn new(tz: Tz, window: WorkWindow) -> Self {
        Self {
            tz,
            window,
            full_day: WorkWindow::full_day(),
        }
    }

    /// Build from an IANA timezone name and `HH:MM` window bounds.
    pub fn from_config(timezone: &str, work_start: &str, work_end: &str) -> Result<Self> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|_| CalendarError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self::new(tz, WorkWindow::parse(work_start, work_end)?))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn window(&self) -> &WorkWindow {
        &self.window
    }

    /// Wall-clock time of `instant` in the calendar's timezone.
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        self.tz.from_utc_datetime(&instant.naive_utc()).naive_local()
    }

    /// All three durations between `start` and `end`.
    pub fn durations(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        holidays: &HolidaySet,
    ) -> Durations {
        let start = start.map(|t| self.local(t));
        let end = end.map(|t| self.local(t));
        self.durations_local(start, end, holidays)
    }

    /// Same as [`Self::durations`] for wall-clock times already in the
    /// calendar's timezone.
    pub fn durations_local(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        holidays: &HolidaySet,
    ) -> Durations {
        Durations {
            raw: raw_duration(start, end),
            business: business_duration(start, end, &self.window, holidays),
            full_day: business_duration(start, end, &self.full_day, holidays),
        }
    }
}
