//! Daily work window.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;

use crate::error::{CalendarError, Result};

/// Time-of-day range applied identically on every working day.
///
/// The window is closed at both ends for intersection purposes; since
/// intersections are measured as lengths, that only matters in that a
/// ticket opened exactly at `end` accrues nothing that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl WorkWindow {
    /// Create a window. `start` must be strictly before `end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(CalendarError::InvalidWindow(format!(
                "start {} is not before end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a window from two `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// The 24-hour variant, 00:00 to 23:59.
    pub fn full_day() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }
}

impl Default for WorkWindow {
    /// 08:00 to 17:00
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl fmt::Display for WorkWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

impl FromStr for WorkWindow {
    type Err = CalendarError;

    /// Parse `HH:MM-HH:MM`.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| CalendarError::InvalidWindow(s.to_string()))?;
        Self::parse(start, end)
    }
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| CalendarError::InvalidTime(s.to_string()))
}
