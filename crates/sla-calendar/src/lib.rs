//! # sla-calendar
//!
//! Business-calendar duration engine.
//!
//! Computes elapsed working time between two instants in three modes:
//! raw wall-clock, a restricted daily work window, and a 24-hour window
//! that still skips weekends and holidays.
//!
//! ```rust
//! use sla_calendar::{business_duration, HolidaySet, WorkWindow};
//! use chrono::NaiveDate;
//!
//! let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
//! let d = business_duration(
//!     monday.and_hms_opt(9, 0, 0),
//!     monday.and_hms_opt(15, 0, 0),
//!     &WorkWindow::default(),
//!     &HolidaySet::new(),
//! );
//! assert_eq!(d.as_secs(), 21600);
//! ```

pub mod calendar;
pub mod error;
pub mod holidays;
pub mod window;

pub use calendar::{business_duration, raw_duration, BusinessCalendar, Durations};
pub use error::{CalendarError, Result};
pub use holidays::{refresh_holiday_file, HolidaySet, HolidaySource};
pub use window::WorkWindow;
