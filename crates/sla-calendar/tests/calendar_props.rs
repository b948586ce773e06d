//! Property tests for working-time arithmetic.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use sla_calendar::{business_duration, raw_duration, HolidaySet, WorkWindow};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Instants within roughly two months of 2024-01-01, minute resolution.
fn instant() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..60 * 24 * 60).prop_map(|m| base() + chrono::Duration::minutes(m))
}

fn holidays() -> impl Strategy<Value = HolidaySet> {
    proptest::collection::vec(0i64..60, 0..10).prop_map(|days| {
        days.into_iter()
            .map(|d| base().date() + chrono::Duration::days(d))
            .collect()
    })
}

proptest! {
    #[test]
    fn reversed_interval_is_zero(a in instant(), b in instant(), h in holidays()) {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        prop_assume!(start < end);
        prop_assert_eq!(
            business_duration(Some(end), Some(start), &WorkWindow::default(), &h),
            Duration::ZERO
        );
        prop_assert_eq!(raw_duration(Some(end), Some(start)), Duration::ZERO);
    }

    #[test]
    fn business_never_exceeds_full_day_or_raw(a in instant(), b in instant(), h in holidays()) {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let business = business_duration(Some(start), Some(end), &WorkWindow::default(), &h);
        let full_day = business_duration(Some(start), Some(end), &WorkWindow::full_day(), &h);
        let raw = raw_duration(Some(start), Some(end));
        prop_assert!(business <= full_day);
        prop_assert!(full_day <= raw);
    }

    #[test]
    fn splitting_an_interval_is_additive(a in instant(), b in instant(), c in instant(), h in holidays()) {
        let mut points = [a, b, c];
        points.sort();
        let [start, mid, end] = points;
        let window = WorkWindow::default();
        let whole = business_duration(Some(start), Some(end), &window, &h);
        let parts = business_duration(Some(start), Some(mid), &window, &h)
            + business_duration(Some(mid), Some(end), &window, &h);
        prop_assert_eq!(whole, parts);
    }

    #[test]
    fn all_holiday_span_is_zero(start_day in 0i64..50, len in 0i64..10, sh in 0u32..24, eh in 0u32..24) {
        let first = base().date() + chrono::Duration::days(start_day);
        let last = first + chrono::Duration::days(len);
        let start = first.and_hms_opt(sh, 0, 0).unwrap();
        let end = last.and_hms_opt(eh, 0, 0).unwrap();
        prop_assume!(start <= end);
        let h: HolidaySet = first.iter_days().take(len as usize + 1).collect();
        prop_assert_eq!(
            business_duration(Some(start), Some(end), &WorkWindow::full_day(), &h),
            Duration::ZERO
        );
    }
}
