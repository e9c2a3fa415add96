//! Pure time-axis math shared by every view: a wall-clock instant maps to a
//! fraction of the 24-hour axis and back.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Last minute that still renders on the axis; events clipped at the far
/// edge of a day end here.
pub const LAST_AXIS_MINUTE: i64 = MINUTES_PER_DAY - 1;

pub fn minutes_since_midnight(t: NaiveDateTime) -> i64 {
    i64::from(t.time().hour()) * 60 + i64::from(t.time().minute())
}

/// Position of an instant on the axis as a fraction in [0, 1).
pub fn position_of(t: NaiveDateTime) -> f64 {
    minutes_since_midnight(t) as f64 / MINUTES_PER_DAY as f64
}

/// Inverse mapping used during drag: a fraction of the axis back to whole
/// minutes.
pub fn fraction_to_minutes(fraction: f64) -> i64 {
    (fraction * MINUTES_PER_DAY as f64).round() as i64
}

/// Display clipping: the minutes an event occupies on `day`'s own axis,
/// bounded to midnight..23:59. The stored start/end are never altered.
pub fn clipped_minutes(start: NaiveDateTime, end: NaiveDateTime, day: NaiveDate) -> (i64, i64) {
    let display_start = if start.date() == day {
        minutes_since_midnight(start)
    } else {
        0
    };
    let display_end = if end.date() == day {
        minutes_since_midnight(end)
    } else {
        LAST_AXIS_MINUTE
    };
    (display_start, display_end.max(display_start))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        LAST_AXIS_MINUTE, clipped_minutes, fraction_to_minutes, minutes_since_midnight,
        position_of,
    };

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date")
    }

    #[test]
    fn position_round_trips_through_minutes() {
        for minutes in [0_i64, 1, 59, 60, 719, 720, 1439] {
            let t = day()
                .and_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
                .expect("valid time");
            assert_eq!(fraction_to_minutes(position_of(t)), minutes);
            assert_eq!(minutes_since_midnight(t), minutes);
        }
    }

    #[test]
    fn position_is_monotonic_over_a_day() {
        let mut last = -1.0_f64;
        for hour in 0..24 {
            for minute in [0, 15, 30, 45] {
                let t = day().and_hms_opt(hour, minute, 0).expect("valid time");
                let pos = position_of(t);
                assert!(pos > last, "axis position must not decrease");
                assert!((0.0..1.0).contains(&pos));
                last = pos;
            }
        }
    }

    #[test]
    fn clipping_bounds_spanning_events_to_the_day() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 9)
            .expect("valid date")
            .and_hms_opt(22, 0, 0)
            .expect("valid time");
        let end = NaiveDate::from_ymd_opt(2026, 3, 11)
            .expect("valid date")
            .and_hms_opt(9, 30, 0)
            .expect("valid time");

        assert_eq!(clipped_minutes(start, end, day()), (0, LAST_AXIS_MINUTE));

        let same_day_end = day().and_hms_opt(9, 30, 0).expect("valid time");
        assert_eq!(clipped_minutes(start, same_day_end, day()), (0, 570));

        let same_day_start = day().and_hms_opt(22, 0, 0).expect("valid time");
        assert_eq!(
            clipped_minutes(same_day_start, end, day()),
            (1320, LAST_AXIS_MINUTE)
        );
    }
}
