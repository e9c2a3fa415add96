use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

use crate::event::Event;
use crate::layout::day::{DayLayout, day_layout};

pub const DAYS_PER_WEEK: i64 = 7;

/// Seven consecutive day columns. Each day packs its own columns; lanes are
/// never shared across days, and the now marker appears on at most one day.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekLayout {
    pub days: Vec<DayLayout>,
}

impl WeekLayout {
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.first().map(|day| day.date)
    }

    pub fn contains_now(&self) -> bool {
        self.days.iter().any(|day| day.now_marker.is_some())
    }
}

/// First day of the week containing `date`.
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() as i64
        - week_start.num_days_from_monday() as i64)
        % 7;
    date - Duration::days(offset)
}

/// Run the day layout independently for each of the 7 days starting at the
/// week containing `focus`.
pub fn week_layout(
    focus: NaiveDate,
    week_start: Weekday,
    events: &[Event],
    now: NaiveDateTime,
) -> WeekLayout {
    let start = start_of_week(focus, week_start);
    let days = (0..DAYS_PER_WEEK)
        .map(|offset| day_layout(start + Duration::days(offset), events, now))
        .collect();

    WeekLayout { days }
}
