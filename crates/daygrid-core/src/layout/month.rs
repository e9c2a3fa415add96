use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use tracing::trace;

use crate::event::{Event, occurs_in_month_cell};
use crate::layout::week::start_of_week;

/// Events shown per month cell before the remainder collapses into a
/// "+N more" summary.
pub const MAX_VISIBLE_PER_CELL: usize = 3;

/// One visible event inside a month cell, in start-time order. No column
/// packing at month granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthEntry {
    pub event_id: String,
    pub start: NaiveDateTime,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub in_focus_month: bool,
    pub is_today: bool,
    pub visible: Vec<MonthEntry>,
    /// Count behind the "+N more" summary; zero when nothing was truncated.
    pub hidden_count: usize,
}

/// The padded month grid: whole 7-day rows from the week containing the
/// 1st through the week containing the last day of the month. A cell click
/// is served by [`Event::draft_for_date`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonthLayout {
    pub focus: NaiveDate,
    pub cells: Vec<MonthCell>,
}

impl MonthLayout {
    pub fn week_rows(&self) -> usize {
        self.cells.len() / 7
    }
}

/// Grid bounds for the month containing `focus`: first and last displayed
/// day, both inclusive.
pub fn month_grid_bounds(focus: NaiveDate, week_start: Weekday) -> (NaiveDate, NaiveDate) {
    let first_of_month = focus.with_day(1).unwrap_or(focus);
    let last_of_month = last_day_of_month(focus.year(), focus.month());
    let grid_start = start_of_week(first_of_month, week_start);
    let grid_end = start_of_week(last_of_month, week_start) + Duration::days(6);
    (grid_start, grid_end)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|first| first - Duration::days(1))
        .unwrap_or(NaiveDate::MAX)
}

pub fn month_layout(
    focus: NaiveDate,
    week_start: Weekday,
    events: &[Event],
    now: NaiveDateTime,
) -> MonthLayout {
    let (grid_start, grid_end) = month_grid_bounds(focus, week_start);
    let today = now.date();

    let mut cells = Vec::new();
    let mut day = grid_start;
    while day <= grid_end {
        let mut day_events: Vec<&Event> = events
            .iter()
            .filter(|event| occurs_in_month_cell(event, day))
            .collect();
        day_events.sort_by_key(|event| event.start);

        let hidden_count = day_events.len().saturating_sub(MAX_VISIBLE_PER_CELL);
        let visible = day_events
            .iter()
            .take(MAX_VISIBLE_PER_CELL)
            .map(|event| MonthEntry {
                event_id: event.id.clone(),
                start: event.start,
                title: event.title.clone(),
            })
            .collect();

        cells.push(MonthCell {
            date: day,
            in_focus_month: day.month() == focus.month() && day.year() == focus.year(),
            is_today: day == today,
            visible,
            hidden_count,
        });
        day += Duration::days(1);
    }

    trace!(
        focus = %focus,
        cells = cells.len(),
        rows = cells.len() / 7,
        "month layout computed"
    );

    MonthLayout { focus, cells }
}

/// Compact month-at-a-glance cell for the side calendar: no event detail,
/// just whether any event starts that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiniCell {
    pub date: NaiveDate,
    pub in_focus_month: bool,
    pub is_today: bool,
    pub has_events: bool,
}

pub fn mini_month(
    focus: NaiveDate,
    week_start: Weekday,
    events: &[Event],
    now: NaiveDateTime,
) -> Vec<MiniCell> {
    let (grid_start, grid_end) = month_grid_bounds(focus, week_start);
    let today = now.date();

    let mut cells = Vec::new();
    let mut day = grid_start;
    while day <= grid_end {
        cells.push(MiniCell {
            date: day,
            in_focus_month: day.month() == focus.month() && day.year() == focus.year(),
            is_today: day == today,
            has_events: events.iter().any(|event| event.start.date() == day),
        });
        day += Duration::days(1);
    }
    cells
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

    use super::{MAX_VISIBLE_PER_CELL, last_day_of_month, mini_month, month_layout};
    use crate::event::Event;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn now() -> NaiveDateTime {
        date(2026, 4, 15).and_hms_opt(12, 0, 0).expect("now")
    }

    fn event_on(d: NaiveDate, hour: u32, title: &str) -> Event {
        let mut e = Event::draft(
            d.and_hms_opt(hour, 0, 0).expect("start"),
            d.and_hms_opt(hour + 1, 0, 0).expect("end"),
        );
        e.id = title.to_string();
        e.title = title.to_string();
        e
    }

    #[test]
    fn grid_is_whole_weeks_and_covers_the_month() {
        // April 2026: the 1st is a Wednesday, the 30th a Thursday. With a
        // Sunday week start that pads to 5 full rows.
        let layout = month_layout(date(2026, 4, 15), Weekday::Sun, &[], now());

        assert_eq!(layout.cells.len() % 7, 0);
        assert_eq!(layout.week_rows(), 5);
        assert_eq!(layout.cells.first().map(|c| c.date), Some(date(2026, 3, 29)));
        assert_eq!(layout.cells.last().map(|c| c.date), Some(date(2026, 5, 2)));

        for d in 1..=30 {
            assert!(
                layout.cells.iter().any(|cell| cell.date == date(2026, 4, d)),
                "day {d} missing from grid"
            );
        }

        let padded = layout.cells.iter().filter(|cell| !cell.in_focus_month).count();
        assert_eq!(padded, 35 - 30);
    }

    #[test]
    fn six_row_months_are_padded_too() {
        // August 2026 starts on a Saturday and has 31 days: 6 rows.
        let layout = month_layout(date(2026, 8, 1), Weekday::Sun, &[], now());
        assert_eq!(layout.week_rows(), 6);
        assert_eq!(layout.cells.len(), 42);
    }

    #[test]
    fn cells_sort_and_truncate_with_a_summary_count() {
        let day = date(2026, 4, 10);
        let events = vec![
            event_on(day, 15, "late"),
            event_on(day, 9, "early"),
            event_on(day, 12, "noon"),
            event_on(day, 11, "morning"),
            event_on(day, 18, "evening"),
        ];
        let layout = month_layout(date(2026, 4, 15), Weekday::Sun, &events, now());

        let cell = layout
            .cells
            .iter()
            .find(|cell| cell.date == day)
            .expect("cell for the 10th");

        assert_eq!(cell.visible.len(), MAX_VISIBLE_PER_CELL);
        assert_eq!(
            cell.visible.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
            vec!["early", "morning", "noon"]
        );
        assert_eq!(cell.hidden_count, 2);
    }

    #[test]
    fn today_flag_follows_the_explicit_now() {
        let layout = month_layout(date(2026, 4, 1), Weekday::Sun, &[], now());
        let todays: Vec<NaiveDate> = layout
            .cells
            .iter()
            .filter(|cell| cell.is_today)
            .map(|cell| cell.date)
            .collect();
        assert_eq!(todays, vec![date(2026, 4, 15)]);
    }

    #[test]
    fn last_day_handles_year_end() {
        assert_eq!(last_day_of_month(2026, 12).day(), 31);
        assert_eq!(last_day_of_month(2026, 2).day(), 28);
        assert_eq!(last_day_of_month(2028, 2).day(), 29);
    }

    #[test]
    fn mini_month_marks_days_with_starts_only() {
        let mut spanning = event_on(date(2026, 4, 9), 22, "span");
        spanning.end = date(2026, 4, 11).and_hms_opt(10, 0, 0).expect("end");

        let cells = mini_month(date(2026, 4, 15), Weekday::Sun, &[spanning], now());
        let marked: Vec<NaiveDate> = cells
            .iter()
            .filter(|cell| cell.has_events)
            .map(|cell| cell.date)
            .collect();
        assert_eq!(marked, vec![date(2026, 4, 9)]);
    }
}
