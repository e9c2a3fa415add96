use chrono::{NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::event::{Event, occurs_on};
use crate::layout::pack::{AxisInterval, pack};
use crate::layout::{LOCATION_LABEL_MIN_HEIGHT, LayoutEntry, TIME_LABEL_MIN_HEIGHT};
use crate::timeaxis::{MINUTES_PER_DAY, clipped_minutes, position_of};

pub const HOURS_PER_DAY: u32 = 24;

/// One day column: positioned entries over a full 24-hour axis. Every hour
/// slot is present even with zero events; a slot click is served by
/// [`Event::draft_at_hour`].
#[derive(Debug, Clone, PartialEq)]
pub struct DayLayout {
    pub date: NaiveDate,
    pub entries: Vec<LayoutEntry>,
    /// Axis fraction of the current instant, only when `date` is today.
    pub now_marker: Option<f64>,
}

impl DayLayout {
    pub fn hour_slots(&self) -> impl Iterator<Item = u32> {
        0..HOURS_PER_DAY
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lay out every event touching `date`. Clips spanning events to the day's
/// own axis, converts to fractions, and packs overlaps into columns in one
/// pass over the whole day.
pub fn day_layout(date: NaiveDate, events: &[Event], now: NaiveDateTime) -> DayLayout {
    let mut day_events: Vec<(&Event, i64, i64)> = events
        .iter()
        .filter(|event| occurs_on(event, date))
        .map(|event| {
            let (start_min, end_min) = clipped_minutes(event.start, event.end, date);
            (event, start_min, end_min)
        })
        .collect();
    day_events.sort_by_key(|(_, start_min, _)| *start_min);

    let intervals: Vec<AxisInterval> = day_events
        .iter()
        .map(|(_, start_min, end_min)| AxisInterval {
            start_min: *start_min,
            end_min: *end_min,
        })
        .collect();
    let packing = pack(&intervals);

    let entries = day_events
        .iter()
        .zip(packing.columns.iter())
        .map(|((event, start_min, end_min), &column)| {
            let top = *start_min as f64 / MINUTES_PER_DAY as f64;
            let height = (*end_min - *start_min) as f64 / MINUTES_PER_DAY as f64;
            LayoutEntry {
                event_id: event.id.clone(),
                top,
                height,
                column,
                column_count: packing.column_count,
                show_time_label: height > TIME_LABEL_MIN_HEIGHT,
                show_location_label: height > LOCATION_LABEL_MIN_HEIGHT,
            }
        })
        .collect::<Vec<_>>();

    trace!(
        date = %date,
        events = entries.len(),
        columns = packing.column_count,
        "day layout computed"
    );

    DayLayout {
        date,
        entries,
        now_marker: (now.date() == date).then(|| position_of(now)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::day_layout;
    use crate::event::Event;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        date(d).and_hms_opt(h, m, 0).expect("valid time")
    }

    fn event(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> Event {
        let mut e = Event::draft(start, end);
        e.id = id.to_string();
        e.title = id.to_string();
        e
    }

    #[test]
    fn empty_day_still_covers_the_axis() {
        let layout = day_layout(date(10), &[], at(10, 12, 0));
        assert!(layout.is_empty());
        assert_eq!(layout.hour_slots().count(), 24);
        assert_eq!(layout.now_marker, Some(0.5));
    }

    #[test]
    fn overlapping_events_split_the_width() {
        let events = vec![
            event("a", at(10, 10, 0), at(10, 11, 30)),
            event("b", at(10, 10, 30), at(10, 12, 0)),
        ];
        let layout = day_layout(date(10), &events, at(1, 0, 0));

        assert_eq!(layout.entries.len(), 2);
        assert_eq!(layout.entries[0].column_count, 2);
        assert_eq!(layout.entries[0].column, 0);
        assert_eq!(layout.entries[1].column, 1);
        assert!((layout.entries[0].width_percent() - 50.0).abs() < f64::EPSILON);
        assert!((layout.entries[1].left_percent() - 50.0).abs() < f64::EPSILON);
        assert_eq!(layout.now_marker, None);
    }

    #[test]
    fn entry_geometry_matches_the_event_times() {
        let events = vec![event("a", at(10, 6, 0), at(10, 9, 0))];
        let layout = day_layout(date(10), &events, at(10, 0, 0));

        let entry = &layout.entries[0];
        assert!((entry.top - 0.25).abs() < 1e-9);
        assert!((entry.height - 0.125).abs() < 1e-9);
        assert!(entry.show_time_label);
        assert!(entry.show_location_label);
    }

    #[test]
    fn short_events_suppress_sub_labels() {
        // 30 minutes is ~2% of the axis: no sub-labels at all.
        let tiny = vec![event("a", at(10, 9, 0), at(10, 9, 30))];
        let layout = day_layout(date(10), &tiny, at(1, 0, 0));
        assert!(!layout.entries[0].show_time_label);
        assert!(!layout.entries[0].show_location_label);

        // Two hours is ~8.3%: time label yes, location still suppressed.
        let mid = vec![event("a", at(10, 9, 0), at(10, 11, 0))];
        let layout = day_layout(date(10), &mid, at(1, 0, 0));
        assert!(layout.entries[0].show_time_label);
        assert!(!layout.entries[0].show_location_label);
    }

    #[test]
    fn spanning_event_is_clipped_not_moved() {
        let events = vec![event("a", at(9, 22, 0), at(11, 10, 0))];
        let layout = day_layout(date(10), &events, at(1, 0, 0));

        let entry = &layout.entries[0];
        assert!((entry.top - 0.0).abs() < f64::EPSILON);
        assert!(entry.height > 0.99);
        // The stored event keeps its real bounds.
        assert_eq!(events[0].start, at(9, 22, 0));
    }

    #[test]
    fn events_on_other_days_are_ignored() {
        let events = vec![
            event("a", at(10, 10, 0), at(10, 11, 0)),
            event("b", at(12, 10, 0), at(12, 11, 0)),
        ];
        let layout = day_layout(date(10), &events, at(1, 0, 0));
        assert_eq!(layout.entries.len(), 1);
        assert_eq!(layout.entries[0].event_id, "a");
    }
}
