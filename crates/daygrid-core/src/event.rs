use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Duration given to a freshly created draft when the gesture carries no end.
pub const DEFAULT_DRAFT_MINUTES: i64 = 60;

/// Days until a recurrence runs out when none was given.
pub const DEFAULT_RECURRENCE_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Blue,
    Green,
    Red,
    Yellow,
    Purple,
    Pink,
    Indigo,
    Orange,
}

impl ColorTag {
    pub const ALL: [ColorTag; 8] = [
        ColorTag::Blue,
        ColorTag::Green,
        ColorTag::Red,
        ColorTag::Yellow,
        ColorTag::Purple,
        ColorTag::Pink,
        ColorTag::Indigo,
        ColorTag::Orange,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "blue" => Some(ColorTag::Blue),
            "green" => Some(ColorTag::Green),
            "red" => Some(ColorTag::Red),
            "yellow" => Some(ColorTag::Yellow),
            "purple" => Some(ColorTag::Purple),
            "pink" => Some(ColorTag::Pink),
            "indigo" => Some(ColorTag::Indigo),
            "orange" => Some(ColorTag::Orange),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColorTag::Blue => "blue",
            ColorTag::Green => "green",
            ColorTag::Red => "red",
            ColorTag::Yellow => "yellow",
            ColorTag::Purple => "purple",
            ColorTag::Pink => "pink",
            ColorTag::Indigo => "indigo",
            ColorTag::Orange => "orange",
        }
    }

    /// ANSI foreground code used by the text renderer.
    pub fn ansi_code(self) -> &'static str {
        match self {
            ColorTag::Blue => "34",
            ColorTag::Green => "32",
            ColorTag::Red => "31",
            ColorTag::Yellow => "33",
            ColorTag::Purple => "35",
            ColorTag::Pink => "95",
            ColorTag::Indigo => "94",
            ColorTag::Orange => "91",
        }
    }
}

impl Default for ColorTag {
    fn default() -> Self {
        ColorTag::Blue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
}

impl RecurrencePattern {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(RecurrencePattern::Daily),
            "weekly" => Some(RecurrencePattern::Weekly),
            "monthly" => Some(RecurrencePattern::Monthly),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Monthly => "monthly",
        }
    }
}

/// Descriptor only: recurring events are stored with their pattern but are
/// never materialized into repeated instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub pattern: RecurrencePattern,
    pub end_date: NaiveDate,
}

impl Recurrence {
    pub fn new(pattern: RecurrencePattern, end_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        Self {
            pattern,
            end_date: end_date
                .unwrap_or(today + Duration::days(DEFAULT_RECURRENCE_WINDOW_DAYS)),
        }
    }
}

/// A calendar event on the local wall clock. An empty `id` marks a draft
/// that has not been saved yet; the store assigns the id on create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(with = "wall_clock_serde")]
    pub start: NaiveDateTime,

    #[serde(with = "wall_clock_serde")]
    pub end: NaiveDateTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorTag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl Event {
    /// Draft anchored to a clicked hour slot: starts on the hour, runs for
    /// the default duration.
    pub fn draft_at_hour(date: NaiveDate, hour: u32) -> Self {
        let start = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour.min(23)));
        Self::draft(start, start + Duration::minutes(DEFAULT_DRAFT_MINUTES))
    }

    /// Draft anchored to a clicked day cell (no hour): starts at `now`'s
    /// time rounded up to the next half hour on the clicked date.
    pub fn draft_for_date(date: NaiveDate, now: NaiveDateTime) -> Self {
        let minute = i64::from(now.time().minute());
        let rounded = if minute < 30 { 30 - minute } else { 60 - minute };
        let start = date.and_time(NaiveTime::MIN)
            + Duration::hours(i64::from(now.time().hour()))
            + Duration::minutes(minute + rounded);
        Self::draft(start, start + Duration::minutes(DEFAULT_DRAFT_MINUTES))
    }

    pub fn draft(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            start,
            end,
            location: None,
            description: None,
            color: None,
            recurrence: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_empty()
    }

    pub fn color_or_default(&self) -> ColorTag {
        self.color.unwrap_or_default()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Save-time validation: rejected before any mutation reaches the
    /// store, so no partial state is ever written.
    pub fn validate_for_save(&self) -> anyhow::Result<()> {
        if self.title.trim().is_empty() {
            anyhow::bail!("event title must not be empty");
        }
        if self.end <= self.start {
            anyhow::bail!(
                "event end ({}) must be after start ({})",
                self.end.format("%Y-%m-%d %H:%M"),
                self.start.format("%Y-%m-%d %H:%M")
            );
        }
        Ok(())
    }
}

/// Field-level patch routed through the store; `Some(None)` clears an
/// optional field.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub location: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<ColorTag>>,
    pub recurrence: Option<Option<Recurrence>>,
}

impl EventPatch {
    pub fn reschedule(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.recurrence.is_none()
    }

    pub fn apply(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(start) = self.start {
            event.start = start;
        }
        if let Some(end) = self.end {
            event.end = end;
        }
        if let Some(location) = &self.location {
            event.location = location.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(color) = self.color {
            event.color = color;
        }
        if let Some(recurrence) = self.recurrence {
            event.recurrence = recurrence;
        }
    }
}

pub mod wall_clock_serde {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// True when the event touches `day` at all: same-day start, same-day end,
/// or a span across it. Used by the day and week views.
pub fn occurs_on(event: &Event, day: NaiveDate) -> bool {
    event.start.date() <= day && day <= event.end.date()
}

/// Month-view membership: same-day start, or the day's midnight falls
/// inside [start, end).
pub fn occurs_in_month_cell(event: &Event, day: NaiveDate) -> bool {
    if event.start.date() == day {
        return true;
    }
    let midnight = day.and_time(NaiveTime::MIN);
    event.start <= midnight && midnight < event.end
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ColorTag, Event, EventPatch, occurs_in_month_cell, occurs_on};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn event(start: (u32, u32), end: (u32, u32)) -> Event {
        let day = date(2026, 3, 10);
        let mut e = Event::draft(
            day.and_hms_opt(start.0, start.1, 0).expect("valid start"),
            day.and_hms_opt(end.0, end.1, 0).expect("valid end"),
        );
        e.title = "Viewing".to_string();
        e
    }

    #[test]
    fn draft_at_hour_runs_one_hour() {
        let draft = Event::draft_at_hour(date(2026, 3, 10), 14);
        assert_eq!(draft.start, date(2026, 3, 10).and_hms_opt(14, 0, 0).expect("start"));
        assert_eq!(draft.end, date(2026, 3, 10).and_hms_opt(15, 0, 0).expect("end"));
        assert!(draft.is_draft());
    }

    #[test]
    fn draft_for_date_rounds_to_next_half_hour() {
        let now = date(2026, 3, 9).and_hms_opt(9, 12, 41).expect("now");
        let draft = Event::draft_for_date(date(2026, 3, 20), now);
        assert_eq!(draft.start, date(2026, 3, 20).and_hms_opt(9, 30, 0).expect("start"));

        let late = date(2026, 3, 9).and_hms_opt(23, 45, 0).expect("now");
        let rolled = Event::draft_for_date(date(2026, 3, 20), late);
        assert_eq!(rolled.start, date(2026, 3, 21).and_hms_opt(0, 0, 0).expect("start"));
    }

    #[test]
    fn validation_rejects_inverted_range_and_blank_title() {
        let mut e = event((11, 0), (10, 0));
        assert!(e.validate_for_save().is_err());

        e.end = e.start + chrono::Duration::hours(1);
        e.title = "  ".to_string();
        assert!(e.validate_for_save().is_err());

        e.title = "Inspection".to_string();
        assert!(e.validate_for_save().is_ok());
    }

    #[test]
    fn occurrence_covers_spanning_days() {
        let mut e = event((22, 0), (23, 0));
        e.end = date(2026, 3, 12).and_hms_opt(10, 0, 0).expect("end");

        assert!(occurs_on(&e, date(2026, 3, 10)));
        assert!(occurs_on(&e, date(2026, 3, 11)));
        assert!(occurs_on(&e, date(2026, 3, 12)));
        assert!(!occurs_on(&e, date(2026, 3, 13)));
    }

    #[test]
    fn month_cell_membership_is_half_open() {
        let mut e = event((22, 0), (23, 0));
        e.end = date(2026, 3, 12).and_hms_opt(0, 0, 0).expect("end");

        assert!(occurs_in_month_cell(&e, date(2026, 3, 11)));
        assert!(!occurs_in_month_cell(&e, date(2026, 3, 12)));
    }

    #[test]
    fn patch_clears_optional_fields() {
        let mut e = event((10, 0), (11, 0));
        e.location = Some("123 Main St".to_string());

        let patch = EventPatch {
            location: Some(None),
            color: Some(Some(ColorTag::Green)),
            ..EventPatch::default()
        };
        patch.apply(&mut e);

        assert_eq!(e.location, None);
        assert_eq!(e.color, Some(ColorTag::Green));
    }
}
