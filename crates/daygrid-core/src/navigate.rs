use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::month::month_grid_bounds;
use crate::layout::week::start_of_week;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Day,
    Week,
    Month,
}

impl ViewMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" => Some(ViewMode::Day),
            "week" => Some(ViewMode::Week),
            "month" => Some(ViewMode::Month),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewMode::Day => "day",
            ViewMode::Week => "week",
            ViewMode::Month => "month",
        }
    }
}

/// The navigation state machine: a view mode plus the focus date it is
/// anchored on. Next/previous move by exactly one unit of the current
/// mode; switching modes never moves the focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub mode: ViewMode,
    pub focus: NaiveDate,
}

impl ViewState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            mode: ViewMode::Month,
            focus: today,
        }
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    /// Reset the focus to today without touching the view mode.
    pub fn today(&mut self, today: NaiveDate) {
        self.focus = today;
    }

    pub fn next(&mut self) {
        self.shift(1);
    }

    pub fn previous(&mut self) {
        self.shift(-1);
    }

    fn shift(&mut self, delta: i32) {
        let shifted = match self.mode {
            ViewMode::Day => Some(self.focus + Duration::days(i64::from(delta))),
            ViewMode::Week => Some(self.focus + Duration::weeks(i64::from(delta))),
            // Calendar-month arithmetic clamps the day-of-month; never a
            // fixed 30-day jump.
            ViewMode::Month => {
                if delta >= 0 {
                    self.focus.checked_add_months(Months::new(delta as u32))
                } else {
                    self.focus.checked_sub_months(Months::new(delta.unsigned_abs()))
                }
            }
        };
        if let Some(focus) = shifted {
            debug!(mode = self.mode.name(), from = %self.focus, to = %focus, "navigated");
            self.focus = focus;
        }
    }

    /// Inclusive first/last day of the rendered window.
    pub fn window(&self, week_start: Weekday) -> (NaiveDate, NaiveDate) {
        match self.mode {
            ViewMode::Day => (self.focus, self.focus),
            ViewMode::Week => {
                let start = start_of_week(self.focus, week_start);
                (start, start + Duration::days(6))
            }
            ViewMode::Month => month_grid_bounds(self.focus, week_start),
        }
    }

    /// Human-readable title for the current window. The week form drops
    /// the second month name when both bounds share a month.
    pub fn title(&self, week_start: Weekday) -> String {
        match self.mode {
            ViewMode::Day => self.focus.format("%A, %B %-d, %Y").to_string(),
            ViewMode::Week => {
                let start = start_of_week(self.focus, week_start);
                let end = start + Duration::days(6);
                if start.month() == end.month() {
                    format!("{} - {}", start.format("%b %-d"), end.format("%-d, %Y"))
                } else {
                    format!("{} - {}", start.format("%b %-d"), end.format("%b %-d, %Y"))
                }
            }
            ViewMode::Month => self.focus.format("%B %Y").to_string(),
        }
    }
}
