use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Datelike;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::event::Event;
use crate::layout::{DayLayout, MiniCell, MonthLayout, WeekLayout};
use crate::timeaxis::fraction_to_minutes;

const MONTH_CELL_WIDTH: usize = 16;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, events))]
    pub fn print_event_table(&mut self, events: &[Event]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if events.is_empty() {
            writeln!(out, "No events.")?;
            return Ok(());
        }

        let headers = vec![
            "Id".to_string(),
            "Date".to_string(),
            "Time".to_string(),
            "Title".to_string(),
            "Location".to_string(),
            "Color".to_string(),
        ];

        let mut rows = Vec::with_capacity(events.len());
        for event in events {
            let id = self.paint(&short_id(&event.id), "33");
            let date = event.start.format("%Y-%m-%d").to_string();
            let time = format!(
                "{}-{}",
                event.start.format("%H:%M"),
                event.end.format("%H:%M")
            );
            let color_tag = event.color_or_default();
            let color = self.paint(color_tag.name(), color_tag.ansi_code());

            rows.push(vec![
                id,
                date,
                time,
                event.title.clone(),
                event.location.clone().unwrap_or_default(),
                color,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, event))]
    pub fn print_event_detail(&mut self, event: &Event) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", event.id)?;
        writeln!(out, "title       {}", event.title)?;
        writeln!(out, "start       {}", event.start.format("%Y-%m-%d %H:%M"))?;
        writeln!(out, "end         {}", event.end.format("%Y-%m-%d %H:%M"))?;
        writeln!(
            out,
            "location    {}",
            event.location.clone().unwrap_or_default()
        )?;
        writeln!(
            out,
            "description {}",
            event.description.clone().unwrap_or_default()
        )?;
        writeln!(out, "color       {}", event.color_or_default().name())?;

        if let Some(recurrence) = &event.recurrence {
            writeln!(
                out,
                "repeats     {} until {}",
                recurrence.pattern.name(),
                recurrence.end_date.format("%Y-%m-%d")
            )?;
        }

        Ok(())
    }

    /// One day column as 24 hour rows; events appear on the row their
    /// clipped display start falls in, with their lane share.
    #[tracing::instrument(skip(self, title, layout, events))]
    pub fn print_day_layout(
        &mut self,
        title: &str,
        layout: &DayLayout,
        events: &[Event],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", self.paint(title, "1"))?;
        let now_minutes = layout.now_marker.map(fraction_to_minutes);

        for hour in layout.hour_slots() {
            let mut labels: Vec<String> = Vec::new();
            for entry in &layout.entries {
                let start_min = fraction_to_minutes(entry.top);
                if start_min / 60 != i64::from(hour) {
                    continue;
                }
                let end_min = fraction_to_minutes(entry.top + entry.height);
                let mut label = format!(
                    "{:02}:{:02}-{:02}:{:02} [{}/{}] {}",
                    start_min / 60,
                    start_min % 60,
                    (end_min / 60).min(23),
                    if end_min / 60 > 23 { 59 } else { end_min % 60 },
                    entry.column + 1,
                    entry.column_count,
                    event_title(events, &entry.event_id),
                );
                if entry.show_location_label
                    && let Some(location) = event_location(events, &entry.event_id)
                {
                    label.push_str(&format!(" @ {location}"));
                }
                labels.push(label);
            }

            let marker = match now_minutes {
                Some(minutes) if minutes / 60 == i64::from(hour) => {
                    self.paint(&format!("  ◀ now {:02}:{:02}", minutes / 60, minutes % 60), "31")
                }
                _ => String::new(),
            };

            writeln!(out, "{hour:02}:00  {}{}", labels.join("; "), marker)?;
        }

        Ok(())
    }

    /// Week rendering: one block per day, events listed per lane.
    #[tracing::instrument(skip(self, title, layout, events))]
    pub fn print_week_layout(
        &mut self,
        title: &str,
        layout: &WeekLayout,
        events: &[Event],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", self.paint(title, "1"))?;
        for day in &layout.days {
            let head = day.date.format("%a %b %-d").to_string();
            let head = if day.now_marker.is_some() {
                self.paint(&head, "7")
            } else {
                head
            };
            writeln!(out, "{head}")?;

            if day.is_empty() {
                writeln!(out, "  (no events)")?;
                continue;
            }

            for entry in &day.entries {
                let start_min = fraction_to_minutes(entry.top);
                let end_min = fraction_to_minutes(entry.top + entry.height);
                writeln!(
                    out,
                    "  {:02}:{:02}-{:02}:{:02} [{}/{}] {}",
                    start_min / 60,
                    start_min % 60,
                    (end_min / 60).min(23),
                    if end_min / 60 > 23 { 59 } else { end_min % 60 },
                    entry.column + 1,
                    entry.column_count,
                    event_title(events, &entry.event_id),
                )?;
            }
        }

        Ok(())
    }

    /// Month grid: week rows of fixed-width cells, at most three event
    /// lines per cell plus the "+N more" summary.
    #[tracing::instrument(skip(self, title, layout))]
    pub fn print_month_layout(&mut self, title: &str, layout: &MonthLayout) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", self.paint(title, "1"))?;

        for week in layout.cells.chunks(7) {
            let mut cell_lines: Vec<Vec<String>> = Vec::with_capacity(7);
            for cell in week {
                let mut lines = Vec::new();
                let day_label = if cell.is_today {
                    format!("[{:>2}]", cell.date.day())
                } else if cell.in_focus_month {
                    format!(" {:>2} ", cell.date.day())
                } else {
                    format!(" {:>2}.", cell.date.day())
                };
                lines.push(day_label);

                for entry in &cell.visible {
                    lines.push(truncate_to_width(
                        &format!("{} {}", entry.start.format("%H:%M"), entry.title),
                        MONTH_CELL_WIDTH - 1,
                    ));
                }
                if cell.hidden_count > 0 {
                    lines.push(format!("+{} more", cell.hidden_count));
                }
                cell_lines.push(lines);
            }

            let depth = cell_lines.iter().map(Vec::len).max().unwrap_or(1);
            for row in 0..depth {
                for lines in &cell_lines {
                    let text = lines.get(row).map(String::as_str).unwrap_or("");
                    let padding = MONTH_CELL_WIDTH.saturating_sub(UnicodeWidthStr::width(text));
                    write!(out, "{}{}", text, " ".repeat(padding))?;
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    /// Compact month-at-a-glance: day numbers, a star on days that have
    /// events, today highlighted.
    #[tracing::instrument(skip(self, cells))]
    pub fn print_mini_month(&mut self, cells: &[MiniCell]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let header = cells
            .iter()
            .take(7)
            .map(|cell| cell.date.format("%a").to_string()[..2].to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{header}")?;
        for week in cells.chunks(7) {
            let row = week
                .iter()
                .map(|cell| {
                    let mut label = format!("{:>2}", cell.date.day());
                    if cell.is_today {
                        label = self.paint(&label, "7");
                    } else if !cell.in_focus_month {
                        label = self.paint(&label, "2");
                    }
                    if cell.has_events {
                        format!("{label}*")
                    } else {
                        format!("{label} ")
                    }
                })
                .collect::<Vec<_>>()
                .join("");
            writeln!(out, "{row}")?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn event_title<'a>(events: &'a [Event], id: &str) -> &'a str {
    events
        .iter()
        .find(|event| event.id == id)
        .map(|event| event.title.as_str())
        .unwrap_or("?")
}

fn event_location<'a>(events: &'a [Event], id: &str) -> Option<&'a str> {
    events
        .iter()
        .find(|event| event.id == id)
        .and_then(|event| event.location.as_deref())
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthStr::width(ch.to_string().as_str());
        if used + w > width.saturating_sub(1) {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
