//! Date and time expressions accepted by CLI arguments. Everything is
//! local wall clock; `now` is always passed in by the caller.

use anyhow::{Context, anyhow};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

/// Calendar-date expression: `today`, `tomorrow`, `yesterday`, a weekday
/// name (next occurrence), or `YYYY-MM-DD`.
#[tracing::instrument(fields(input = input))]
pub fn parse_date_expr(input: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    if let Some(target) = parse_weekday_name(&lower) {
        return Ok(next_weekday_date(today, target));
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Ok(date);
    }

    Err(anyhow!("unrecognized date expression: {input}")).with_context(|| {
        "supported formats: today/tomorrow/yesterday, weekday names (e.g. monday), YYYY-MM-DD"
    })
}

/// Instant expression: a date expression (midnight), `YYYY-MM-DDTHH:MM`,
/// `YYYY-MM-DD HH:MM`, or a bare clock time (`15:23`, `3:23pm`) on today.
#[tracing::instrument(fields(input = input))]
pub fn parse_datetime_expr(input: &str, now: NaiveDateTime) -> anyhow::Result<NaiveDateTime> {
    let token = input.trim();

    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(token, fmt) {
            return Ok(ndt);
        }
    }

    if let Some((hour, minute)) = parse_clock_time(token) {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow!("invalid clock time: {input}"))?;
        return Ok(now.date().and_time(time));
    }

    if let Ok(date) = parse_date_expr(token, now.date()) {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(anyhow!("unrecognized time expression: {input}")).with_context(|| {
        "supported formats: date expressions, YYYY-MM-DDTHH:MM, YYYY-MM-DD HH:MM, \
         clock times (e.g. 15:23 or 3:23pm)"
    })
}

fn parse_weekday_name(token: &str) -> Option<Weekday> {
    match token.trim() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn next_weekday_date(from: NaiveDate, target: Weekday) -> NaiveDate {
    let from_idx = from.weekday().num_days_from_monday() as i64;
    let target_idx = target.num_days_from_monday() as i64;
    let mut delta = (7 + target_idx - from_idx) % 7;
    if delta == 0 {
        delta = 7;
    }
    from + Duration::days(delta)
}

fn parse_clock_time(token: &str) -> Option<(u32, u32)> {
    let clock_re = Regex::new(r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$").ok()?;
    let captures = clock_re.captures(token.trim())?;

    let raw_hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = if let Some(ampm_match) = captures.name("ampm") {
        let ampm = ampm_match.as_str().to_ascii_lowercase();
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        match ampm.as_str() {
            "am" => {
                if raw_hour == 12 {
                    0
                } else {
                    raw_hour
                }
            }
            "pm" => {
                if raw_hour == 12 {
                    12
                } else {
                    raw_hour + 12
                }
            }
            _ => return None,
        }
    } else {
        if raw_hour > 23 {
            return None;
        }
        raw_hour
    };

    Some((hour, minute))
}
