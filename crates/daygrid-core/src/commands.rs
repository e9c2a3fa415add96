use anyhow::{Context, anyhow};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::dateexpr::{parse_date_expr, parse_datetime_expr};
use crate::drag::DragState;
use crate::event::{
    ColorTag, DEFAULT_DRAFT_MINUTES, Event, EventPatch, Recurrence, RecurrencePattern, occurs_on,
};
use crate::layout::{day_layout, mini_month, month_layout, week_layout};
use crate::navigate::{ViewMode, ViewState};
use crate::render::{Renderer, short_id};
use crate::search::SearchQuery;
use crate::store::{CalendarStore, SessionFile};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "agenda", "list", "info", "modify", "delete", "drag", "day", "week", "month",
        "view", "next", "prev", "today", "export", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(session, cfg, renderer, inv))]
pub fn dispatch(
    session: &SessionFile,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    // The only clock read in the crate; everything below takes `now`
    // explicitly.
    let now = Local::now().naive_local();
    dispatch_at(session, cfg, renderer, inv, now)
}

#[instrument(skip(session, cfg, renderer, inv, now))]
pub fn dispatch_at(
    session: &SessionFile,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let mut store = CalendarStore::from_events(session.load_events()?);
    let query = SearchQuery::parse(&inv.search_terms);
    let command = inv.command.as_str();

    debug!(
        command,
        search = ?inv.search_terms,
        args = ?inv.command_args,
        events = store.len(),
        "dispatching command"
    );

    match command {
        "add" => cmd_add(&mut store, session, &inv.command_args, now),
        "agenda" => cmd_agenda(&store, renderer, &query, &inv.command_args, now),
        "list" => cmd_list(&store, renderer, &query),
        "info" => cmd_info(&store, renderer, &inv.command_args),
        "modify" => cmd_modify(&mut store, session, &inv.command_args, now),
        "delete" => cmd_delete(&mut store, session, &inv.command_args),
        "drag" => cmd_drag(&mut store, session, &inv.command_args, now),
        "day" | "week" | "month" => cmd_switch_view(
            &store,
            session,
            cfg,
            renderer,
            &query,
            command,
            &inv.command_args,
            now,
        ),
        "view" => cmd_view(&store, session, cfg, renderer, &query, &inv.command_args, now),
        "next" => cmd_navigate(&store, session, cfg, renderer, &query, NavStep::Next, now),
        "prev" => cmd_navigate(&store, session, cfg, renderer, &query, NavStep::Previous, now),
        "today" => cmd_navigate(&store, session, cfg, renderer, &query, NavStep::Today, now),
        "export" => cmd_export(&store, &query),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, session, args, now))]
fn cmd_add(
    store: &mut CalendarStore,
    session: &SessionFile,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command add");

    let (title_words, mods) = parse_title_and_mods(args, now)?;
    if title_words.is_empty() {
        return Err(anyhow!("add: event title is required"));
    }

    // Defaults mirror the create gesture: next half hour, one hour long;
    // start:/end: mods override them.
    let mut draft = Event::draft_for_date(now.date(), now);
    draft.title = title_words.join(" ");
    apply_mods(&mut draft, &mods, now)?;

    let saved = store.create_event(draft)?;
    session.save_events(store.events())?;

    debug!(event_count = store.len(), "event added");
    println!("Created event {}.", short_id(&saved.id));
    Ok(())
}

#[instrument(skip(store, renderer, query, args, now))]
fn cmd_agenda(
    store: &CalendarStore,
    renderer: &mut Renderer,
    query: &SearchQuery,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command agenda");

    let date = match args.first() {
        Some(arg) => parse_date_expr(arg, now.date())?,
        None => now.date(),
    };

    let mut events: Vec<Event> = query
        .filter(store.events())
        .into_iter()
        .filter(|event| occurs_on(event, date))
        .collect();
    events.sort_by_key(|event| event.start);

    println!("{}", date.format("%A, %B %-d, %Y"));
    renderer.print_event_table(&events)?;
    Ok(())
}

#[instrument(skip(store, renderer, query))]
fn cmd_list(
    store: &CalendarStore,
    renderer: &mut Renderer,
    query: &SearchQuery,
) -> anyhow::Result<()> {
    info!("command list");

    let mut events = query.filter(store.events());
    events.sort_by_key(|event| event.start);
    renderer.print_event_table(&events)?;
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_info(
    store: &CalendarStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command info");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("info requires an event id"))?;
    let event = store.resolve_prefix(prefix)?;
    renderer.print_event_detail(event)?;
    Ok(())
}

#[instrument(skip(store, session, args, now))]
fn cmd_modify(
    store: &mut CalendarStore,
    session: &SessionFile,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command modify");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("modify requires an event id"))?;
    let current = store.resolve_prefix(prefix)?.clone();

    let (title_words, mods) = parse_title_and_mods(&args[1..], now)?;
    let mut patch = EventPatch::default();
    if !title_words.is_empty() {
        patch.title = Some(title_words.join(" "));
    }
    mods_into_patch(&mut patch, &mods, &current, now)?;

    if patch.is_empty() {
        return Err(anyhow!("modify: nothing to change"));
    }

    let updated = store.update_event(&current.id, &patch)?;
    session.save_events(store.events())?;
    println!("Modified event {}.", short_id(&updated.id));
    Ok(())
}

#[instrument(skip(store, session, args))]
fn cmd_delete(
    store: &mut CalendarStore,
    session: &SessionFile,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command delete");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("delete requires an event id"))?;
    let id = store.resolve_prefix(prefix)?.id.clone();

    let removed = store.delete_event(&id)?;
    session.save_events(store.events())?;
    println!("Deleted event {} ({}).", short_id(&removed.id), removed.title);
    Ok(())
}

/// Simulated pointer drop: `drag <id> drop:PX height:PX [grab:PX]
/// [day:DATE]`, routed through the same rescheduler a pointer gesture
/// uses.
#[instrument(skip(store, session, args, now))]
fn cmd_drag(
    store: &mut CalendarStore,
    session: &SessionFile,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command drag");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("drag requires an event id"))?;
    let id = store.resolve_prefix(prefix)?.id.clone();

    let mut drop_px: Option<f64> = None;
    let mut height_px: Option<f64> = None;
    let mut grab_px = 0.0_f64;
    let mut day = now.date();

    for arg in &args[1..] {
        let Some((key, value)) = arg.split_once(':') else {
            warn!(arg = %arg, "unrecognized drag argument ignored");
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "drop" => drop_px = Some(parse_pixels(value).context("invalid drop: value")?),
            "height" => height_px = Some(parse_pixels(value).context("invalid height: value")?),
            "grab" => grab_px = parse_pixels(value).context("invalid grab: value")?,
            "day" => day = parse_date_expr(value, now.date())?,
            other => warn!(key = %other, "unrecognized drag argument ignored"),
        }
    }

    let drop_px = drop_px.ok_or_else(|| anyhow!("drag requires drop:PX"))?;
    let height_px = height_px.ok_or_else(|| anyhow!("drag requires height:PX"))?;

    let mut drag = DragState::default();
    drag.begin(&id, grab_px);

    match drag.resolve_drop(store.events(), day, drop_px, height_px) {
        Some(patch) => {
            let updated = store.update_event(
                &patch.event_id,
                &EventPatch::reschedule(patch.start, patch.end),
            )?;
            session.save_events(store.events())?;
            println!(
                "Rescheduled event {} to {}.",
                short_id(&updated.id),
                updated.start.format("%Y-%m-%d %H:%M")
            );
        }
        None => {
            println!("Drop abandoned; nothing changed.");
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip(store, session, cfg, renderer, query, args, now))]
fn cmd_switch_view(
    store: &CalendarStore,
    session: &SessionFile,
    cfg: &Config,
    renderer: &mut Renderer,
    query: &SearchQuery,
    command: &str,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!(command, "command switch view");

    let mode = ViewMode::parse(command)
        .ok_or_else(|| anyhow!("internal: unknown view command {command}"))?;

    let mut view = session.load_view_state(now.date())?;
    view.set_mode(mode);
    if let Some(arg) = args.first() {
        view.focus = parse_date_expr(arg, now.date())?;
    }
    session.save_view_state(&view)?;

    render_current_view(store, cfg, renderer, query, &view, now)
}

#[instrument(skip(store, session, cfg, renderer, query, args, now))]
fn cmd_view(
    store: &CalendarStore,
    session: &SessionFile,
    cfg: &Config,
    renderer: &mut Renderer,
    query: &SearchQuery,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command view");

    let mut view = session.load_view_state(now.date())?;

    match args.first() {
        Some(raw) => {
            let mode = ViewMode::parse(raw)
                .ok_or_else(|| anyhow!("unknown view mode: {raw} (day, week or month)"))?;
            // Switching the mode never moves the focus date.
            view.set_mode(mode);
            session.save_view_state(&view)?;
            println!("{}: {}", view.mode.name(), view.title(cfg.week_start()));
        }
        None => {
            println!("{}: {}", view.mode.name(), view.title(cfg.week_start()));
            let events = query.filter(store.events());
            renderer.print_mini_month(&mini_month(view.focus, cfg.week_start(), &events, now))?;
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum NavStep {
    Next,
    Previous,
    Today,
}

#[instrument(skip(store, session, cfg, renderer, query, now))]
fn cmd_navigate(
    store: &CalendarStore,
    session: &SessionFile,
    cfg: &Config,
    renderer: &mut Renderer,
    query: &SearchQuery,
    step: NavStep,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!(?step, "command navigate");

    let mut view = session.load_view_state(now.date())?;
    match step {
        NavStep::Next => view.next(),
        NavStep::Previous => view.previous(),
        NavStep::Today => view.today(now.date()),
    }
    session.save_view_state(&view)?;

    render_current_view(store, cfg, renderer, query, &view, now)
}

fn render_current_view(
    store: &CalendarStore,
    cfg: &Config,
    renderer: &mut Renderer,
    query: &SearchQuery,
    view: &ViewState,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let week_start = cfg.week_start();
    let events = query.filter(store.events());
    let title = view.title(week_start);

    match view.mode {
        ViewMode::Day => {
            let layout = day_layout(view.focus, &events, now);
            renderer.print_day_layout(&title, &layout, &events)
        }
        ViewMode::Week => {
            let layout = week_layout(view.focus, week_start, &events, now);
            renderer.print_week_layout(&title, &layout, &events)
        }
        ViewMode::Month => {
            let layout = month_layout(view.focus, week_start, &events, now);
            renderer.print_month_layout(&title, &layout)
        }
    }
}

#[instrument(skip(store, query))]
fn cmd_export(store: &CalendarStore, query: &SearchQuery) -> anyhow::Result<()> {
    info!("command export");

    let events = query.filter(store.events());
    let payload = serde_json::to_string_pretty(&events)?;
    println!("{payload}");
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: daygrid [search terms] <command> [args]");
    println!();
    println!("  add <title> [start:EXPR] [end:EXPR] [at:PLACE] [desc:TEXT] [color:TAG]");
    println!("      [repeat:daily|weekly|monthly] [until:DATE]");
    println!("  agenda [DATE]          events on a date (default today)");
    println!("  list                   all events matching the search terms");
    println!("  info <id>              full detail for one event");
    println!("  modify <id> [fields]   edit an event");
    println!("  delete <id>            remove an event");
    println!("  drag <id> drop:PX height:PX [grab:PX] [day:DATE]");
    println!("                         simulated pointer drop, snapped to 15 minutes");
    println!("  day|week|month [DATE]  render a view and remember it");
    println!("  next | prev | today    move the remembered view");
    println!("  view [MODE]            show or switch the remembered view mode");
    println!("  export                 matching events as JSON");
    Ok(())
}

#[derive(Debug, Clone)]
enum Mod {
    Start(NaiveDateTime),
    End(NaiveDateTime),
    Location(Option<String>),
    Description(Option<String>),
    Color(Option<ColorTag>),
    Repeat(Option<RecurrencePattern>),
    Until(NaiveDate),
}

fn parse_title_and_mods(
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<(Vec<String>, Vec<Mod>)> {
    let mut words = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
            continue;
        }

        words.push(arg.clone());
    }

    Ok((words, mods))
}

fn parse_one_mod(tok: &str, now: NaiveDateTime) -> anyhow::Result<Option<Mod>> {
    let (key, value) = if let Some((k, v)) = tok.split_once(':') {
        (k, v)
    } else if let Some((k, v)) = tok.split_once('=') {
        (k, v)
    } else {
        return Ok(None);
    };

    let key = key.to_ascii_lowercase();

    match key.as_str() {
        "start" | "from" => Ok(Some(Mod::Start(parse_datetime_expr(value, now)?))),
        "end" | "to" => Ok(Some(Mod::End(parse_datetime_expr(value, now)?))),
        "at" | "location" => Ok(Some(Mod::Location(
            (!value.is_empty()).then(|| value.to_string()),
        ))),
        "desc" | "description" => Ok(Some(Mod::Description(
            (!value.is_empty()).then(|| value.to_string()),
        ))),
        "color" => {
            if value.is_empty() {
                return Ok(Some(Mod::Color(None)));
            }
            let tag = ColorTag::parse(value).ok_or_else(|| {
                anyhow!(
                    "unknown color: {value} (expected one of {})",
                    ColorTag::ALL.map(|c| c.name()).join(", ")
                )
            })?;
            Ok(Some(Mod::Color(Some(tag))))
        }
        "repeat" | "recur" => {
            if value.is_empty() {
                return Ok(Some(Mod::Repeat(None)));
            }
            let pattern = RecurrencePattern::parse(value)
                .ok_or_else(|| anyhow!("unknown repeat pattern: {value}"))?;
            Ok(Some(Mod::Repeat(Some(pattern))))
        }
        "until" => Ok(Some(Mod::Until(parse_date_expr(value, now.date())?))),
        _ => Ok(None),
    }
}

/// Apply mods to a fresh draft (add path). The `end` default tracks the
/// start unless an explicit end was given.
fn apply_mods(draft: &mut Event, mods: &[Mod], now: NaiveDateTime) -> anyhow::Result<()> {
    let mut explicit_end = false;
    let mut repeat: Option<Option<RecurrencePattern>> = None;
    let mut until: Option<NaiveDate> = None;

    for one_mod in mods {
        match one_mod {
            Mod::Start(start) => {
                draft.start = *start;
                if !explicit_end {
                    draft.end = *start + Duration::minutes(DEFAULT_DRAFT_MINUTES);
                }
            }
            Mod::End(end) => {
                draft.end = *end;
                explicit_end = true;
            }
            Mod::Location(location) => draft.location = location.clone(),
            Mod::Description(description) => draft.description = description.clone(),
            Mod::Color(color) => draft.color = *color,
            Mod::Repeat(pattern) => repeat = Some(*pattern),
            Mod::Until(date) => until = Some(*date),
        }
    }

    match (repeat, until) {
        (Some(Some(pattern)), until) => {
            draft.recurrence = Some(Recurrence::new(pattern, until, now.date()));
        }
        (Some(None), _) => draft.recurrence = None,
        (None, Some(_)) => {
            warn!("until: ignored without repeat:");
        }
        (None, None) => {}
    }

    Ok(())
}

/// Translate mods into a patch against an existing event (modify path).
fn mods_into_patch(
    patch: &mut EventPatch,
    mods: &[Mod],
    current: &Event,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let mut repeat: Option<Option<RecurrencePattern>> = None;
    let mut until: Option<NaiveDate> = None;

    for one_mod in mods {
        match one_mod {
            Mod::Start(start) => patch.start = Some(*start),
            Mod::End(end) => patch.end = Some(*end),
            Mod::Location(location) => patch.location = Some(location.clone()),
            Mod::Description(description) => patch.description = Some(description.clone()),
            Mod::Color(color) => patch.color = Some(*color),
            Mod::Repeat(pattern) => repeat = Some(*pattern),
            Mod::Until(date) => until = Some(*date),
        }
    }

    match (repeat, until) {
        (Some(Some(pattern)), until) => {
            patch.recurrence = Some(Some(Recurrence::new(pattern, until, now.date())));
        }
        (Some(None), _) => patch.recurrence = Some(None),
        (None, Some(end_date)) => {
            let pattern = current
                .recurrence
                .map(|recurrence| recurrence.pattern)
                .ok_or_else(|| anyhow!("until: requires a recurring event"))?;
            patch.recurrence = Some(Some(Recurrence { pattern, end_date }));
        }
        (None, None) => {}
    }

    Ok(())
}

fn parse_pixels(value: &str) -> anyhow::Result<f64> {
    let px = value
        .trim()
        .parse::<f64>()
        .map_err(|_| anyhow!("expected a pixel number, got: {value}"))?;
    if !px.is_finite() {
        return Err(anyhow!("pixel value must be finite: {value}"));
    }
    Ok(px)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{Mod, expand_command_abbrev, known_command_names, parse_title_and_mods};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .expect("valid date")
            .and_hms_opt(9, 0, 0)
            .expect("valid time")
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn abbreviations_expand_unambiguously() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("mon", &known), Some("month"));
        assert_eq!(expand_command_abbrev("ag", &known), Some("agenda"));
        assert_eq!(expand_command_abbrev("de", &known), Some("delete"));
        // "d" could be day, delete or drag.
        assert_eq!(expand_command_abbrev("d", &known), None);
        assert_eq!(expand_command_abbrev("zz", &known), None);
    }

    #[test]
    fn title_words_and_mods_separate() {
        let (words, mods) = parse_title_and_mods(
            &strings(&[
                "Property",
                "Viewing",
                "start:2026-03-12T10:00",
                "at:123 Main St",
                "color:green",
            ]),
            now(),
        )
        .expect("parse");

        assert_eq!(words, vec!["Property", "Viewing"]);
        assert_eq!(mods.len(), 3);
        assert!(matches!(mods[0], Mod::Start(_)));
        assert!(matches!(&mods[1], Mod::Location(Some(loc)) if loc == "123 Main St"));
    }

    #[test]
    fn literal_marker_turns_mods_into_words() {
        let (words, mods) =
            parse_title_and_mods(&strings(&["--", "start:finish", "sprint"]), now())
                .expect("parse");
        assert_eq!(words, vec!["start:finish", "sprint"]);
        assert!(mods.is_empty());
    }

    #[test]
    fn bad_mod_values_error_out() {
        assert!(parse_title_and_mods(&strings(&["x", "color:mauve"]), now()).is_err());
        assert!(parse_title_and_mods(&strings(&["x", "repeat:hourly"]), now()).is_err());
        assert!(parse_title_and_mods(&strings(&["x", "start:whenever"]), now()).is_err());
    }
}
