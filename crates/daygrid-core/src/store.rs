use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::event::{Event, EventPatch};
use crate::navigate::ViewState;

/// The in-memory event collection for the session. It exclusively owns the
/// set: views and the drag handler read snapshots via [`events`] and route
/// every mutation through [`create_event`] / [`update_event`] /
/// [`delete_event`]. Ids are assigned here on create.
///
/// [`events`]: CalendarStore::events
/// [`create_event`]: CalendarStore::create_event
/// [`update_event`]: CalendarStore::update_event
/// [`delete_event`]: CalendarStore::delete_event
#[derive(Debug, Clone, Default)]
pub struct CalendarStore {
    events: Vec<Event>,
}

impl CalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Read-only snapshot of the current set.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Persist a draft: validates, assigns the id, and returns the saved
    /// event. A draft that fails validation leaves the set untouched.
    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn create_event(&mut self, mut draft: Event) -> anyhow::Result<Event> {
        draft.validate_for_save()?;
        if !draft.is_draft() {
            return Err(anyhow!("event already has id {}", draft.id));
        }

        draft.id = Uuid::new_v4().simple().to_string();
        self.events.push(draft.clone());
        info!(id = %draft.id, "event created");
        Ok(draft)
    }

    /// Apply a patch to one event; used for both full edits and
    /// drag-driven start/end changes. Validation runs on the patched copy
    /// before anything is written back.
    #[tracing::instrument(skip(self, patch))]
    pub fn update_event(&mut self, id: &str, patch: &EventPatch) -> anyhow::Result<Event> {
        let idx = self
            .events
            .iter()
            .position(|event| event.id == id)
            .ok_or_else(|| anyhow!("no event with id {id}"))?;

        let mut updated = self.events[idx].clone();
        patch.apply(&mut updated);
        updated.validate_for_save()?;

        self.events[idx] = updated.clone();
        info!(id, "event updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_event(&mut self, id: &str) -> anyhow::Result<Event> {
        let idx = self
            .events
            .iter()
            .position(|event| event.id == id)
            .ok_or_else(|| anyhow!("no event with id {id}"))?;

        let removed = self.events.remove(idx);
        info!(id, "event deleted");
        Ok(removed)
    }

    /// Resolve a unique id prefix the way the CLI addresses events.
    pub fn resolve_prefix(&self, prefix: &str) -> anyhow::Result<&Event> {
        if prefix.is_empty() {
            return Err(anyhow!("event id must not be empty"));
        }

        let mut matches = self
            .events
            .iter()
            .filter(|event| event.id.starts_with(prefix));
        let first = matches
            .next()
            .ok_or_else(|| anyhow!("no event matching id {prefix}"))?;
        if matches.next().is_some() {
            return Err(anyhow!("ambiguous event id {prefix}"));
        }
        Ok(first)
    }
}

/// Filesystem collaborator used by the CLI shell: one JSONL file for the
/// event set, one small file for the persisted view state. The engine
/// itself never touches the filesystem; the shell hydrates a
/// [`CalendarStore`] from here and writes the set back after a mutation.
#[derive(Debug)]
pub struct SessionFile {
    pub data_dir: PathBuf,
    pub events_path: PathBuf,
    pub view_path: PathBuf,
}

impl SessionFile {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let events_path = data_dir.join("events.data");
        let view_path = data_dir.join("view.data");

        if !events_path.exists() {
            fs::write(&events_path, "")?;
        }
        if !view_path.exists() {
            fs::write(&view_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            events = %events_path.display(),
            view = %view_path.display(),
            "opened session files"
        );

        Ok(Self {
            data_dir,
            events_path,
            view_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_events(&self) -> anyhow::Result<Vec<Event>> {
        load_jsonl(&self.events_path).context("failed to load events.data")
    }

    #[tracing::instrument(skip(self, events))]
    pub fn save_events(&self, events: &[Event]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.events_path, events).context("failed to save events.data")
    }

    /// The persisted navigation state; a missing or empty file starts at
    /// the default view on today.
    #[tracing::instrument(skip(self))]
    pub fn load_view_state(&self, today: NaiveDate) -> anyhow::Result<ViewState> {
        let raw = fs::read_to_string(&self.view_path)
            .with_context(|| format!("failed reading {}", self.view_path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(ViewState::new(today));
        }
        serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {}", self.view_path.display()))
    }

    #[tracing::instrument(skip(self, view))]
    pub fn save_view_state(&self, view: &ViewState) -> anyhow::Result<()> {
        let payload = serde_json::to_string(view)?;
        fs::write(&self.view_path, payload)
            .with_context(|| format!("failed writing {}", self.view_path.display()))?;
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Event>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: Event = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(event);
    }

    debug!(count = out.len(), "loaded events from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, events))]
fn save_jsonl_atomic(path: &Path, events: &[Event]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = events.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for event in events {
        let serialized = serde_json::to_string(event)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
