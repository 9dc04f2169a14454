//! In-memory event collection.
//!
//! Events are kept sorted by date and start time. Every occurrence of a
//! series is its own row, so editing or deleting one occurrence never
//! touches the others.

use crate::series::materialize;
use crate::{CalendarDate, Error, Event, EventDraft, RepeatInfo, Result};
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct Calendar {
    events: Vec<Event>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        let mut calendar = Self { events };
        calendar.sort();
        calendar
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn sort(&mut self) {
        self.events
            .sort_by_key(|e| (e.fields.date, e.fields.start_time, e.id));
    }

    /// Create the event(s) described by a draft; returns the new rows.
    pub fn add_draft(&mut self, draft: EventDraft, horizon_months: u32) -> Result<Vec<Event>> {
        let created = materialize(draft, horizon_months)?;
        self.events.extend(created.iter().cloned());
        self.sort();
        Ok(created)
    }

    /// Replace an existing row.
    ///
    /// Editing an occurrence detaches it from its series; the edited row
    /// becomes a one-off event. Returns the row as stored.
    pub fn update(&mut self, mut event: Event) -> Result<Event> {
        event.fields.validate()?;
        let slot = self
            .events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or(Error::NotFound(event.id))?;

        if slot.group_id().is_some() {
            tracing::debug!("Detaching event {} from its series", event.id);
            event.fields.repeat = RepeatInfo::none();
        }
        *slot = event.clone();
        self.sort();
        Ok(event)
    }

    /// Remove one row.
    pub fn delete(&mut self, id: Uuid) -> Result<Event> {
        let index = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or(Error::NotFound(id))?;
        Ok(self.events.remove(index))
    }

    /// Remove every row of a series; returns how many were removed.
    pub fn delete_series(&mut self, group_id: Uuid) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.group_id() != Some(group_id));
        let removed = before - self.events.len();
        tracing::info!("Deleted {} events of series {}", removed, group_id);
        removed
    }

    pub fn get(&self, id: Uuid) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn events_on(&self, date: CalendarDate) -> Vec<&Event> {
        self.events.iter().filter(|e| e.fields.date == date).collect()
    }

    /// Events within `start..=end`
    pub fn events_between(&self, start: CalendarDate, end: CalendarDate) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| crate::grid::is_in_range(e.fields.date, start, end))
            .collect()
    }

    /// Case-insensitive match on title, description or location.
    pub fn search(&self, term: &str) -> Vec<&Event> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.events.iter().collect();
        }
        self.events
            .iter()
            .filter(|e| {
                [&e.fields.title, &e.fields.description, &e.fields.location]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Other events whose time range intersects `event` on the same day.
    pub fn overlapping(&self, event: &Event) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|other| other.id != event.id)
            .filter(|other| {
                other.starts_at() < event.ends_at() && event.starts_at() < other.ends_at()
            })
            .collect()
    }
}
