//! Upcoming-event notifications.
//!
//! The tracker owns the set of events already notified, so each event is
//! announced at most once per tracker. It is persisted next to the events
//! file so separate `kal notify` runs share it.

use crate::{Error, Event, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A reminder that an event starts soon
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub event_id: Uuid,
    pub title: String,
    pub minutes_before: u32,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationTracker {
    #[serde(default)]
    notified: BTreeSet<Uuid>,
}

impl NotificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker file inside a data directory
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("notified.json")
    }

    /// Load the tracker, or start fresh if the file is missing or unreadable.
    ///
    /// Losing this file only means an event may be announced again, so a
    /// corrupt file is logged and replaced rather than reported.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        match serde_json::from_str(&content) {
            Ok(tracker) => Ok(tracker),
            Err(e) => {
                tracing::warn!("Corrupted notification state {:?}: {}; starting fresh", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Atomically write the tracker to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, self)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Forget ids of events that no longer exist.
    pub fn retain_known<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let known: BTreeSet<Uuid> = events.into_iter().map(|e| e.id).collect();
        self.notified.retain(|id| known.contains(id));
    }

    /// Notifications for events starting within their lead time of `now`.
    ///
    /// An event is due when it starts strictly after `now` and no more than
    /// `notification_minutes` later. Returned events are marked as notified.
    pub fn due<'a, I>(&mut self, events: I, now: NaiveDateTime) -> Vec<Notification>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut due = Vec::new();
        for event in events {
            if self.notified.contains(&event.id) {
                continue;
            }

            let lead = event.fields.notification_minutes;
            let seconds_until = (event.starts_at() - now).num_seconds();
            if seconds_until <= 0 || seconds_until > i64::from(lead) * 60 {
                continue;
            }

            self.notified.insert(event.id);
            due.push(Notification {
                event_id: event.id,
                title: event.fields.title.clone(),
                minutes_before: lead,
                message: format!("{} starts in {} minutes", event.fields.title, lead),
            });
        }

        if !due.is_empty() {
            tracing::debug!("{} notifications due at {}", due.len(), now);
        }
        due
    }

    pub fn is_notified(&self, id: Uuid) -> bool {
        self.notified.contains(&id)
    }

    pub fn reset(&mut self) {
        self.notified.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_time, EventDraft, RepeatInfo};

    fn event(start: &str, lead: u32) -> Event {
        Event::new(EventDraft {
            title: "Standup".into(),
            date: "2024-10-15".parse().unwrap(),
            start_time: parse_time(start).unwrap(),
            end_time: parse_time("11:00").unwrap(),
            description: String::new(),
            location: String::new(),
            category: String::new(),
            repeat: RepeatInfo::none(),
            notification_minutes: lead,
        })
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap()
    }

    #[test]
    fn test_due_within_lead_time() {
        let events = vec![event("09:00", 10)];
        let mut tracker = NotificationTracker::new();

        let due = tracker.due(&events, at("2024-10-15T08:50"));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].message, "Standup starts in 10 minutes");
        assert!(tracker.is_notified(events[0].id));
    }

    #[test]
    fn test_not_due_outside_window() {
        let events = vec![event("09:00", 10)];
        let mut tracker = NotificationTracker::new();

        assert!(tracker.due(&events, at("2024-10-15T08:49")).is_empty());
        assert!(tracker.due(&events, at("2024-10-15T09:00")).is_empty());
        assert!(tracker.due(&events, at("2024-10-15T09:05")).is_empty());
    }

    #[test]
    fn test_notified_once() {
        let events = vec![event("09:00", 10)];
        let mut tracker = NotificationTracker::new();

        assert_eq!(tracker.due(&events, at("2024-10-15T08:55")).len(), 1);
        assert!(tracker.due(&events, at("2024-10-15T08:56")).is_empty());

        tracker.reset();
        assert_eq!(tracker.due(&events, at("2024-10-15T08:57")).len(), 1);
    }

    #[test]
    fn test_saved_tracker_suppresses_repeat_notifications() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = NotificationTracker::path_in(temp_dir.path());
        let events = vec![event("09:00", 10)];

        let mut first_run = NotificationTracker::load(&path).unwrap();
        assert_eq!(first_run.due(&events, at("2024-10-15T08:55")).len(), 1);
        first_run.save(&path).unwrap();

        let mut second_run = NotificationTracker::load(&path).unwrap();
        assert_eq!(second_run, first_run);
        assert!(second_run.due(&events, at("2024-10-15T08:55")).is_empty());
    }

    #[test]
    fn test_corrupted_tracker_starts_fresh() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = NotificationTracker::path_in(temp_dir.path());
        std::fs::write(&path, "not json").unwrap();

        let tracker = NotificationTracker::load(&path).unwrap();
        assert_eq!(tracker, NotificationTracker::new());
    }

    #[test]
    fn test_retain_known_drops_deleted_events() {
        let kept = event("09:00", 10);
        let deleted = event("09:30", 45);
        let mut tracker = NotificationTracker::new();
        let both = vec![kept.clone(), deleted.clone()];
        assert_eq!(tracker.due(&both, at("2024-10-15T08:55")).len(), 2);

        tracker.retain_known(std::slice::from_ref(&kept));
        assert!(tracker.is_notified(kept.id));
        assert!(!tracker.is_notified(deleted.id));
    }
}
