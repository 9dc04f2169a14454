//! Event persistence with file locking.
//!
//! The calendar is stored as a single JSON document. Every access goes
//! through a sibling lock file (`events.lock`): readers take a shared lock,
//! writers an exclusive one held across the whole load-modify-save. Writes
//! go to a temp file that is renamed over the original, so readers never see
//! a half-written file.

use crate::{Calendar, Error, Event, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage backend for the calendar
pub trait EventStore {
    fn load(&self) -> Result<Calendar>;
    fn save(&self, calendar: &Calendar) -> Result<()>;
}

/// On-disk document shape
#[derive(Debug, Default, Serialize, Deserialize)]
struct EventsFile {
    events: Vec<Event>,
}

/// JSON file store with shared/exclusive locking
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    /// Store at `<data_dir>/events.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("events.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Open (creating if needed) the lock file shared by all processes.
    fn open_lock(&self) -> Result<File> {
        std::fs::create_dir_all(self.parent_dir())?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    /// Load, modify and save back under one exclusive lock.
    ///
    /// Concurrent writers queue on the lock, so none of them overwrites
    /// another's changes. Nothing is written if `f` fails.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Calendar) -> Result<T>,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let mut calendar = self.read_document()?;
        let out = f(&mut calendar)?;
        self.write_document(&calendar)?;

        lock.unlock()?;
        Ok(out)
    }

    /// Read the document; the caller holds the lock.
    fn read_document(&self) -> Result<Calendar> {
        if !self.path.exists() {
            tracing::info!("No events file at {:?}, starting empty", self.path);
            return Ok(Calendar::new());
        }

        let mut contents = String::new();
        std::io::BufReader::new(File::open(&self.path)?).read_to_string(&mut contents)?;

        if contents.trim().is_empty() {
            return Ok(Calendar::new());
        }

        let parsed: EventsFile = serde_json::from_str(&contents).map_err(|e| {
            tracing::warn!("Failed to parse events file {:?}: {}", self.path, e);
            Error::Json(e)
        })?;

        tracing::debug!("Loaded {} events from {:?}", parsed.events.len(), self.path);
        Ok(Calendar::from_events(parsed.events))
    }

    /// Atomically replace the document; the caller holds the lock.
    fn write_document(&self, calendar: &Calendar) -> Result<()> {
        let temp = NamedTempFile::new_in(self.parent_dir())?;

        {
            let document = EventsFile {
                events: calendar.events().to_vec(),
            };
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, &document)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} events to {:?}", calendar.len(), self.path);
        Ok(())
    }
}

impl EventStore for JsonFileStore {
    /// Returns an empty calendar if the file doesn't exist.
    ///
    /// A corrupted file is an error; events are user data and are never
    /// silently replaced with an empty calendar.
    fn load(&self) -> Result<Calendar> {
        if !self.path.exists() {
            tracing::info!("No events file at {:?}, starting empty", self.path);
            return Ok(Calendar::new());
        }

        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let calendar = self.read_document();
        lock.unlock()?;
        calendar
    }

    fn save(&self, calendar: &Calendar) -> Result<()> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;
        self.write_document(calendar)?;
        lock.unlock()?;
        Ok(())
    }
}
