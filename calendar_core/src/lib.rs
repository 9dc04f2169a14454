#![forbid(unsafe_code)]

//! Core model and logic for the kal calendar.
//!
//! This crate provides:
//! - Calendar date model and recurrence rule types
//! - Recurrence engine (next occurrence, bounded expansion)
//! - Series materialization and the in-memory calendar
//! - JSON file persistence
//! - Month/week grid helpers and notifications

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod grid;
pub mod recurrence;
pub mod series;
pub mod calendar;
pub mod store;
pub mod notify;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use recurrence::{expand, next_occurrence, next_occurrence_from};
pub use calendar::Calendar;
pub use store::{EventStore, JsonFileStore};
pub use notify::{Notification, NotificationTracker};
