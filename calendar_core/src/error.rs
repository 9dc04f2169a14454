//! Error types for the calendar_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for calendar_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A date string was not a valid `YYYY-MM-DD` calendar date
    #[error("Invalid date {0:?}: expected YYYY-MM-DD")]
    DateParse(String),

    /// A frequency string was not daily, weekly, monthly or yearly
    #[error("Unknown frequency {0:?}: expected daily, weekly, monthly or yearly")]
    FrequencyParse(String),

    /// A time string was not a valid `HH:MM` time of day
    #[error("Invalid time {0:?}: expected HH:MM")]
    TimeParse(String),

    /// Recurrence interval must be at least 1
    #[error("Invalid recurrence interval {0}: must be at least 1")]
    InvalidInterval(u32),

    /// Count-bounded recurrence must produce at least one occurrence
    #[error("Invalid occurrence count: must be at least 1")]
    InvalidOccurrenceCount,

    /// Count-bounded recurrence asked for more rows than a series may hold
    #[error("Too many occurrences: {0} (at most {max})", max = crate::types::MAX_OCCURRENCES)]
    TooManyOccurrences(u32),

    /// Expansion was requested without an end date or occurrence count
    #[error("Recurrence has no end condition; refusing unbounded expansion")]
    UnboundedExpansion,

    /// Date arithmetic left the representable calendar range
    #[error("Date out of representable range")]
    OutOfRange,

    /// Event failed validation
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// No event with the given id
    #[error("Event not found: {0}")]
    NotFound(Uuid),
}
