//! Core domain types for the calendar.
//!
//! This module defines the fundamental types used throughout the system:
//! - Calendar dates and their `YYYY-MM-DD` wire form
//! - Recurrence frequency, interval, and end conditions
//! - Events, drafts, and their repeat information

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Calendar Date
// ============================================================================

/// A calendar day with no time-of-day component.
///
/// Ordering and equality depend only on the day. On the wire (JSON, CLI) a
/// date is always exactly `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Build a date from its components, failing on impossible days.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| Error::DateParse(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// The underlying chrono date
    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Combine with a time of day
    pub fn at(&self, time: NaiveTime) -> NaiveDateTime {
        self.0.and_time(time)
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl FromStr for CalendarDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shape_ok {
            return Err(Error::DateParse(s.to_string()));
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| Error::DateParse(s.to_string()))
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CalendarDate> for String {
    fn from(date: CalendarDate) -> Self {
        date.to_string()
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Parse an `HH:MM` time of day
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| Error::TimeParse(s.to_string()))
}

/// Serde adapter for `HH:MM` times
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Recurrence Rule Types
// ============================================================================

/// Unit of a recurrence step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for RecurrenceFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(Error::FrequencyParse(s.to_string())),
        }
    }
}

/// Number of frequency units advanced per step. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecurrenceInterval(NonZeroU32);

impl RecurrenceInterval {
    pub fn new(value: u32) -> Result<Self> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(Error::InvalidInterval(value))
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for RecurrenceInterval {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

/// A concrete bound on an expansion.
///
/// There is deliberately no unbounded variant: open-ended user input must be
/// turned into a bound (see [`RepeatEnd::bounded`]) before expanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndCondition {
    /// Stop once the candidate is strictly after this date
    ByDate(CalendarDate),
    /// Stop once this many occurrences have been emitted
    ByCount(NonZeroU32),
}

/// A complete recurrence rule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    pub interval: RecurrenceInterval,
    pub end: EndCondition,
}

/// End condition as entered by the user or stored with an event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepeatEnd {
    #[default]
    None,
    Date {
        date: CalendarDate,
    },
    Count {
        occurrences: u32,
    },
}

impl RepeatEnd {
    /// Resolve into a concrete bound, turning "no end" into a cutoff
    /// `horizon_months` after `start`.
    pub fn bounded(self, start: CalendarDate, horizon_months: u32) -> Result<EndCondition> {
        match self {
            RepeatEnd::None => {
                let cutoff = start
                    .naive()
                    .checked_add_months(chrono::Months::new(horizon_months))
                    .ok_or(Error::OutOfRange)?;
                Ok(EndCondition::ByDate(cutoff.into()))
            }
            bounded => EndCondition::try_from(bounded),
        }
    }
}

/// Largest occurrence count accepted for a count-bounded series
pub const MAX_OCCURRENCES: u32 = 10_000;

impl TryFrom<RepeatEnd> for EndCondition {
    type Error = Error;

    fn try_from(end: RepeatEnd) -> Result<Self> {
        match end {
            RepeatEnd::None => Err(Error::UnboundedExpansion),
            RepeatEnd::Date { date } => Ok(EndCondition::ByDate(date)),
            RepeatEnd::Count { occurrences } if occurrences > MAX_OCCURRENCES => {
                Err(Error::TooManyOccurrences(occurrences))
            }
            RepeatEnd::Count { occurrences } => NonZeroU32::new(occurrences)
                .map(EndCondition::ByCount)
                .ok_or(Error::InvalidOccurrenceCount),
        }
    }
}

// ============================================================================
// Event Types
// ============================================================================

/// Repeat type as stored with an event; `None` means a one-off event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatKind {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RepeatKind {
    pub fn frequency(&self) -> Option<RecurrenceFrequency> {
        match self {
            RepeatKind::None => None,
            RepeatKind::Daily => Some(RecurrenceFrequency::Daily),
            RepeatKind::Weekly => Some(RecurrenceFrequency::Weekly),
            RepeatKind::Monthly => Some(RecurrenceFrequency::Monthly),
            RepeatKind::Yearly => Some(RecurrenceFrequency::Yearly),
        }
    }
}

impl From<RecurrenceFrequency> for RepeatKind {
    fn from(frequency: RecurrenceFrequency) -> Self {
        match frequency {
            RecurrenceFrequency::Daily => RepeatKind::Daily,
            RecurrenceFrequency::Weekly => RepeatKind::Weekly,
            RecurrenceFrequency::Monthly => RepeatKind::Monthly,
            RecurrenceFrequency::Yearly => RepeatKind::Yearly,
        }
    }
}

/// Repeat information attached to every event row
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RepeatInfo {
    #[serde(rename = "type")]
    pub kind: RepeatKind,
    pub interval: u32,
    #[serde(default)]
    pub end: RepeatEnd,
    /// Shared by all rows materialized from one recurring draft
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
}

impl RepeatInfo {
    /// A one-off event
    pub fn none() -> Self {
        Self::default()
    }

    /// Frequency and interval if this describes an actual recurrence.
    ///
    /// Interval 0 is treated as "does not repeat", the same as `RepeatKind::None`.
    pub fn recurrence(&self) -> Option<(RecurrenceFrequency, RecurrenceInterval)> {
        let frequency = self.kind.frequency()?;
        let interval = RecurrenceInterval::new(self.interval).ok()?;
        Some((frequency, interval))
    }
}

/// Fields shared by an event and the draft it was created from
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub date: CalendarDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub repeat: RepeatInfo,
    #[serde(rename = "notificationTime")]
    pub notification_minutes: u32,
}

impl EventDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidEvent("title must not be empty".into()));
        }
        if self.start_time >= self.end_time {
            return Err(Error::InvalidEvent(format!(
                "start time {} must be before end time {}",
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M")
            )));
        }
        Ok(())
    }
}

/// A stored event row. Each occurrence of a series is its own row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: EventDraft,
}

impl Event {
    pub fn new(fields: EventDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.fields.date.at(self.fields.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.fields.date.at(self.fields.end_time)
    }

    pub fn group_id(&self) -> Option<Uuid> {
        self.fields.repeat.group_id
    }
}
