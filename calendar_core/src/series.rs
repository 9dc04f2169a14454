//! Turning event drafts into stored event rows.
//!
//! A recurring draft becomes one row per occurrence. All rows of a series
//! share a group id, but each row has its own id so a single occurrence can
//! later be edited or deleted on its own.

use crate::recurrence::expand;
use crate::{Event, EventDraft, RecurrenceRule, Result};
use uuid::Uuid;

/// Materialize a draft into the event rows to store.
///
/// Open-ended series are cut off `horizon_months` after the draft's date.
pub fn materialize(draft: EventDraft, horizon_months: u32) -> Result<Vec<Event>> {
    draft.validate()?;

    let Some((frequency, interval)) = draft.repeat.recurrence() else {
        let mut single = draft;
        single.repeat.group_id = None;
        return Ok(vec![Event::new(single)]);
    };

    let rule = RecurrenceRule {
        frequency,
        interval,
        end: draft.repeat.end.bounded(draft.date, horizon_months)?,
    };
    let dates = expand(draft.date, &rule)?;
    let group_id = Uuid::new_v4();

    let events: Vec<Event> = dates
        .into_iter()
        .map(|date| {
            let mut fields = draft.clone();
            fields.date = date;
            fields.repeat.group_id = Some(group_id);
            Event::new(fields)
        })
        .collect();

    tracing::info!(
        "Materialized {:?} series {} into {} events",
        frequency,
        group_id,
        events.len()
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_time, Error, RepeatEnd, RepeatInfo, RepeatKind};
    use std::collections::HashSet;

    fn draft(repeat: RepeatInfo) -> EventDraft {
        EventDraft {
            title: "Rent".into(),
            date: "2024-01-31".parse().unwrap(),
            start_time: parse_time("09:00").unwrap(),
            end_time: parse_time("09:30").unwrap(),
            description: "Pay rent".into(),
            location: String::new(),
            category: "personal".into(),
            repeat,
            notification_minutes: 10,
        }
    }

    #[test]
    fn test_single_event() {
        let events = materialize(draft(RepeatInfo::none()), 12).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fields.date.to_string(), "2024-01-31");
        assert!(events[0].group_id().is_none());
    }

    #[test]
    fn test_zero_interval_is_single_event() {
        let repeat = RepeatInfo {
            kind: RepeatKind::Weekly,
            interval: 0,
            end: RepeatEnd::Count { occurrences: 3 },
            group_id: None,
        };
        assert_eq!(materialize(draft(repeat), 12).unwrap().len(), 1);
    }

    #[test]
    fn test_series_rows_share_group_but_not_id() {
        let repeat = RepeatInfo {
            kind: RepeatKind::Monthly,
            interval: 1,
            end: RepeatEnd::Count { occurrences: 4 },
            group_id: None,
        };
        let events = materialize(draft(repeat), 12).unwrap();

        let dates: Vec<String> = events.iter().map(|e| e.fields.date.to_string()).collect();
        assert_eq!(dates, ["2024-01-31", "2024-02-29", "2024-03-31", "2024-04-30"]);

        let group = events[0].group_id().unwrap();
        assert!(events.iter().all(|e| e.group_id() == Some(group)));

        let ids: HashSet<_> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_open_ended_series_uses_horizon() {
        let repeat = RepeatInfo {
            kind: RepeatKind::Monthly,
            interval: 1,
            end: RepeatEnd::None,
            group_id: None,
        };
        let events = materialize(draft(repeat), 3).unwrap();
        // 2024-01-31 + 3 months = 2024-04-30, inclusive
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].fields.date.to_string(), "2024-04-30");
    }

    #[test]
    fn test_invalid_draft_rejected() {
        let mut bad = draft(RepeatInfo::none());
        bad.end_time = bad.start_time;
        assert!(matches!(materialize(bad, 12), Err(Error::InvalidEvent(_))));
    }
}
