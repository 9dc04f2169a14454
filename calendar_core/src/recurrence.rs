//! Recurrence engine: next-occurrence stepping and bounded expansion.
//!
//! Monthly steps are anchored on the day-of-month of the first occurrence.
//! A step that lands in a shorter month is clamped to that month's last day,
//! but the anchor itself is never replaced, so Jan 31 → Feb 29 → Mar 31.

use crate::grid::days_in_month;
use crate::{
    CalendarDate, EndCondition, Error, RecurrenceFrequency, RecurrenceInterval, RecurrenceRule,
    RepeatEnd, Result,
};
use chrono::{Datelike, Days, Months, NaiveDate};

/// Compute the occurrence after `current`.
///
/// `anchor_day` is the day-of-month of the series' first occurrence. It only
/// affects monthly steps: the result uses the anchor day, clamped to the last
/// day of the target month.
///
/// Yearly steps add whole calendar years to `current`. Feb 29 lands on
/// Feb 28 in a non-leap target year and the series stays on the 28th from
/// then on; the anchor is not consulted.
///
/// Fails only with [`Error::OutOfRange`] when the result is not representable.
pub fn next_occurrence(
    current: CalendarDate,
    frequency: RecurrenceFrequency,
    interval: RecurrenceInterval,
    anchor_day: u32,
) -> Result<CalendarDate> {
    let date = current.naive();
    let steps = interval.get();

    let next = match frequency {
        RecurrenceFrequency::Daily => date.checked_add_days(Days::new(u64::from(steps))),
        RecurrenceFrequency::Weekly => date.checked_add_days(Days::new(u64::from(steps) * 7)),
        RecurrenceFrequency::Monthly => shift_months_anchored(date, steps, anchor_day),
        RecurrenceFrequency::Yearly => steps
            .checked_mul(12)
            .and_then(|months| date.checked_add_months(Months::new(months))),
    };

    next.map(CalendarDate::from).ok_or(Error::OutOfRange)
}

/// Single step anchored on `current` itself.
///
/// This is the "preview next occurrence" form: the caller only knows one
/// date of the series, so its day-of-month is the anchor.
pub fn next_occurrence_from(
    current: CalendarDate,
    frequency: RecurrenceFrequency,
    interval: RecurrenceInterval,
) -> Result<CalendarDate> {
    next_occurrence(current, frequency, interval, current.day())
}

/// Move `months` months forward from the month of `date`, then pick the
/// anchor day (or the month's last day if the anchor doesn't exist there).
fn shift_months_anchored(date: NaiveDate, months: u32, anchor_day: u32) -> Option<NaiveDate> {
    let target_month = date.with_day(1)?.checked_add_months(Months::new(months))?;
    let last_day = days_in_month(target_month.year(), target_month.month());
    target_month.with_day(anchor_day.clamp(1, last_day))
}

/// Expand a rule into every occurrence date, starting with `start` itself.
///
/// The result is strictly increasing. `ByCount(n)` yields exactly `n` dates;
/// `ByDate(end)` yields every step up to and including `end`.
pub fn expand(start: CalendarDate, rule: &RecurrenceRule) -> Result<Vec<CalendarDate>> {
    let anchor_day = start.day();
    let mut dates = match rule.end {
        EndCondition::ByCount(n) => Vec::with_capacity(n.get().min(4096) as usize),
        EndCondition::ByDate(_) => Vec::new(),
    };
    let mut current = start;
    let mut count: u32 = 0;

    loop {
        match rule.end {
            EndCondition::ByDate(end) if current > end => break,
            EndCondition::ByCount(n) if count >= n.get() => break,
            _ => {}
        }

        dates.push(current);
        count += 1;

        // Don't step past the last counted occurrence; the step could
        // overflow for dates near the end of the calendar.
        if let EndCondition::ByCount(n) = rule.end {
            if count >= n.get() {
                break;
            }
        }

        current = match next_occurrence(current, rule.frequency, rule.interval, anchor_day) {
            Ok(next) => next,
            // Nothing representable lies beyond, so nothing is <= end either.
            Err(Error::OutOfRange) if matches!(rule.end, EndCondition::ByDate(_)) => break,
            Err(e) => return Err(e),
        };
    }

    tracing::debug!(
        "Expanded {:?} every {} from {} into {} occurrences",
        rule.frequency,
        rule.interval.get(),
        start,
        dates.len()
    );
    Ok(dates)
}

/// `YYYY-MM-DD` boundary for [`next_occurrence_from`].
pub fn next_occurrence_iso(
    current: &str,
    frequency: RecurrenceFrequency,
    interval: u32,
) -> Result<String> {
    let current: CalendarDate = current.parse()?;
    let interval = RecurrenceInterval::new(interval)?;
    Ok(next_occurrence_from(current, frequency, interval)?.to_string())
}

/// `YYYY-MM-DD` boundary for [`expand`].
///
/// `RepeatEnd::None` is rejected with [`Error::UnboundedExpansion`].
pub fn expand_iso(
    start: &str,
    frequency: RecurrenceFrequency,
    interval: u32,
    end: RepeatEnd,
) -> Result<Vec<String>> {
    let start: CalendarDate = start.parse()?;
    let rule = RecurrenceRule {
        frequency,
        interval: RecurrenceInterval::new(interval)?,
        end: EndCondition::try_from(end)?,
    };
    Ok(expand(start, &rule)?
        .into_iter()
        .map(|d| d.to_string())
        .collect())
}
