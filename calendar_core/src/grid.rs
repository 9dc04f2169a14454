//! Month and week grid helpers for calendar views.

use crate::CalendarDate;
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Number of days in `month` (1-12) of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        // December of the last representable year
        .unwrap_or(31)
}

/// The seven dates, Sunday through Saturday, of the week containing `date`.
///
/// Saturates at the ends of the representable date range.
pub fn week_dates(date: CalendarDate) -> [CalendarDate; 7] {
    let offset = date.naive().weekday().num_days_from_sunday();
    let sunday = date
        .naive()
        .checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(NaiveDate::MIN);
    std::array::from_fn(|i| {
        sunday
            .checked_add_days(Days::new(i as u64))
            .unwrap_or(NaiveDate::MAX)
            .into()
    })
}

/// Sunday-first week rows for the month containing `date`.
///
/// Cells outside the month are `None`.
pub fn weeks_of_month(date: CalendarDate) -> Vec<[Option<u32>; 7]> {
    let days = days_in_month(date.year(), date.month());
    let first_weekday = date
        .naive()
        .with_day(1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0);

    let mut weeks = Vec::new();
    let mut week = [None; 7];
    for day in 1..=days {
        let column = ((first_weekday + day - 1) % 7) as usize;
        week[column] = Some(day);
        if column == 6 || day == days {
            weeks.push(week);
            week = [None; 7];
        }
    }
    weeks
}

/// Label for the week containing `date`, e.g. `2024-10 week 3`.
///
/// A week belongs to the month its Thursday falls in, and weeks are counted
/// from the first Thursday of that month.
pub fn week_label(date: CalendarDate) -> String {
    let naive = date.naive();
    let from_sunday = i64::from(naive.weekday().num_days_from_sunday());
    let thursday = naive + chrono::Duration::days(4 - from_sunday);

    let first_thursday = NaiveDate::from_weekday_of_month_opt(
        thursday.year(),
        thursday.month(),
        Weekday::Thu,
        1,
    )
    .unwrap_or(thursday);
    let week = (thursday - first_thursday).num_days() / 7 + 1;

    format!("{:04}-{:02} week {}", thursday.year(), thursday.month(), week)
}

/// Label for the month containing `date`, e.g. `2024-10`.
pub fn month_label(date: CalendarDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Whether `date` lies within `start..=end`.
pub fn is_in_range(date: CalendarDate, start: CalendarDate, end: CalendarDate) -> bool {
    start <= date && date <= end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> CalendarDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_week_dates_sunday_first() {
        // 2024-10-16 is a Wednesday
        let [sunday, monday, .., saturday] = week_dates(date("2024-10-16"));
        assert_eq!(sunday, date("2024-10-13"));
        assert_eq!(monday, date("2024-10-14"));
        assert_eq!(saturday, date("2024-10-19"));
    }

    #[test]
    fn test_week_dates_across_year() {
        let week = week_dates(date("2025-01-01"));
        assert_eq!(week[0], date("2024-12-29"));
        assert_eq!(week[6], date("2025-01-04"));
    }

    #[test]
    fn test_weeks_of_month() {
        // October 2024 starts on a Tuesday and has 31 days
        let weeks = weeks_of_month(date("2024-10-15"));
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0], [None, None, Some(1), Some(2), Some(3), Some(4), Some(5)]);
        assert_eq!(weeks[4][0], Some(27));
        assert_eq!(weeks[4][4], Some(31));
        assert_eq!(weeks[4][5], None);
    }

    #[test]
    fn test_week_label_uses_thursday_rule() {
        assert_eq!(week_label(date("2024-10-16")), "2024-10 week 3");
        assert_eq!(week_label(date("2024-10-01")), "2024-10 week 1");
        // Thursday of this week is 2025-01-02
        assert_eq!(week_label(date("2024-12-31")), "2025-01 week 1");
        // Thursday of this week is 2024-07-04, which is July's first Thursday
        assert_eq!(week_label(date("2024-06-30")), "2024-07 week 1");
    }

    #[test]
    fn test_month_label_and_range() {
        assert_eq!(month_label(date("2024-07-01")), "2024-07");
        assert!(is_in_range(date("2024-07-01"), date("2024-07-01"), date("2024-07-31")));
        assert!(is_in_range(date("2024-07-31"), date("2024-07-01"), date("2024-07-31")));
        assert!(!is_in_range(date("2024-08-01"), date("2024-07-01"), date("2024-07-31")));
    }
}
