//! Month stepping on plain calendar dates.
//!
//! Month arithmetic uses end-of-month clamping: when the target month is
//! shorter than the source day-of-month, the result is the target month's
//! last day (Jan 31 + 1 month = Feb 28, or Feb 29 in leap years).

use chrono::{Datelike, Months, NaiveDate};

/// whole calendar months from `start` to `end`, ignoring day-of-month
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
}

/// add months preserving day-of-month, clamped to the last day of the target month
///
/// Returns `None` only when the result falls outside chrono's supported range.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// move `date` to `day` within its own month, clamped to the month's last day
pub fn set_day_of_month(date: NaiveDate, day: u32) -> NaiveDate {
    let last = days_in_month(date.year(), date.month()).unwrap_or_else(|| date.day());
    date.with_day(day.clamp(1, last)).unwrap_or(date)
}

/// number of days in a month; `None` for an invalid month or out-of-range year
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_between_ignores_days() {
        assert_eq!(months_between(date(2025, 1, 1), date(2027, 1, 1)), 24);
        assert_eq!(months_between(date(2025, 1, 31), date(2025, 2, 1)), 1);
        assert_eq!(months_between(date(2025, 3, 15), date(2025, 3, 31)), 0);
        assert_eq!(months_between(date(2025, 11, 1), date(2026, 2, 1)), 3);
        assert_eq!(months_between(date(2026, 1, 1), date(2025, 1, 1)), -12);
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2025, 1, 31), 1), Some(date(2025, 2, 28)));
        assert_eq!(add_months(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(add_months(date(2025, 3, 31), 1), Some(date(2025, 4, 30)));
        assert_eq!(add_months(date(2025, 1, 15), 3), Some(date(2025, 4, 15)));
    }

    #[test]
    fn test_add_months_crosses_year() {
        assert_eq!(add_months(date(2025, 11, 30), 3), Some(date(2026, 2, 28)));
        assert_eq!(add_months(date(2025, 6, 1), 12), Some(date(2026, 6, 1)));
    }

    #[test]
    fn test_set_day_of_month() {
        assert_eq!(set_day_of_month(date(2025, 2, 10), 15), date(2025, 2, 15));
        assert_eq!(set_day_of_month(date(2025, 2, 10), 31), date(2025, 2, 28));
        assert_eq!(set_day_of_month(date(2024, 2, 10), 30), date(2024, 2, 29));
        assert_eq!(set_day_of_month(date(2025, 4, 30), 1), date(2025, 4, 1));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 1), Some(31));
        assert_eq!(days_in_month(2025, 2), Some(28));
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2025, 4), Some(30));
        assert_eq!(days_in_month(2025, 12), Some(31));
        assert_eq!(days_in_month(2025, 0), None);
        assert_eq!(days_in_month(2025, 13), None);
    }

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
    }
}
