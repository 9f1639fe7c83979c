//! Calendar month arithmetic
//!
//! Loan schedules and prepaid recognition both step through dates in whole
//! calendar months. Month addition clamps to the last day of the target
//! month, so `2024-01-31 + 1 month` is `2024-02-29`.

use chrono::{Datelike, Months, NaiveDate};
use thiserror::Error;

/// Errors related to calendar operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Date {date} plus {months} months is out of range")]
    OutOfRange { date: NaiveDate, months: u32 },

    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Adds whole calendar months to a date
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, CalendarError> {
    date.checked_add_months(Months::new(months))
        .ok_or(CalendarError::OutOfRange { date, months })
}

/// Counts the calendar months touched by `[start, end]`, never less than one
///
/// January 15 to March 10 counts January, February and March.
pub fn months_between_inclusive(start: NaiveDate, end: NaiveDate) -> u32 {
    let years = end.year() - start.year();
    let months = end.month() as i32 - start.month() as i32;
    let total = years * 12 + months + 1;
    total.max(1) as u32
}

/// Counts the period dates `start + k * period_months` (k = 0, 1, ...) that
/// fall on or before `as_of`, capped at `max_periods`
pub fn elapsed_periods(
    start: NaiveDate,
    as_of: NaiveDate,
    period_months: u32,
    max_periods: u32,
) -> u32 {
    let mut count = 0;
    while count < max_periods {
        match add_months(start, count * period_months) {
            Ok(period_date) if period_date <= as_of => count += 1,
            _ => break,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
        assert_eq!(add_months(date(2023, 1, 31), 1).unwrap(), date(2023, 2, 28));
        assert_eq!(add_months(date(2024, 11, 15), 3).unwrap(), date(2025, 2, 15));
    }

    #[test]
    fn test_months_between_inclusive() {
        assert_eq!(months_between_inclusive(date(2024, 1, 1), date(2024, 12, 31)), 12);
        assert_eq!(months_between_inclusive(date(2024, 1, 15), date(2024, 3, 10)), 3);
        assert_eq!(months_between_inclusive(date(2024, 5, 1), date(2024, 5, 20)), 1);
        assert_eq!(months_between_inclusive(date(2024, 5, 1), date(2023, 5, 1)), 1);
    }

    #[test]
    fn test_elapsed_periods() {
        let start = date(2024, 1, 1);
        assert_eq!(elapsed_periods(start, date(2023, 12, 31), 1, 12), 0);
        assert_eq!(elapsed_periods(start, start, 1, 12), 1);
        assert_eq!(elapsed_periods(start, date(2024, 3, 15), 1, 12), 3);
        assert_eq!(elapsed_periods(start, date(2030, 1, 1), 1, 12), 12);
        assert_eq!(elapsed_periods(start, date(2024, 7, 1), 3, 4), 3);
    }
}
