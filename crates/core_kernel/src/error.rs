//! Kernel errors
//!
//! Domain crates wrap [`CoreError`] when a rounding or calendar helper
//! fails underneath one of their calculations.

use thiserror::Error;
use crate::calendar::CalendarError;
use crate::money::MoneyError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Arithmetic failed: {0}")]
    Money(#[from] MoneyError),

    #[error("Date arithmetic failed: {0}")]
    Calendar(#[from] CalendarError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_wraps_calendar_error() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let error: CoreError = CalendarError::OutOfRange { date, months: 1 }.into();

        assert!(matches!(error, CoreError::Calendar(_)));
        assert!(error.to_string().starts_with("Date arithmetic failed"));
    }
}
