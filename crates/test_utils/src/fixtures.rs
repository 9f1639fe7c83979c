//! Pre-built Test Fixtures
//!
//! Ready-to-use dates, amounts and identifiers shared by the ledger,
//! lending and banking suites. Values are fixed so that expected figures in
//! tests can be written down by hand.

use chrono::NaiveDate;
use core_kernel::{CompanyId, Rate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for calendar dates
pub struct DateFixtures;

impl DateFixtures {
    /// Start of the reference fiscal year (Jan 1, 2024)
    pub fn year_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// End of the reference fiscal year (Dec 31, 2024)
    pub fn year_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    /// A month end that needs day clamping when months are added
    pub fn january_31() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    /// Standard posting date
    pub fn posting_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    /// Standard statement date
    pub fn statement_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }
}

/// Fixture for amounts and rates
pub struct AmountFixtures;

impl AmountFixtures {
    /// Principal of the reference loan
    pub fn loan_principal() -> Decimal {
        dec!(120000)
    }

    /// Annual rate of the reference loan (12%)
    pub fn loan_rate() -> Rate {
        Rate::from_percentage(dec!(12))
    }

    /// Term of the reference loan in months
    pub fn loan_term() -> u32 {
        12
    }

    /// Monthly installment of the reference loan
    pub fn loan_payment() -> Decimal {
        dec!(10661.85)
    }

    /// Total of the reference annual prepaid expense
    pub fn annual_prepaid() -> Decimal {
        dec!(12000)
    }

    /// Standard sales tax rate (10%)
    pub fn sales_tax() -> Rate {
        Rate::from_percentage(dec!(10))
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a deterministic company ID for testing
    pub fn company_id() -> CompanyId {
        CompanyId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// A second company, for isolation tests
    pub fn other_company_id() -> CompanyId {
        CompanyId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }
}

/// Codes from the standard chart used throughout the suites
pub struct ChartCodes;

impl ChartCodes {
    pub const CASH: &'static str = "1000";
    pub const ACCOUNTS_RECEIVABLE: &'static str = "1100";
    pub const INVENTORY: &'static str = "1200";
    pub const PREPAID: &'static str = "1300";
    pub const ACCOUNTS_PAYABLE: &'static str = "2000";
    pub const SALES_TAX: &'static str = "2100";
    pub const LONG_TERM_DEBT: &'static str = "2500";
    pub const SALES: &'static str = "4000";
    pub const COGS: &'static str = "5000";
    pub const OTHER_EXPENSES: &'static str = "5900";
    pub const INTEREST_EXPENSE: &'static str = "6800";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_fixtures_ordering() {
        assert!(DateFixtures::year_start() < DateFixtures::posting_date());
        assert!(DateFixtures::posting_date() < DateFixtures::statement_date());
        assert!(DateFixtures::statement_date() < DateFixtures::year_end());
    }

    #[test]
    fn test_id_fixtures_are_deterministic() {
        assert_eq!(IdFixtures::company_id(), IdFixtures::company_id());
        assert_ne!(IdFixtures::company_id(), IdFixtures::other_company_id());
    }

    #[test]
    fn test_reference_loan_rate() {
        assert_eq!(AmountFixtures::loan_rate().as_decimal(), dec!(0.12));
    }
}
