//! Property-Based Test Generators
//!
//! Proptest strategies for amounts, rates, terms and dates that stay inside
//! the ranges the ledger accepts.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Rate;
use domain_lending::{InterestType, PaymentFrequency};

/// Strategy for positive amounts in cents
pub fn positive_cents_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for positive two-decimal amounts (0.01 to 10,000,000.00)
pub fn money_strategy() -> impl Strategy<Value = Decimal> {
    positive_cents_strategy().prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for loan principals (1,000.00 to 10,000,000.00)
pub fn principal_strategy() -> impl Strategy<Value = Decimal> {
    (100_000i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for annual rates from 0% to 30% in basis points
pub fn annual_rate_strategy() -> impl Strategy<Value = Rate> {
    (0u32..=3000u32).prop_map(|bp| Rate::new(Decimal::new(bp as i64, 4)))
}

/// Strategy for loan terms from one month to thirty years
pub fn term_months_strategy() -> impl Strategy<Value = u32> {
    1u32..=360u32
}

pub fn interest_type_strategy() -> impl Strategy<Value = InterestType> {
    prop_oneof![Just(InterestType::Simple), Just(InterestType::Compound)]
}

pub fn payment_frequency_strategy() -> impl Strategy<Value = PaymentFrequency> {
    prop::sample::select(PaymentFrequency::ALL.to_vec())
}

/// Strategy for dates within 2020 to 2029
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3652i64).prop_map(|days| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(days))
}

/// Strategy for date ranges where the end is not before the start
pub fn date_range_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (date_strategy(), 0i64..1100i64).prop_map(|(start, length)| (start, start + Duration::days(length)))
}

/// Strategy for amounts that split a total into `count` positive parts
pub fn split_strategy(count: usize) -> impl Strategy<Value = Vec<Decimal>> {
    proptest::collection::vec(1i64..10_000_000i64, count..=count)
        .prop_map(|cents| cents.into_iter().map(|c| Decimal::new(c, 2)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_money_is_positive_with_two_places(amount in money_strategy()) {
            prop_assert!(amount > Decimal::ZERO);
            prop_assert!(amount.scale() <= 2);
        }

        #[test]
        fn test_date_range_is_ordered((start, end) in date_range_strategy()) {
            prop_assert!(start <= end);
        }

        #[test]
        fn test_rate_is_bounded(rate in annual_rate_strategy()) {
            prop_assert!(rate.as_decimal() >= Decimal::ZERO);
            prop_assert!(rate.as_decimal() <= Decimal::new(30, 2));
        }
    }
}
