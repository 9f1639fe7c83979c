//! Money rounding and comparison
//!
//! Every monetary value that is stored or compared passes through [`round2`].
//! Balance checks never compare sums with `==`; they use [`approx_eq`], which
//! treats two amounts as equal when they differ by less than one cent.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of decimal places carried by stored monetary amounts
pub const MONEY_DP: u32 = 2;

/// Largest difference (exclusive) under which two amounts are considered equal
pub const MONEY_TOLERANCE: Decimal = dec!(0.01);

/// Errors that can occur during money calculations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Overflow during calculation")]
    Overflow,
}

/// Rounds to two decimal places, half away from zero
///
/// ```
/// use core_kernel::round2;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round2(dec!(2.345)), dec!(2.35));
/// assert_eq!(round2(dec!(-2.345)), dec!(-2.35));
/// ```
pub fn round2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true when `a` and `b` differ by less than [`MONEY_TOLERANCE`]
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

/// Returns true when the amount is within tolerance of zero
pub fn is_zero_money(x: Decimal) -> bool {
    approx_eq(x, Decimal::ZERO)
}

/// Divides, reporting a zero divisor instead of panicking
pub fn checked_div(numerator: Decimal, divisor: Decimal) -> Result<Decimal, MoneyError> {
    if divisor.is_zero() {
        return Err(MoneyError::DivisionByZero);
    }
    numerator.checked_div(divisor).ok_or(MoneyError::Overflow)
}

/// Computes `(1 + rate)^periods` by repeated squaring
pub fn compound_factor(rate: Decimal, periods: u32) -> Result<Decimal, MoneyError> {
    let mut base = Decimal::ONE + rate;
    let mut exp = periods;
    let mut acc = Decimal::ONE;

    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.checked_mul(base).ok_or(MoneyError::Overflow)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base).ok_or(MoneyError::Overflow)?;
        }
    }

    Ok(acc)
}

/// Represents a percentage rate (e.g., interest rate, tax rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate {
    /// The rate as a decimal (e.g., 0.12 for 12%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a decimal value (e.g., 0.12 for 12%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g., 14 for 14%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    /// A zero rate
    pub fn zero() -> Self {
        Self { value: Decimal::ZERO }
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Returns the rate as a percentage
    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// The monthly rate for an annual rate (`annual / 12`)
    pub fn monthly(&self) -> Decimal {
        self.value / dec!(12)
    }

    /// Returns true if the rate is zero
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Applies this rate to an amount, unrounded
    pub fn apply(&self, amount: Decimal) -> Decimal {
        amount * self.value
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(dec!(10.005)), dec!(10.01));
        assert_eq!(round2(dec!(10.004)), dec!(10.00));
        assert_eq!(round2(dec!(-0.125)), dec!(-0.13));
    }

    #[test]
    fn test_approx_eq_tolerance_is_exclusive() {
        assert!(approx_eq(dec!(100.00), dec!(100.009)));
        assert!(!approx_eq(dec!(100.00), dec!(100.01)));
    }

    #[test]
    fn test_compound_factor() {
        assert_eq!(compound_factor(dec!(0.1), 2).unwrap(), dec!(1.21));
        assert_eq!(compound_factor(dec!(0.05), 0).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_checked_div_zero() {
        assert_eq!(checked_div(dec!(1), Decimal::ZERO), Err(MoneyError::DivisionByZero));
    }

    #[test]
    fn test_rate_application() {
        let rate = Rate::from_percentage(dec!(14));
        assert_eq!(round2(rate.apply(dec!(1000))), dec!(140.00));
        assert_eq!(Rate::new(dec!(0.12)).monthly(), dec!(0.01));
    }
}
