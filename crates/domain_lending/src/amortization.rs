//! Amortization calculations
//!
//! Standard annuity formula with monthly compounding:
//!
//! ```text
//! M = P * r * (1 + r)^n / ((1 + r)^n - 1),   r = annual_rate / 12
//! ```
//!
//! Schedules carry the balance in whole cents. Each period's principal is
//! rounded before it is subtracted and the final period takes whatever is
//! left, so the principal column sums to the loan principal exactly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{add_months, checked_div, compound_factor, round2, LoanId, LoanScheduleId, Rate};
use crate::error::LendingError;
use crate::loan::{InterestType, PaymentFrequency};

/// Longest accepted term, one hundred years
pub const MAX_TERM_MONTHS: u32 = 1200;

fn validate_terms(principal: Decimal, annual_rate: Rate, term_months: u32) -> Result<(), LendingError> {
    if term_months == 0 {
        return Err(LendingError::InvalidInput("term must be at least one month".to_string()));
    }
    if term_months > MAX_TERM_MONTHS {
        return Err(LendingError::InvalidInput(format!(
            "term of {} months exceeds the {} month limit",
            term_months, MAX_TERM_MONTHS
        )));
    }
    if principal <= Decimal::ZERO {
        return Err(LendingError::InvalidInput(format!("principal must be positive, got {}", principal)));
    }
    if annual_rate.as_decimal() < Decimal::ZERO {
        return Err(LendingError::InvalidInput(format!("interest rate cannot be negative, got {}", annual_rate)));
    }
    Ok(())
}

/// Calculates the level monthly payment for a loan
///
/// A zero rate divides the principal evenly over the term.
///
/// # Errors
///
/// `InvalidInput` for a zero or over-long term, a non-positive principal or a negative
/// rate.
pub fn calculate_monthly_payment(
    principal: Decimal,
    annual_rate: Rate,
    term_months: u32,
) -> Result<Decimal, LendingError> {
    validate_terms(principal, annual_rate, term_months)?;

    if annual_rate.is_zero() {
        return Ok(round2(checked_div(principal, Decimal::from(term_months))?));
    }

    let r = annual_rate.monthly();
    let factor = compound_factor(r, term_months)?;
    let payment = checked_div(principal * r * factor, factor - Decimal::ONE)?;

    Ok(round2(payment))
}

/// Calculates the interest paid over the life of a loan
///
/// Simple interest is quoted on the original principal; compound interest is
/// what the level payments add up to beyond the principal.
pub fn calculate_total_interest(
    principal: Decimal,
    annual_rate: Rate,
    term_months: u32,
    interest_type: InterestType,
) -> Result<Decimal, LendingError> {
    validate_terms(principal, annual_rate, term_months)?;

    let interest = match interest_type {
        InterestType::Simple => {
            checked_div(annual_rate.apply(principal) * Decimal::from(term_months), Decimal::from(12))?
        }
        InterestType::Compound => {
            let payment = calculate_monthly_payment(principal, annual_rate, term_months)?;
            payment * Decimal::from(term_months) - principal
        }
    };

    Ok(round2(interest))
}

/// One period of a computed schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub period_number: u32,
    pub due_date: NaiveDate,
    pub principal_due: Decimal,
    pub interest_due: Decimal,
    pub total_due: Decimal,
    pub balance_after: Decimal,
}

/// Generates the payment schedule for a loan
///
/// Installments fall every `frequency.months_per_payment()` months from the
/// start date, each one `monthly_payment * months_per_payment`. Due dates are
/// always computed from the start date, so a loan starting on the 31st falls
/// due on the last day of shorter months without drifting.
pub fn generate_amortization_schedule(
    principal: Decimal,
    annual_rate: Rate,
    term_months: u32,
    start_date: NaiveDate,
    frequency: PaymentFrequency,
) -> Result<Vec<AmortizationRow>, LendingError> {
    let monthly_payment = calculate_monthly_payment(principal, annual_rate, term_months)?;

    let months_per_payment = frequency.months_per_payment();
    let payment_count = frequency.payment_count(term_months);
    let period_scale = Decimal::from(months_per_payment);
    let payment_amount = monthly_payment * period_scale;
    let period_rate = annual_rate.monthly() * period_scale;

    let mut balance = round2(principal);
    let mut rows = Vec::with_capacity(payment_count as usize);

    for period in 1..=payment_count {
        let interest_due = round2(balance * period_rate);
        let principal_due = if period == payment_count {
            balance
        } else {
            round2((payment_amount - interest_due).min(balance)).max(Decimal::ZERO)
        };
        balance -= principal_due;

        rows.push(AmortizationRow {
            period_number: period,
            due_date: add_months(start_date, period * months_per_payment)?,
            principal_due,
            interest_due,
            total_due: principal_due + interest_due,
            balance_after: balance,
        });
    }

    Ok(rows)
}

/// A persisted schedule row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: LoanScheduleId,
    pub loan_id: LoanId,
    pub period_number: u32,
    pub due_date: NaiveDate,
    pub principal_due: Decimal,
    pub interest_due: Decimal,
    pub total_due: Decimal,
    pub balance_after: Decimal,
    pub is_paid: bool,
    pub paid_date: Option<NaiveDate>,
}

impl ScheduleEntry {
    /// An unpaid entry for a computed row
    pub fn from_row(loan_id: LoanId, row: AmortizationRow) -> Self {
        Self {
            id: LoanScheduleId::new_v7(),
            loan_id,
            period_number: row.period_number,
            due_date: row.due_date,
            principal_due: row.principal_due,
            interest_due: row.interest_due,
            total_due: row.total_due,
            balance_after: row.balance_after,
            is_paid: false,
            paid_date: None,
        }
    }

    /// Marks the entry paid on `date`
    pub fn mark_paid(&mut self, date: NaiveDate) {
        self.is_paid = true;
        self.paid_date = Some(date);
    }
}
