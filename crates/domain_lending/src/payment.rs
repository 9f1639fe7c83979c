//! Loan payment allocation
//!
//! A payment settles the month's interest on the remaining balance first and
//! applies the rest to principal.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{round2, JournalEntryId, LoanId, LoanPaymentId, Rate};

/// How a payment splits between interest and principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    /// One month's interest on the balance before the payment
    pub interest_due: Decimal,
    pub interest_part: Decimal,
    pub principal_part: Decimal,
    pub total_payment: Decimal,
    /// Remaining balance after the payment, never negative
    pub balance_after: Decimal,
}

/// Splits a payment against a loan's remaining balance
///
/// `interest_part + principal_part == total_payment` always. A payment
/// smaller than the interest due goes entirely to interest.
///
/// The interest due is rounded to cents before the split, so `interest_part`
/// is bounded by the rounded figure and may exceed the exact
/// `remaining × rate / 12` by up to half a cent.
pub fn allocate_payment(remaining: Decimal, annual_rate: Rate, total_payment: Decimal) -> PaymentAllocation {
    let total_payment = round2(total_payment);
    let interest_due = round2(remaining * annual_rate.monthly());
    let interest_part = interest_due.min(total_payment);
    let principal_part = total_payment - interest_part;
    let balance_after = (remaining - principal_part).max(Decimal::ZERO);

    PaymentAllocation {
        interest_due,
        interest_part,
        principal_part,
        total_payment,
        balance_after,
    }
}

/// A recorded loan payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub id: LoanPaymentId,
    pub loan_id: LoanId,
    /// 1, 2, ... per loan
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub principal_part: Decimal,
    pub interest_part: Decimal,
    pub total_payment: Decimal,
    pub balance_after: Decimal,
    pub journal_entry_id: Option<JournalEntryId>,
}

impl LoanPayment {
    pub fn new(
        loan_id: LoanId,
        payment_number: u32,
        payment_date: NaiveDate,
        allocation: &PaymentAllocation,
    ) -> Self {
        Self {
            id: LoanPaymentId::new_v7(),
            loan_id,
            payment_number,
            payment_date,
            principal_part: allocation.principal_part,
            interest_part: allocation.interest_part,
            total_payment: allocation.total_payment,
            balance_after: allocation.balance_after,
            journal_entry_id: None,
        }
    }
}
