//! Loans
//!
//! A loan's derived figures (payment, total interest, end date, schedule)
//! are fixed when it is created. Afterwards only payments move it:
//! `remaining_balance = principal_amount - principal_paid`, never below
//! zero, and the loan stays active while anything remains.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{add_months, wire_enum, AccountId, CompanyId, LoanId, Rate};
use crate::amortization::{
    calculate_monthly_payment, calculate_total_interest, generate_amortization_schedule,
    ScheduleEntry,
};
use crate::error::LendingError;
use crate::payment::PaymentAllocation;

wire_enum! {
    /// How total interest is quoted
    pub enum InterestType {
        /// Flat interest on the original principal
        Simple => "SIMPLE",
        /// Amortizing interest on the outstanding balance
        Compound => "COMPOUND",
    }
}

impl Default for InterestType {
    fn default() -> Self {
        InterestType::Compound
    }
}

wire_enum! {
    /// How often installments fall due
    pub enum PaymentFrequency {
        Monthly => "MONTHLY",
        Quarterly => "QUARTERLY",
        SemiAnnually => "SEMI_ANNUALLY",
        Annually => "ANNUALLY",
    }
}

impl Default for PaymentFrequency {
    fn default() -> Self {
        PaymentFrequency::Monthly
    }
}

impl PaymentFrequency {
    /// Calendar months covered by one installment
    pub fn months_per_payment(&self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 1,
            PaymentFrequency::Quarterly => 3,
            PaymentFrequency::SemiAnnually => 6,
            PaymentFrequency::Annually => 12,
        }
    }

    /// Number of installments needed to cover `term_months`
    pub fn payment_count(&self, term_months: u32) -> u32 {
        term_months.div_ceil(self.months_per_payment())
    }
}

/// Ledger accounts a loan's payments post to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanGlAccounts {
    /// Liability reduced by the principal part
    pub liability: AccountId,
    /// Expense charged with the interest part
    pub interest_expense: AccountId,
}

/// Terms of a new loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub loan_name: String,
    pub lender_name: String,
    pub principal_amount: Decimal,
    pub interest_rate: Rate,
    #[serde(default)]
    pub interest_type: InterestType,
    pub term_months: u32,
    #[serde(default)]
    pub payment_frequency: PaymentFrequency,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub gl_accounts: Option<LoanGlAccounts>,
}

impl NewLoan {
    /// A compound, monthly loan with no ledger accounts
    pub fn new(
        loan_name: impl Into<String>,
        lender_name: impl Into<String>,
        principal_amount: Decimal,
        interest_rate: Rate,
        term_months: u32,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            loan_name: loan_name.into(),
            lender_name: lender_name.into(),
            principal_amount,
            interest_rate,
            interest_type: InterestType::default(),
            term_months,
            payment_frequency: PaymentFrequency::default(),
            start_date,
            gl_accounts: None,
        }
    }

    pub fn with_interest_type(mut self, interest_type: InterestType) -> Self {
        self.interest_type = interest_type;
        self
    }

    pub fn with_frequency(mut self, payment_frequency: PaymentFrequency) -> Self {
        self.payment_frequency = payment_frequency;
        self
    }

    pub fn with_gl_accounts(mut self, gl_accounts: LoanGlAccounts) -> Self {
        self.gl_accounts = Some(gl_accounts);
        self
    }
}

/// A loan and its running totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub company_id: CompanyId,
    pub loan_name: String,
    pub lender_name: String,
    pub principal_amount: Decimal,
    pub interest_rate: Rate,
    pub interest_type: InterestType,
    pub term_months: u32,
    pub payment_frequency: PaymentFrequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Derived monthly installment
    pub monthly_payment: Decimal,
    /// Derived interest over the whole term
    pub total_interest: Decimal,
    pub remaining_balance: Decimal,
    pub principal_paid: Decimal,
    pub interest_paid: Decimal,
    pub total_paid: Decimal,
    pub is_active: bool,
    pub gl_accounts: Option<LoanGlAccounts>,
}

impl Loan {
    /// Creates a loan and its amortization schedule
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a non-positive principal, a zero term or a
    /// negative rate.
    pub fn create(company_id: CompanyId, terms: NewLoan) -> Result<(Loan, Vec<ScheduleEntry>), LendingError> {
        let monthly_payment =
            calculate_monthly_payment(terms.principal_amount, terms.interest_rate, terms.term_months)?;
        let total_interest = calculate_total_interest(
            terms.principal_amount,
            terms.interest_rate,
            terms.term_months,
            terms.interest_type,
        )?;
        let rows = generate_amortization_schedule(
            terms.principal_amount,
            terms.interest_rate,
            terms.term_months,
            terms.start_date,
            terms.payment_frequency,
        )?;

        let loan = Loan {
            id: LoanId::new_v7(),
            company_id,
            loan_name: terms.loan_name,
            lender_name: terms.lender_name,
            principal_amount: terms.principal_amount,
            interest_rate: terms.interest_rate,
            interest_type: terms.interest_type,
            term_months: terms.term_months,
            payment_frequency: terms.payment_frequency,
            start_date: terms.start_date,
            end_date: add_months(terms.start_date, terms.term_months)?,
            monthly_payment,
            total_interest,
            remaining_balance: terms.principal_amount,
            principal_paid: Decimal::ZERO,
            interest_paid: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            is_active: true,
            gl_accounts: terms.gl_accounts,
        };

        let schedule = rows
            .into_iter()
            .map(|row| ScheduleEntry::from_row(loan.id, row))
            .collect();

        Ok((loan, schedule))
    }

    /// Applies an allocated payment to the running totals
    pub fn apply_payment(&mut self, allocation: &PaymentAllocation) {
        self.total_paid += allocation.total_payment;
        self.principal_paid += allocation.principal_part;
        self.interest_paid += allocation.interest_part;
        self.remaining_balance = allocation.balance_after;
        self.is_active = self.remaining_balance > Decimal::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_count_rounds_up() {
        assert_eq!(PaymentFrequency::Monthly.payment_count(12), 12);
        assert_eq!(PaymentFrequency::Quarterly.payment_count(12), 4);
        assert_eq!(PaymentFrequency::Quarterly.payment_count(14), 5);
        assert_eq!(PaymentFrequency::Annually.payment_count(6), 1);
    }

    #[test]
    fn test_create_derives_figures() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let terms = NewLoan::new("Van", "City Bank", dec!(120000), Rate::new(dec!(0.12)), 12, start);

        let (loan, schedule) = Loan::create(CompanyId::new(), terms).unwrap();

        assert_eq!(loan.monthly_payment, dec!(10661.85));
        assert_eq!(loan.total_interest, dec!(7942.20));
        assert_eq!(loan.end_date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(loan.remaining_balance, dec!(120000));
        assert!(loan.is_active);
        assert_eq!(schedule.len(), 12);
        assert!(schedule.iter().all(|entry| entry.loan_id == loan.id && !entry.is_paid));
    }

    #[test]
    fn test_defaults_are_compound_monthly() {
        let terms: NewLoan = serde_json::from_str(
            r#"{"loan_name":"L","lender_name":"B","principal_amount":"1000","interest_rate":"0.05","term_months":10,"start_date":"2024-01-01"}"#,
        )
        .unwrap();
        assert_eq!(terms.interest_type, InterestType::Compound);
        assert_eq!(terms.payment_frequency, PaymentFrequency::Monthly);
    }
}
