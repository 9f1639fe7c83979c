//! Lending ports
//!
//! A [`LendingTx`] is also a [`LedgerTx`], so a loan payment or a
//! recognition run can post its journal entry in the same unit of work as
//! the loan or prepaid update.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, DomainPort, LoanId, PortError, PrepaidExpenseId};
use domain_ledger::LedgerTx;
use crate::amortization::ScheduleEntry;
use crate::loan::Loan;
use crate::payment::LoanPayment;
use crate::prepaid::{PrepaidExpense, PrepaidRecognition};

/// An unpaid installment falling due soon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub loan_id: LoanId,
    pub loan_name: String,
    pub lender_name: String,
    pub period_number: u32,
    pub due_date: NaiveDate,
    pub principal_due: Decimal,
    pub interest_due: Decimal,
    pub total_due: Decimal,
}

/// A unit of work against loans, prepaids and the ledger
#[async_trait]
pub trait LendingTx: LedgerTx {
    /// Inserts a loan with its schedule
    async fn insert_loan(&mut self, loan: &Loan, schedule: &[ScheduleEntry]) -> Result<(), PortError>;

    /// Gets a loan of the company, locking it for the rest of the transaction
    async fn find_loan_for_update(&mut self, company_id: CompanyId, id: LoanId) -> Result<Option<Loan>, PortError>;

    /// Writes a loan's running totals
    async fn update_loan(&mut self, loan: &Loan) -> Result<(), PortError>;

    /// Increments and returns the loan's payment counter (first value is 1)
    async fn next_payment_number(&mut self, loan_id: LoanId) -> Result<u32, PortError>;

    async fn insert_loan_payment(&mut self, payment: &LoanPayment) -> Result<(), PortError>;

    /// Marks the oldest unpaid schedule entry paid
    ///
    /// Returns its period number, or `None` if every entry is paid.
    async fn mark_next_schedule_paid(&mut self, loan_id: LoanId, paid_date: NaiveDate) -> Result<Option<u32>, PortError>;

    async fn insert_prepaid(&mut self, prepaid: &PrepaidExpense) -> Result<(), PortError>;

    /// Gets the company's active prepaid expenses, locking them
    async fn active_prepaids_for_update(&mut self, company_id: CompanyId) -> Result<Vec<PrepaidExpense>, PortError>;

    /// Writes a prepaid expense's running amounts
    async fn update_prepaid(&mut self, prepaid: &PrepaidExpense) -> Result<(), PortError>;

    async fn insert_prepaid_recognition(&mut self, recognition: &PrepaidRecognition) -> Result<(), PortError>;
}

/// Storage for loans and prepaid expenses
#[async_trait]
pub trait LendingStore: DomainPort {
    /// Starts a unit of work
    async fn begin_lending(&self) -> Result<Box<dyn LendingTx>, PortError>;

    /// The company's active loans
    async fn active_loans(&self, company_id: CompanyId) -> Result<Vec<Loan>, PortError>;

    /// A loan's schedule in period order
    async fn loan_schedule(&self, loan_id: LoanId) -> Result<Vec<ScheduleEntry>, PortError>;

    /// A loan's payments in payment order
    async fn loan_payments(&self, loan_id: LoanId) -> Result<Vec<LoanPayment>, PortError>;

    /// Unpaid entries of active loans due on or before `until`, overdue
    /// ones included, by due date
    async fn upcoming_schedule(
        &self,
        company_id: CompanyId,
        until: NaiveDate,
    ) -> Result<Vec<UpcomingPayment>, PortError>;

    /// The company's prepaid expenses
    async fn prepaid_expenses(&self, company_id: CompanyId) -> Result<Vec<PrepaidExpense>, PortError>;

    /// The recognitions recorded for a prepaid expense, by period
    async fn prepaid_recognitions(&self, prepaid_id: PrepaidExpenseId) -> Result<Vec<PrepaidRecognition>, PortError>;
}
