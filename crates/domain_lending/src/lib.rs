//! Lending Domain - Loans and prepaid expenses
//!
//! Time-based calculations on top of the ledger:
//!
//! - Loan amortization schedules, payment allocation and interest accrual
//! - Straight-line recognition of prepaid expenses
//!
//! The calculators in [`amortization`], [`payment`], [`accrual`] and
//! [`prepaid`] are pure. [`service::LendingService`] runs the write paths
//! (loan creation, payments, recognition runs) as single units of work that
//! may include journal entries.

pub mod loan;
pub mod amortization;
pub mod payment;
pub mod accrual;
pub mod prepaid;
pub mod ports;
pub mod service;
pub mod adapters;
pub mod error;

pub use loan::{Loan, NewLoan, InterestType, PaymentFrequency, LoanGlAccounts};
pub use amortization::{
    calculate_monthly_payment, calculate_total_interest, generate_amortization_schedule,
    AmortizationRow, ScheduleEntry, MAX_TERM_MONTHS,
};
pub use payment::{allocate_payment, PaymentAllocation, LoanPayment};
pub use accrual::{AccrualDetail, AccrualReport, calculate_interest_accrual};
pub use prepaid::{PrepaidExpense, NewPrepaidExpense, PrepaidRecognition, PrepaidGlAccounts, PrepaidScheduleEntry};
pub use ports::{LendingStore, LendingTx, UpcomingPayment};
pub use service::{LendingService, PaymentReceipt, RecognitionRun, RecognizedPrepaid, DEFAULT_UPCOMING_DAYS};
pub use adapters::memory::{InMemoryLendingStore, LendingState};
pub use error::LendingError;
