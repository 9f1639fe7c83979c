//! Core Kernel - Foundational types and utilities for the ledger system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Two-decimal money rounding and the balance tolerance
//! - Calendar month arithmetic for schedules and recognition periods
//! - Strongly-typed identifiers
//! - Port error plumbing shared by adapters
//! - Wire-compatible string enums

pub mod money;
pub mod calendar;
pub mod identifiers;
pub mod error;
pub mod ports;
pub mod wire;

pub use money::{
    round2, approx_eq, is_zero_money, checked_div, compound_factor, Rate, MoneyError,
    MONEY_DP, MONEY_TOLERANCE,
};
pub use calendar::{add_months, months_between_inclusive, elapsed_periods, CalendarError};
pub use identifiers::{
    CompanyId, AccountId, JournalEntryId, JournalLineId, ProductId, StockMovementId,
    InvoiceId, PaymentId, BillId, PosSaleId, SalesReturnId, PurchaseReturnId, SupplierPaymentId, ExpenseId,
    LoanId, LoanScheduleId, LoanPaymentId, PrepaidExpenseId, PrepaidRecognitionId,
    BankAccountId, BankTransactionId, BankEntryId, ReconciliationId,
};
pub use error::CoreError;
pub use ports::{DomainPort, PortError};
pub use wire::UnknownVariant;
