//! Lending domain errors

use thiserror::Error;

use core_kernel::{CalendarError, CoreError, MoneyError, PortError};
use domain_ledger::LedgerError;

/// Errors that can occur in the lending domain
#[derive(Debug, Error)]
pub enum LendingError {
    /// Loan or prepaid terms that cannot be calculated
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Loan not found
    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    /// Prepaid expense not found
    #[error("Prepaid expense not found: {0}")]
    PrepaidNotFound(String),

    /// Operation not allowed in the loan's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Arithmetic or calendar failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Posting the accompanying journal entry failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage failure
    #[error(transparent)]
    Port(#[from] PortError),
}

impl From<MoneyError> for LendingError {
    fn from(error: MoneyError) -> Self {
        LendingError::Core(error.into())
    }
}

impl From<CalendarError> for LendingError {
    fn from(error: CalendarError) -> Self {
        LendingError::Core(error.into())
    }
}
