//! Banking domain errors

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur in the banking domain
#[derive(Debug, Error)]
pub enum BankingError {
    /// A transaction or statement entry appears in more than one pair
    #[error("Duplicate match: {kind} {id} appears in more than one pair")]
    DuplicateMatch { kind: &'static str, id: String },

    #[error("Bank account not found: {0}")]
    BankAccountNotFound(String),

    #[error("System transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Bank statement entry not found: {0}")]
    BankEntryNotFound(String),

    /// The transaction or entry was reconciled by an earlier run
    #[error("Already reconciled: {0}")]
    AlreadyReconciled(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage failure
    #[error(transparent)]
    Port(#[from] PortError),
}
