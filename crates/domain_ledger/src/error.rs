//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{PortError, UnknownVariant};
use crate::defaults::AccountRole;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A default account the event needs is not configured for the company
    #[error("No {role} account is configured; set the default account or seed the chart of accounts")]
    MissingDefaultAccount { role: AccountRole },

    /// Other chart-of-accounts setup problems
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Debit and credit totals differ beyond tolerance
    #[error("Unbalanced entry: debits={debits}, credits={credits}")]
    UnbalancedEntry {
        debits: Decimal,
        credits: Decimal,
    },

    /// A posting request without lines
    #[error("Journal entry has no lines")]
    EmptyEntry,

    /// A line with no amount, a negative amount, or both sides set
    #[error("Invalid line {index}: {reason}")]
    InvalidLine { index: usize, reason: String },

    /// Source document amounts that cannot be posted
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Journal entry not found
    #[error("Journal entry not found: {0}")]
    EntryNotFound(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Operation not allowed in the entity's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Stored value outside the wire vocabulary
    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),

    /// Storage failure
    #[error(transparent)]
    Port(#[from] PortError),
}

impl LedgerError {
    /// Returns true for errors the company must fix in its chart of accounts
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingDefaultAccount { .. } | LedgerError::Configuration(_)
        )
    }
}
