//! Banking Domain - Bank reconciliation
//!
//! System transactions recorded against a bank account are paired with
//! entries from the bank's statement. Matching is caller-driven: the service
//! checks that a proposed set of pairs is consistent and commits it, with the
//! reconciliation record, in one transaction.

pub mod account;
pub mod reconciliation;
pub mod ports;
pub mod service;
pub mod adapters;
pub mod error;

pub use account::{
    BankAccount, BankEntry, NewBankEntry, NewSystemTransaction, SystemTransaction, TransactionDirection,
};
pub use reconciliation::{system_balance, MatchPair, MatchSet, Reconciliation, ReconciliationSummary};
pub use ports::{BankingStore, ReconciliationTx};
pub use service::{CompleteReconciliation, ReconciliationService};
pub use adapters::memory::{BankingState, InMemoryBankingStore};
pub use error::BankingError;
