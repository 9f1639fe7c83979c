//! Banking ports

use async_trait::async_trait;

use core_kernel::{BankAccountId, BankEntryId, BankTransactionId, CompanyId, DomainPort, PortError};
use crate::account::{BankAccount, BankEntry, SystemTransaction};
use crate::reconciliation::Reconciliation;

/// A unit of work against bank accounts
#[async_trait]
pub trait ReconciliationTx: Send {
    /// Gets a bank account of the company, locking it
    async fn find_bank_account(&mut self, company_id: CompanyId, id: BankAccountId) -> Result<Option<BankAccount>, PortError>;

    async fn insert_bank_account(&mut self, account: &BankAccount) -> Result<(), PortError>;

    async fn insert_system_transaction(&mut self, transaction: &SystemTransaction) -> Result<(), PortError>;

    async fn insert_bank_entry(&mut self, entry: &BankEntry) -> Result<(), PortError>;

    async fn find_system_transaction(&mut self, id: BankTransactionId) -> Result<Option<SystemTransaction>, PortError>;

    async fn find_bank_entry(&mut self, id: BankEntryId) -> Result<Option<BankEntry>, PortError>;

    /// Every system transaction on the account
    async fn transactions(&mut self, bank_account_id: BankAccountId) -> Result<Vec<SystemTransaction>, PortError>;

    /// Marks a transaction reconciled against a statement entry
    async fn mark_transaction_reconciled(&mut self, id: BankTransactionId, entry_id: BankEntryId) -> Result<(), PortError>;

    /// Marks a statement entry matched to a transaction
    async fn mark_entry_matched(&mut self, id: BankEntryId, transaction_id: BankTransactionId) -> Result<(), PortError>;

    /// Inserts a reconciliation with its matches
    async fn insert_reconciliation(&mut self, reconciliation: &Reconciliation) -> Result<(), PortError>;

    /// Applies every write made through this transaction
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

/// Storage for bank accounts and reconciliations
#[async_trait]
pub trait BankingStore: DomainPort {
    /// Starts a unit of work
    async fn begin_banking(&self) -> Result<Box<dyn ReconciliationTx>, PortError>;

    /// The company's bank accounts by name
    async fn bank_accounts(&self, company_id: CompanyId) -> Result<Vec<BankAccount>, PortError>;

    /// Statement entries on the account not yet matched, by date
    async fn unmatched_entries(&self, bank_account_id: BankAccountId) -> Result<Vec<BankEntry>, PortError>;

    /// Completed reconciliations of the account, oldest first
    async fn reconciliations(&self, bank_account_id: BankAccountId) -> Result<Vec<Reconciliation>, PortError>;
}
