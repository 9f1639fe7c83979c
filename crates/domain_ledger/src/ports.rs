//! Ledger ports
//!
//! The posting engine talks to storage through [`LedgerStore`], which hands
//! out [`LedgerTx`] units of work. A transaction applies its writes only when
//! [`LedgerTx::commit`] succeeds; dropping it discards them.
//!
//! Implementations must serialize concurrent use of the per-company journal
//! counter and apply balance deltas as atomic increments.

use async_trait::async_trait;
use rust_decimal::Decimal;

use core_kernel::{AccountId, CompanyId, DomainPort, JournalEntryId, PortError, ProductId};
use crate::account::Account;
use crate::defaults::DefaultAccounts;
use crate::inventory::{Product, StockMovement};
use crate::journal::{EntryStatus, JournalEntry, SourceRef};

/// Result of claiming a source record for posting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClaim {
    /// This transaction now owns the source; link it once the entry exists
    Claimed,
    /// The source was posted by a committed transaction
    AlreadyPosted(JournalEntryId),
}

/// A unit of work against the ledger
#[async_trait]
pub trait LedgerTx: Send {
    /// Gets an account of the company
    async fn find_account(&mut self, company_id: CompanyId, id: AccountId) -> Result<Option<Account>, PortError>;

    /// Gets an account of the company by code
    async fn find_account_by_code(&mut self, company_id: CompanyId, code: &str) -> Result<Option<Account>, PortError>;

    /// Inserts an account unless the company already has one with that code
    ///
    /// Returns true if the account was inserted.
    async fn insert_account_if_absent(&mut self, account: &Account) -> Result<bool, PortError>;

    /// Adds `delta` to the account's current balance and returns the new balance
    ///
    /// This is the only write path for account balances.
    async fn apply_balance_delta(&mut self, id: AccountId, delta: Decimal) -> Result<Decimal, PortError>;

    /// Gets the company's default account pointers
    async fn default_accounts(&mut self, company_id: CompanyId) -> Result<DefaultAccounts, PortError>;

    /// Replaces the company's default account pointers
    async fn save_default_accounts(&mut self, company_id: CompanyId, defaults: &DefaultAccounts) -> Result<(), PortError>;

    /// Increments and returns the company's journal counter (first value is 1)
    async fn next_journal_sequence(&mut self, company_id: CompanyId) -> Result<u64, PortError>;

    /// Inserts an entry with its lines
    async fn insert_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), PortError>;

    /// Gets an entry with its lines
    async fn find_journal_entry(&mut self, company_id: CompanyId, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError>;

    /// Changes an entry's status
    async fn update_entry_status(&mut self, id: JournalEntryId, status: EntryStatus) -> Result<(), PortError>;

    /// The entry recording a source, if the source has been posted
    async fn posting_status(&mut self, company_id: CompanyId, source: SourceRef) -> Result<Option<JournalEntryId>, PortError>;

    /// Claims a source for posting
    ///
    /// Concurrent claims of the same source must not both return
    /// [`SourceClaim::Claimed`].
    async fn claim_source(&mut self, company_id: CompanyId, source: SourceRef) -> Result<SourceClaim, PortError>;

    /// Records the entry that posted a claimed source
    async fn link_source(&mut self, company_id: CompanyId, source: SourceRef, entry_id: JournalEntryId) -> Result<(), PortError>;

    /// Gets a product of the company
    async fn find_product(&mut self, company_id: CompanyId, id: ProductId) -> Result<Option<Product>, PortError>;

    /// Adds `delta` to the product's stock and returns the new quantity
    async fn adjust_stock(&mut self, id: ProductId, delta: Decimal) -> Result<Decimal, PortError>;

    /// Records a stock movement
    async fn insert_stock_movement(&mut self, movement: &StockMovement) -> Result<(), PortError>;

    /// Applies every write made through this transaction
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

/// Storage for the ledger
#[async_trait]
pub trait LedgerStore: DomainPort {
    /// Starts a unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, PortError>;

    /// Lists the company's accounts ordered by code
    async fn list_accounts(&self, company_id: CompanyId) -> Result<Vec<Account>, PortError>;

    /// Lists the company's entries ordered by journal number
    async fn list_journal_entries(&self, company_id: CompanyId) -> Result<Vec<JournalEntry>, PortError>;
}
