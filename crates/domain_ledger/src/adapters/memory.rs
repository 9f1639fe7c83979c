//! In-memory ledger store
//!
//! Transactions take an owned lock on the whole state and work on a copy of
//! it. Committing swaps the copy in; dropping the transaction throws it away.
//! Holding the lock for the transaction's lifetime serializes writers the way
//! row locks do in the database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{AccountId, CompanyId, DomainPort, JournalEntryId, PortError, ProductId};
use crate::account::Account;
use crate::defaults::DefaultAccounts;
use crate::inventory::{Product, StockMovement};
use crate::journal::{EntryStatus, JournalEntry, SourceRef};
use crate::ports::{LedgerStore, LedgerTx, SourceClaim};

/// A unit of work over state of type `S`
pub struct MemoryTx<S: Send + 'static> {
    guard: OwnedMutexGuard<S>,
    working: S,
}

impl<S: Clone + Send + 'static> MemoryTx<S> {
    /// Waits for exclusive access and copies the state
    pub async fn begin(state: &Arc<Mutex<S>>) -> Self {
        let guard = state.clone().lock_owned().await;
        let working = guard.clone();
        Self { guard, working }
    }

    /// The working copy
    pub fn state(&self) -> &S {
        &self.working
    }

    /// The working copy, mutably
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.working
    }

    /// Publishes the working copy
    pub fn finish(self) {
        let MemoryTx { mut guard, working } = self;
        *guard = working;
    }
}

/// State types that embed the ledger
pub trait HasLedgerState: Clone + Send + Sync + 'static {
    fn ledger(&self) -> &LedgerState;
    fn ledger_mut(&mut self) -> &mut LedgerState;
}

/// Everything the ledger stores
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    defaults: HashMap<CompanyId, DefaultAccounts>,
    journal_counters: HashMap<CompanyId, u64>,
    entries: Vec<JournalEntry>,
    postings: HashMap<(CompanyId, SourceRef), Option<JournalEntryId>>,
    products: HashMap<ProductId, Product>,
    stock_movements: Vec<StockMovement>,
}

impl HasLedgerState for LedgerState {
    fn ledger(&self) -> &LedgerState {
        self
    }

    fn ledger_mut(&mut self) -> &mut LedgerState {
        self
    }
}

impl LedgerState {
    /// Adds or replaces an account
    pub fn insert_account(&mut self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    /// Adds or replaces a product
    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    /// Replaces a company's default account pointers
    pub fn set_default_accounts(&mut self, company_id: CompanyId, defaults: DefaultAccounts) {
        self.defaults.insert(company_id, defaults);
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn account_by_code(&self, company_id: CompanyId, code: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.company_id == company_id && a.code == code)
    }

    /// The company's accounts ordered by code
    pub fn accounts(&self, company_id: CompanyId) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .values()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        accounts
    }

    pub fn default_accounts(&self, company_id: CompanyId) -> DefaultAccounts {
        self.defaults.get(&company_id).cloned().unwrap_or_default()
    }

    /// The company's entries in posting order
    pub fn journal_entries(&self, company_id: CompanyId) -> Vec<JournalEntry> {
        self.entries
            .iter()
            .filter(|e| e.company_id == company_id)
            .cloned()
            .collect()
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn stock_movements(&self) -> &[StockMovement] {
        &self.stock_movements
    }

    fn find_account(&self, company_id: CompanyId, id: AccountId) -> Option<Account> {
        self.accounts
            .get(&id)
            .filter(|a| a.company_id == company_id)
            .cloned()
    }

    fn insert_account_if_absent(&mut self, account: &Account) -> bool {
        if self.account_by_code(account.company_id, &account.code).is_some() {
            return false;
        }
        self.insert_account(account.clone());
        true
    }

    fn apply_balance_delta(&mut self, id: AccountId, delta: Decimal) -> Result<Decimal, PortError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Account", id))?;
        account.current_balance += delta;
        Ok(account.current_balance)
    }

    fn next_journal_sequence(&mut self, company_id: CompanyId) -> u64 {
        let counter = self.journal_counters.entry(company_id).or_insert(0);
        *counter += 1;
        *counter
    }

    fn find_journal_entry(&self, company_id: CompanyId, id: JournalEntryId) -> Option<JournalEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id && e.company_id == company_id)
            .cloned()
    }

    fn update_entry_status(&mut self, id: JournalEntryId, status: EntryStatus) -> Result<(), PortError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| PortError::not_found("JournalEntry", id))?;
        entry.status = status;
        Ok(())
    }

    fn claim_source(&mut self, company_id: CompanyId, source: SourceRef) -> Result<SourceClaim, PortError> {
        match self.postings.get(&(company_id, source)) {
            Some(Some(entry_id)) => Ok(SourceClaim::AlreadyPosted(*entry_id)),
            Some(None) => Err(PortError::conflict(format!(
                "{} {} is already claimed in this transaction",
                source.source_type, source.source_id
            ))),
            None => {
                self.postings.insert((company_id, source), None);
                Ok(SourceClaim::Claimed)
            }
        }
    }

    fn link_source(&mut self, company_id: CompanyId, source: SourceRef, entry_id: JournalEntryId) -> Result<(), PortError> {
        let slot = self
            .postings
            .get_mut(&(company_id, source))
            .ok_or_else(|| PortError::conflict(format!("{} {} was not claimed", source.source_type, source.source_id)))?;
        *slot = Some(entry_id);
        Ok(())
    }

    fn adjust_stock(&mut self, id: ProductId, delta: Decimal) -> Result<Decimal, PortError> {
        let product = self
            .products
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Product", id))?;
        product.stock_quantity += delta;
        Ok(product.stock_quantity)
    }
}

#[async_trait]
impl<S: HasLedgerState> LedgerTx for MemoryTx<S> {
    async fn find_account(&mut self, company_id: CompanyId, id: AccountId) -> Result<Option<Account>, PortError> {
        Ok(self.state().ledger().find_account(company_id, id))
    }

    async fn find_account_by_code(&mut self, company_id: CompanyId, code: &str) -> Result<Option<Account>, PortError> {
        Ok(self.state().ledger().account_by_code(company_id, code).cloned())
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> Result<bool, PortError> {
        Ok(self.state_mut().ledger_mut().insert_account_if_absent(account))
    }

    async fn apply_balance_delta(&mut self, id: AccountId, delta: Decimal) -> Result<Decimal, PortError> {
        self.state_mut().ledger_mut().apply_balance_delta(id, delta)
    }

    async fn default_accounts(&mut self, company_id: CompanyId) -> Result<DefaultAccounts, PortError> {
        Ok(self.state().ledger().default_accounts(company_id))
    }

    async fn save_default_accounts(&mut self, company_id: CompanyId, defaults: &DefaultAccounts) -> Result<(), PortError> {
        self.state_mut().ledger_mut().set_default_accounts(company_id, defaults.clone());
        Ok(())
    }

    async fn next_journal_sequence(&mut self, company_id: CompanyId) -> Result<u64, PortError> {
        Ok(self.state_mut().ledger_mut().next_journal_sequence(company_id))
    }

    async fn insert_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), PortError> {
        self.state_mut().ledger_mut().entries.push(entry.clone());
        Ok(())
    }

    async fn find_journal_entry(&mut self, company_id: CompanyId, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError> {
        Ok(self.state().ledger().find_journal_entry(company_id, id))
    }

    async fn update_entry_status(&mut self, id: JournalEntryId, status: EntryStatus) -> Result<(), PortError> {
        self.state_mut().ledger_mut().update_entry_status(id, status)
    }

    async fn posting_status(&mut self, company_id: CompanyId, source: SourceRef) -> Result<Option<JournalEntryId>, PortError> {
        Ok(self
            .state()
            .ledger()
            .postings
            .get(&(company_id, source))
            .copied()
            .flatten())
    }

    async fn claim_source(&mut self, company_id: CompanyId, source: SourceRef) -> Result<SourceClaim, PortError> {
        self.state_mut().ledger_mut().claim_source(company_id, source)
    }

    async fn link_source(&mut self, company_id: CompanyId, source: SourceRef, entry_id: JournalEntryId) -> Result<(), PortError> {
        self.state_mut().ledger_mut().link_source(company_id, source, entry_id)
    }

    async fn find_product(&mut self, company_id: CompanyId, id: ProductId) -> Result<Option<Product>, PortError> {
        Ok(self
            .state()
            .ledger()
            .product(id)
            .filter(|p| p.company_id == company_id)
            .cloned())
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: Decimal) -> Result<Decimal, PortError> {
        self.state_mut().ledger_mut().adjust_stock(id, delta)
    }

    async fn insert_stock_movement(&mut self, movement: &StockMovement) -> Result<(), PortError> {
        self.state_mut().ledger_mut().stock_movements.push(movement.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        (*self).finish();
        Ok(())
    }
}

/// Ledger store held in process memory
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a setup change outside any posting
    pub async fn setup(&self, f: impl FnOnce(&mut LedgerState)) {
        let mut state = self.state.lock().await;
        f(&mut *state);
    }

    /// A copy of the committed state
    pub async fn snapshot(&self) -> LedgerState {
        self.state.lock().await.clone()
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, PortError> {
        Ok(Box::new(MemoryTx::begin(&self.state).await))
    }

    async fn list_accounts(&self, company_id: CompanyId) -> Result<Vec<Account>, PortError> {
        Ok(self.state.lock().await.accounts(company_id))
    }

    async fn list_journal_entries(&self, company_id: CompanyId) -> Result<Vec<JournalEntry>, PortError> {
        Ok(self.state.lock().await.journal_entries(company_id))
    }
}
