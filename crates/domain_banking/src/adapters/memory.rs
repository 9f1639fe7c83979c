//! In-memory banking store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use core_kernel::{BankAccountId, BankEntryId, BankTransactionId, CompanyId, DomainPort, PortError};
use domain_ledger::MemoryTx;
use crate::account::{BankAccount, BankEntry, SystemTransaction};
use crate::ports::{BankingStore, ReconciliationTx};
use crate::reconciliation::Reconciliation;

/// Bank accounts and what has been reconciled against them
#[derive(Debug, Clone, Default)]
pub struct BankingState {
    accounts: HashMap<BankAccountId, BankAccount>,
    transactions: HashMap<BankTransactionId, SystemTransaction>,
    entries: HashMap<BankEntryId, BankEntry>,
    reconciliations: Vec<Reconciliation>,
}

impl BankingState {
    pub fn transaction(&self, id: BankTransactionId) -> Option<&SystemTransaction> {
        self.transactions.get(&id)
    }

    pub fn entry(&self, id: BankEntryId) -> Option<&BankEntry> {
        self.entries.get(&id)
    }

    pub fn reconciliation_count(&self) -> usize {
        self.reconciliations.len()
    }

    fn account_transactions(&self, bank_account_id: BankAccountId) -> Vec<SystemTransaction> {
        let mut transactions: Vec<_> = self
            .transactions
            .values()
            .filter(|t| t.bank_account_id == bank_account_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.into_uuid().cmp(&b.id.into_uuid())));
        transactions
    }
}

#[async_trait]
impl ReconciliationTx for MemoryTx<BankingState> {
    async fn find_bank_account(&mut self, company_id: CompanyId, id: BankAccountId) -> Result<Option<BankAccount>, PortError> {
        Ok(self
            .state()
            .accounts
            .get(&id)
            .filter(|a| a.company_id == company_id)
            .cloned())
    }

    async fn insert_bank_account(&mut self, account: &BankAccount) -> Result<(), PortError> {
        self.state_mut().accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn insert_system_transaction(&mut self, transaction: &SystemTransaction) -> Result<(), PortError> {
        self.state_mut().transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn insert_bank_entry(&mut self, entry: &BankEntry) -> Result<(), PortError> {
        self.state_mut().entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn find_system_transaction(&mut self, id: BankTransactionId) -> Result<Option<SystemTransaction>, PortError> {
        Ok(self.state().transactions.get(&id).cloned())
    }

    async fn find_bank_entry(&mut self, id: BankEntryId) -> Result<Option<BankEntry>, PortError> {
        Ok(self.state().entries.get(&id).cloned())
    }

    async fn transactions(&mut self, bank_account_id: BankAccountId) -> Result<Vec<SystemTransaction>, PortError> {
        Ok(self.state().account_transactions(bank_account_id))
    }

    async fn mark_transaction_reconciled(&mut self, id: BankTransactionId, entry_id: BankEntryId) -> Result<(), PortError> {
        let transaction = self
            .state_mut()
            .transactions
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("SystemTransaction", id))?;
        transaction.is_reconciled = true;
        transaction.matched_entry_id = Some(entry_id);
        Ok(())
    }

    async fn mark_entry_matched(&mut self, id: BankEntryId, transaction_id: BankTransactionId) -> Result<(), PortError> {
        let entry = self
            .state_mut()
            .entries
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("BankEntry", id))?;
        entry.is_matched = true;
        entry.matched_transaction_id = Some(transaction_id);
        Ok(())
    }

    async fn insert_reconciliation(&mut self, reconciliation: &Reconciliation) -> Result<(), PortError> {
        self.state_mut().reconciliations.push(reconciliation.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        (*self).finish();
        Ok(())
    }
}

/// Banking store held in process memory
#[derive(Clone, Default)]
pub struct InMemoryBankingStore {
    state: Arc<Mutex<BankingState>>,
}

impl InMemoryBankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the committed state
    pub async fn snapshot(&self) -> BankingState {
        self.state.lock().await.clone()
    }
}

impl DomainPort for InMemoryBankingStore {}

#[async_trait]
impl BankingStore for InMemoryBankingStore {
    async fn begin_banking(&self) -> Result<Box<dyn ReconciliationTx>, PortError> {
        Ok(Box::new(MemoryTx::begin(&self.state).await))
    }

    async fn bank_accounts(&self, company_id: CompanyId) -> Result<Vec<BankAccount>, PortError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<_> = state
            .accounts
            .values()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.account_name.cmp(&b.account_name));
        Ok(accounts)
    }

    async fn unmatched_entries(&self, bank_account_id: BankAccountId) -> Result<Vec<BankEntry>, PortError> {
        let state = self.state.lock().await;
        let mut entries: Vec<_> = state
            .entries
            .values()
            .filter(|e| e.bank_account_id == bank_account_id && !e.is_matched)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    async fn reconciliations(&self, bank_account_id: BankAccountId) -> Result<Vec<Reconciliation>, PortError> {
        let state = self.state.lock().await;
        Ok(state
            .reconciliations
            .iter()
            .filter(|r| r.bank_account_id == bank_account_id)
            .cloned()
            .collect())
    }
}
