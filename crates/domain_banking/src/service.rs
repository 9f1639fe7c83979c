//! Reconciliation service

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{BankAccountId, CompanyId};
use crate::account::{BankAccount, BankEntry, NewBankEntry, NewSystemTransaction, SystemTransaction};
use crate::error::BankingError;
use crate::ports::{BankingStore, ReconciliationTx};
use crate::reconciliation::{system_balance, MatchPair, MatchSet, Reconciliation, ReconciliationSummary};

/// A submitted reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteReconciliation {
    pub bank_account_id: BankAccountId,
    pub statement_date: NaiveDate,
    pub statement_balance: Decimal,
    pub matches: Vec<MatchPair>,
}

/// Bank accounts, statement imports and reconciliation
#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<dyn BankingStore>,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn BankingStore>) -> Self {
        Self { store }
    }

    pub async fn open_bank_account(&self, account: BankAccount) -> Result<BankAccount, BankingError> {
        let mut tx = self.store.begin_banking().await?;
        tx.insert_bank_account(&account).await?;
        tx.commit().await?;
        Ok(account)
    }

    pub async fn bank_accounts(&self, company_id: CompanyId) -> Result<Vec<BankAccount>, BankingError> {
        Ok(self.store.bank_accounts(company_id).await?)
    }

    /// Records a movement in the books for the account
    #[instrument(skip(self, request))]
    pub async fn record_transaction(
        &self,
        company_id: CompanyId,
        bank_account_id: BankAccountId,
        request: NewSystemTransaction,
    ) -> Result<SystemTransaction, BankingError> {
        let transaction = SystemTransaction::create(bank_account_id, request)?;

        let mut tx = self.store.begin_banking().await?;
        load_account(tx.as_mut(), company_id, bank_account_id).await?;
        tx.insert_system_transaction(&transaction).await?;
        tx.commit().await?;

        Ok(transaction)
    }

    /// Imports statement lines for the account, all or none
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn import_statement(
        &self,
        company_id: CompanyId,
        bank_account_id: BankAccountId,
        entries: Vec<NewBankEntry>,
    ) -> Result<Vec<BankEntry>, BankingError> {
        let entries = entries
            .into_iter()
            .map(|e| BankEntry::create(bank_account_id, e))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.store.begin_banking().await?;
        load_account(tx.as_mut(), company_id, bank_account_id).await?;
        for entry in &entries {
            tx.insert_bank_entry(entry).await?;
        }
        tx.commit().await?;

        info!(%bank_account_id, count = entries.len(), "statement entries imported");
        Ok(entries)
    }

    pub async fn unmatched_entries(&self, bank_account_id: BankAccountId) -> Result<Vec<BankEntry>, BankingError> {
        Ok(self.store.unmatched_entries(bank_account_id).await?)
    }

    pub async fn reconciliations(&self, bank_account_id: BankAccountId) -> Result<Vec<Reconciliation>, BankingError> {
        Ok(self.store.reconciliations(bank_account_id).await?)
    }

    /// Compares a statement balance with the account's system transactions
    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        company_id: CompanyId,
        bank_account_id: BankAccountId,
        statement_balance: Decimal,
    ) -> Result<ReconciliationSummary, BankingError> {
        let mut tx = self.store.begin_banking().await?;
        load_account(tx.as_mut(), company_id, bank_account_id).await?;
        let transactions = tx.transactions(bank_account_id).await?;

        Ok(summarize(statement_balance, &transactions))
    }

    /// Commits a set of matches
    ///
    /// Every transaction and entry must belong to the bank account and still
    /// be open. Each pair marks both sides reconciled, and the reconciliation
    /// is stored with the summary as it stands afterwards. Any failure leaves
    /// everything as it was.
    ///
    /// # Errors
    ///
    /// - `DuplicateMatch` if an id appears in more than one pair
    /// - `BankAccountNotFound`, `TransactionNotFound`, `BankEntryNotFound`
    /// - `AlreadyReconciled` if either side was matched before
    #[instrument(skip(self, request), fields(bank_account_id = %request.bank_account_id, pairs = request.matches.len()))]
    pub async fn complete(
        &self,
        company_id: CompanyId,
        request: CompleteReconciliation,
    ) -> Result<Reconciliation, BankingError> {
        let matches = MatchSet::try_from_pairs(request.matches)?;

        let mut tx = self.store.begin_banking().await?;
        let account = load_account(tx.as_mut(), company_id, request.bank_account_id).await?;

        for pair in matches.pairs() {
            let transaction = tx
                .find_system_transaction(pair.system_transaction_id)
                .await?
                .filter(|t| t.bank_account_id == account.id)
                .ok_or_else(|| BankingError::TransactionNotFound(pair.system_transaction_id.to_string()))?;
            if transaction.is_reconciled {
                return Err(BankingError::AlreadyReconciled(transaction.id.to_string()));
            }

            let entry = tx
                .find_bank_entry(pair.bank_entry_id)
                .await?
                .filter(|e| e.bank_account_id == account.id)
                .ok_or_else(|| BankingError::BankEntryNotFound(pair.bank_entry_id.to_string()))?;
            if entry.is_matched {
                return Err(BankingError::AlreadyReconciled(entry.id.to_string()));
            }

            if transaction.signed_amount() != entry.signed_amount() {
                warn!(
                    transaction_id = %transaction.id,
                    entry_id = %entry.id,
                    system_amount = %transaction.signed_amount(),
                    statement_amount = %entry.signed_amount(),
                    "matched amounts differ"
                );
            }

            tx.mark_transaction_reconciled(transaction.id, entry.id).await?;
            tx.mark_entry_matched(entry.id, transaction.id).await?;
        }

        let transactions = tx.transactions(account.id).await?;
        let summary = summarize(request.statement_balance, &transactions);
        let reconciliation = Reconciliation::new(account.id, request.statement_date, &summary, matches.into_pairs());
        tx.insert_reconciliation(&reconciliation).await?;

        tx.commit().await?;

        info!(
            reconciliation_id = %reconciliation.id,
            matched = reconciliation.matches.len(),
            difference = %reconciliation.difference,
            is_reconciled = reconciliation.is_reconciled,
            "reconciliation completed"
        );

        Ok(reconciliation)
    }
}

async fn load_account(
    tx: &mut dyn ReconciliationTx,
    company_id: CompanyId,
    bank_account_id: BankAccountId,
) -> Result<BankAccount, BankingError> {
    tx.find_bank_account(company_id, bank_account_id)
        .await?
        .ok_or_else(|| BankingError::BankAccountNotFound(bank_account_id.to_string()))
}

fn summarize(statement_balance: Decimal, transactions: &[SystemTransaction]) -> ReconciliationSummary {
    let unreconciled = transactions.iter().filter(|t| !t.is_reconciled).count();
    ReconciliationSummary::compute(statement_balance, system_balance(transactions), unreconciled)
}
