//! PostgreSQL banking adapter

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{
    AccountId, BankAccountId, BankEntryId, BankTransactionId, CompanyId, DomainPort, PortError, ReconciliationId,
};
use domain_banking::{BankAccount, BankEntry, BankingStore, MatchPair, Reconciliation, ReconciliationTx, SystemTransaction};
use crate::adapters::tx::{parse_column, PgTx};
use crate::error::port_error;

#[derive(Debug, FromRow)]
struct BankAccountRow {
    id: Uuid,
    company_id: Uuid,
    account_name: String,
    account_number: Option<String>,
    current_balance: Decimal,
    gl_account_id: Option<Uuid>,
}

impl From<BankAccountRow> for BankAccount {
    fn from(row: BankAccountRow) -> Self {
        BankAccount {
            id: BankAccountId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            account_name: row.account_name,
            account_number: row.account_number,
            current_balance: row.current_balance,
            gl_account_id: row.gl_account_id.map(AccountId::from_uuid),
        }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    bank_account_id: Uuid,
    date: NaiveDate,
    description: String,
    reference: Option<String>,
    amount: Decimal,
    direction: String,
    is_reconciled: bool,
    matched_entry_id: Option<Uuid>,
}

impl TryFrom<TransactionRow> for SystemTransaction {
    type Error = PortError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(SystemTransaction {
            id: BankTransactionId::from_uuid(row.id),
            bank_account_id: BankAccountId::from_uuid(row.bank_account_id),
            date: row.date,
            description: row.description,
            reference: row.reference,
            amount: row.amount,
            direction: parse_column("direction", &row.direction)?,
            is_reconciled: row.is_reconciled,
            matched_entry_id: row.matched_entry_id.map(BankEntryId::from_uuid),
        })
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, bank_account_id, date, description, reference, amount, direction, is_reconciled, matched_entry_id";

#[derive(Debug, FromRow)]
struct EntryRow {
    id: Uuid,
    bank_account_id: Uuid,
    date: NaiveDate,
    description: String,
    reference: Option<String>,
    amount: Decimal,
    direction: String,
    is_matched: bool,
    matched_transaction_id: Option<Uuid>,
}

impl TryFrom<EntryRow> for BankEntry {
    type Error = PortError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(BankEntry {
            id: BankEntryId::from_uuid(row.id),
            bank_account_id: BankAccountId::from_uuid(row.bank_account_id),
            date: row.date,
            description: row.description,
            reference: row.reference,
            amount: row.amount,
            direction: parse_column("direction", &row.direction)?,
            is_matched: row.is_matched,
            matched_transaction_id: row.matched_transaction_id.map(BankTransactionId::from_uuid),
        })
    }
}

const ENTRY_COLUMNS: &str =
    "id, bank_account_id, date, description, reference, amount, direction, is_matched, matched_transaction_id";

#[derive(Debug, FromRow)]
struct ReconciliationRow {
    id: Uuid,
    bank_account_id: Uuid,
    statement_date: NaiveDate,
    statement_balance: Decimal,
    system_balance: Decimal,
    difference: Decimal,
    is_reconciled: bool,
    completed_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct MatchRow {
    reconciliation_id: Uuid,
    system_transaction_id: Uuid,
    bank_entry_id: Uuid,
}

#[async_trait]
impl ReconciliationTx for PgTx {
    async fn find_bank_account(&mut self, company_id: CompanyId, id: BankAccountId) -> Result<Option<BankAccount>, PortError> {
        let row: Option<BankAccountRow> = sqlx::query_as(
            "SELECT id, company_id, account_name, account_number, current_balance, gl_account_id \
             FROM bank_accounts WHERE company_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(company_id.into_uuid())
        .bind(id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        Ok(row.map(BankAccount::from))
    }

    async fn insert_bank_account(&mut self, account: &BankAccount) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO bank_accounts (id, company_id, account_name, account_number, current_balance, gl_account_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(account.id.into_uuid())
        .bind(account.company_id.into_uuid())
        .bind(&account.account_name)
        .bind(&account.account_number)
        .bind(account.current_balance)
        .bind(account.gl_account_id.map(AccountId::into_uuid))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }

    async fn insert_system_transaction(&mut self, transaction: &SystemTransaction) -> Result<(), PortError> {
        sqlx::query(&format!(
            "INSERT INTO bank_transactions ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction.id.into_uuid())
        .bind(transaction.bank_account_id.into_uuid())
        .bind(transaction.date)
        .bind(&transaction.description)
        .bind(&transaction.reference)
        .bind(transaction.amount)
        .bind(transaction.direction.as_str())
        .bind(transaction.is_reconciled)
        .bind(transaction.matched_entry_id.map(BankEntryId::into_uuid))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }

    async fn insert_bank_entry(&mut self, entry: &BankEntry) -> Result<(), PortError> {
        sqlx::query(&format!(
            "INSERT INTO bank_statement_entries ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            ENTRY_COLUMNS
        ))
        .bind(entry.id.into_uuid())
        .bind(entry.bank_account_id.into_uuid())
        .bind(entry.date)
        .bind(&entry.description)
        .bind(&entry.reference)
        .bind(entry.amount)
        .bind(entry.direction.as_str())
        .bind(entry.is_matched)
        .bind(entry.matched_transaction_id.map(BankTransactionId::into_uuid))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }

    async fn find_system_transaction(&mut self, id: BankTransactionId) -> Result<Option<SystemTransaction>, PortError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bank_transactions WHERE id = $1 FOR UPDATE",
            TRANSACTION_COLUMNS
        ))
        .bind(id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        row.map(SystemTransaction::try_from).transpose()
    }

    async fn find_bank_entry(&mut self, id: BankEntryId) -> Result<Option<BankEntry>, PortError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bank_statement_entries WHERE id = $1 FOR UPDATE",
            ENTRY_COLUMNS
        ))
        .bind(id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        row.map(BankEntry::try_from).transpose()
    }

    async fn transactions(&mut self, bank_account_id: BankAccountId) -> Result<Vec<SystemTransaction>, PortError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bank_transactions WHERE bank_account_id = $1 ORDER BY date, id",
            TRANSACTION_COLUMNS
        ))
        .bind(bank_account_id.into_uuid())
        .fetch_all(self.conn())
        .await
        .map_err(port_error)?;

        rows.into_iter().map(SystemTransaction::try_from).collect()
    }

    async fn mark_transaction_reconciled(&mut self, id: BankTransactionId, entry_id: BankEntryId) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE bank_transactions SET is_reconciled = TRUE, matched_entry_id = $2 WHERE id = $1",
        )
        .bind(id.into_uuid())
        .bind(entry_id.into_uuid())
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("SystemTransaction", id));
        }
        Ok(())
    }

    async fn mark_entry_matched(&mut self, id: BankEntryId, transaction_id: BankTransactionId) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE bank_statement_entries SET is_matched = TRUE, matched_transaction_id = $2 WHERE id = $1",
        )
        .bind(id.into_uuid())
        .bind(transaction_id.into_uuid())
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("BankEntry", id));
        }
        Ok(())
    }

    async fn insert_reconciliation(&mut self, reconciliation: &Reconciliation) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO reconciliations (id, bank_account_id, statement_date, statement_balance, system_balance, \
             difference, is_reconciled, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(reconciliation.id.into_uuid())
        .bind(reconciliation.bank_account_id.into_uuid())
        .bind(reconciliation.statement_date)
        .bind(reconciliation.statement_balance)
        .bind(reconciliation.system_balance)
        .bind(reconciliation.difference)
        .bind(reconciliation.is_reconciled)
        .bind(reconciliation.completed_at)
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        for pair in &reconciliation.matches {
            sqlx::query(
                "INSERT INTO reconciliation_matches (reconciliation_id, system_transaction_id, bank_entry_id) \
                 VALUES ($1, $2, $3)",
            )
            .bind(reconciliation.id.into_uuid())
            .bind(pair.system_transaction_id.into_uuid())
            .bind(pair.bank_entry_id.into_uuid())
            .execute(self.conn())
            .await
            .map_err(port_error)?;
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        (*self).commit_tx().await
    }
}

/// Bank account storage in PostgreSQL
#[derive(Clone)]
pub struct PostgresBankingAdapter {
    pool: PgPool,
}

impl PostgresBankingAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresBankingAdapter {}

#[async_trait]
impl BankingStore for PostgresBankingAdapter {
    async fn begin_banking(&self) -> Result<Box<dyn ReconciliationTx>, PortError> {
        Ok(Box::new(PgTx::begin(&self.pool).await?))
    }

    async fn bank_accounts(&self, company_id: CompanyId) -> Result<Vec<BankAccount>, PortError> {
        let rows: Vec<BankAccountRow> = sqlx::query_as(
            "SELECT id, company_id, account_name, account_number, current_balance, gl_account_id \
             FROM bank_accounts WHERE company_id = $1 ORDER BY account_name",
        )
        .bind(company_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        Ok(rows.into_iter().map(BankAccount::from).collect())
    }

    async fn unmatched_entries(&self, bank_account_id: BankAccountId) -> Result<Vec<BankEntry>, PortError> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bank_statement_entries WHERE bank_account_id = $1 AND NOT is_matched ORDER BY date, id",
            ENTRY_COLUMNS
        ))
        .bind(bank_account_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(BankEntry::try_from).collect()
    }

    async fn reconciliations(&self, bank_account_id: BankAccountId) -> Result<Vec<Reconciliation>, PortError> {
        let rows: Vec<ReconciliationRow> = sqlx::query_as(
            "SELECT id, bank_account_id, statement_date, statement_balance, system_balance, difference, \
             is_reconciled, completed_at FROM reconciliations WHERE bank_account_id = $1 ORDER BY completed_at",
        )
        .bind(bank_account_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let matches: Vec<MatchRow> = sqlx::query_as(
            "SELECT reconciliation_id, system_transaction_id, bank_entry_id \
             FROM reconciliation_matches WHERE reconciliation_id = ANY($1)",
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        let mut by_reconciliation: HashMap<Uuid, Vec<MatchPair>> = HashMap::new();
        for m in matches {
            by_reconciliation.entry(m.reconciliation_id).or_default().push(MatchPair::new(
                BankTransactionId::from_uuid(m.system_transaction_id),
                BankEntryId::from_uuid(m.bank_entry_id),
            ));
        }

        Ok(rows
            .into_iter()
            .map(|row| Reconciliation {
                id: ReconciliationId::from_uuid(row.id),
                bank_account_id: BankAccountId::from_uuid(row.bank_account_id),
                statement_date: row.statement_date,
                statement_balance: row.statement_balance,
                system_balance: row.system_balance,
                difference: row.difference,
                is_reconciled: row.is_reconciled,
                matches: by_reconciliation.remove(&row.id).unwrap_or_default(),
                completed_at: row.completed_at,
            })
            .collect())
    }
}
