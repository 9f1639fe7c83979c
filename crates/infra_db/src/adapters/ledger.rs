//! PostgreSQL ledger adapter
//!
//! Implements [`LedgerTx`] on [`PgTx`] and [`LedgerStore`] on
//! [`PostgresLedgerAdapter`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{AccountId, CompanyId, DomainPort, JournalEntryId, JournalLineId, PortError, ProductId};
use domain_ledger::{
    Account, DefaultAccounts, EntryStatus, JournalEntry, JournalLine, LedgerStore, LedgerTx, Product, SourceClaim,
    SourceRef, StockMovement,
};
use crate::adapters::tx::{parse_column, to_db_int, PgTx};
use crate::error::{decode_error, port_error};

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    company_id: Uuid,
    code: String,
    name: String,
    account_type: String,
    category: Option<String>,
    normal_balance: String,
    current_balance: Decimal,
    is_active: bool,
}

impl TryFrom<AccountRow> for Account {
    type Error = PortError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            code: row.code,
            name: row.name,
            account_type: parse_column("account_type", &row.account_type)?,
            category: row
                .category
                .as_deref()
                .map(|c| parse_column("category", c))
                .transpose()?,
            normal_balance: parse_column("normal_balance", &row.normal_balance)?,
            current_balance: row.current_balance,
            is_active: row.is_active,
        })
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, company_id, code, name, account_type, category, normal_balance, current_balance, is_active";

#[derive(Debug, FromRow)]
struct DefaultAccountsRow {
    cash: Option<Uuid>,
    accounts_receivable: Option<Uuid>,
    accounts_payable: Option<Uuid>,
    sales: Option<Uuid>,
    sales_tax: Option<Uuid>,
    cogs: Option<Uuid>,
    inventory: Option<Uuid>,
}

impl From<DefaultAccountsRow> for DefaultAccounts {
    fn from(row: DefaultAccountsRow) -> Self {
        DefaultAccounts {
            cash: row.cash.map(AccountId::from_uuid),
            accounts_receivable: row.accounts_receivable.map(AccountId::from_uuid),
            accounts_payable: row.accounts_payable.map(AccountId::from_uuid),
            sales: row.sales.map(AccountId::from_uuid),
            sales_tax: row.sales_tax.map(AccountId::from_uuid),
            cogs: row.cogs.map(AccountId::from_uuid),
            inventory: row.inventory.map(AccountId::from_uuid),
        }
    }
}

#[derive(Debug, FromRow)]
struct JournalEntryRow {
    id: Uuid,
    company_id: Uuid,
    journal_number: String,
    entry_date: NaiveDate,
    description: String,
    source_type: String,
    source_id: Option<Uuid>,
    status: String,
    total_debit: Decimal,
    total_credit: Decimal,
    reversal_of: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl JournalEntryRow {
    fn into_entry(self, lines: Vec<JournalLine>) -> Result<JournalEntry, PortError> {
        Ok(JournalEntry {
            id: JournalEntryId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            journal_number: self.journal_number,
            entry_date: self.entry_date,
            description: self.description,
            source_type: parse_column("source_type", &self.source_type)?,
            source_id: self.source_id,
            status: parse_column("status", &self.status)?,
            total_debit: self.total_debit,
            total_credit: self.total_credit,
            reversal_of: self.reversal_of.map(JournalEntryId::from_uuid),
            lines,
            created_at: self.created_at,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, company_id, journal_number, entry_date, description, source_type, source_id, \
     status, total_debit, total_credit, reversal_of, created_at";

#[derive(Debug, FromRow)]
struct JournalLineRow {
    id: Uuid,
    journal_entry_id: Uuid,
    account_id: Uuid,
    description: Option<String>,
    debit: Decimal,
    credit: Decimal,
}

impl From<JournalLineRow> for JournalLine {
    fn from(row: JournalLineRow) -> Self {
        JournalLine {
            id: JournalLineId::from_uuid(row.id),
            journal_entry_id: JournalEntryId::from_uuid(row.journal_entry_id),
            account_id: AccountId::from_uuid(row.account_id),
            description: row.description,
            debit: row.debit,
            credit: row.credit,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    cost_price: Option<Decimal>,
    track_inventory: bool,
    stock_quantity: Decimal,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            name: row.name,
            cost_price: row.cost_price,
            track_inventory: row.track_inventory,
            stock_quantity: row.stock_quantity,
        }
    }
}

/// Loads entries with their lines, keeping the order of `rows`
async fn attach_lines(conn: &mut PgConnection, rows: Vec<JournalEntryRow>) -> Result<Vec<JournalEntry>, PortError> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let lines: Vec<JournalLineRow> = sqlx::query_as(
        "SELECT id, journal_entry_id, account_id, description, debit, credit \
         FROM journal_lines WHERE journal_entry_id = ANY($1) \
         ORDER BY journal_entry_id, line_number",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await
    .map_err(port_error)?;

    let mut by_entry: HashMap<Uuid, Vec<JournalLine>> = HashMap::new();
    for line in lines {
        by_entry.entry(line.journal_entry_id).or_default().push(line.into());
    }

    rows.into_iter()
        .map(|row| {
            let lines = by_entry.remove(&row.id).unwrap_or_default();
            row.into_entry(lines)
        })
        .collect()
}

pub(crate) async fn fetch_accounts(conn: &mut PgConnection, company_id: CompanyId) -> Result<Vec<Account>, PortError> {
    let rows: Vec<AccountRow> = sqlx::query_as(&format!(
        "SELECT {} FROM accounts WHERE company_id = $1 ORDER BY code",
        ACCOUNT_COLUMNS
    ))
    .bind(company_id.into_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(port_error)?;

    rows.into_iter().map(Account::try_from).collect()
}

pub(crate) async fn fetch_journal_entries(
    conn: &mut PgConnection,
    company_id: CompanyId,
) -> Result<Vec<JournalEntry>, PortError> {
    let rows: Vec<JournalEntryRow> = sqlx::query_as(&format!(
        "SELECT {} FROM journal_entries WHERE company_id = $1 ORDER BY created_at, journal_number",
        ENTRY_COLUMNS
    ))
    .bind(company_id.into_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(port_error)?;

    attach_lines(conn, rows).await
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn find_account(&mut self, company_id: CompanyId, id: AccountId) -> Result<Option<Account>, PortError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE company_id = $1 AND id = $2",
            ACCOUNT_COLUMNS
        ))
        .bind(company_id.into_uuid())
        .bind(id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn find_account_by_code(&mut self, company_id: CompanyId, code: &str) -> Result<Option<Account>, PortError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE company_id = $1 AND code = $2",
            ACCOUNT_COLUMNS
        ))
        .bind(company_id.into_uuid())
        .bind(code)
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> Result<bool, PortError> {
        let result = sqlx::query(
            "INSERT INTO accounts (id, company_id, code, name, account_type, category, normal_balance, \
             current_balance, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (company_id, code) DO NOTHING",
        )
        .bind(account.id.into_uuid())
        .bind(account.company_id.into_uuid())
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type.as_str())
        .bind(account.category.map(|c| c.as_str()))
        .bind(account.normal_balance.as_str())
        .bind(account.current_balance)
        .bind(account.is_active)
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn apply_balance_delta(&mut self, id: AccountId, delta: Decimal) -> Result<Decimal, PortError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            "UPDATE accounts SET current_balance = current_balance + $2 WHERE id = $1 RETURNING current_balance",
        )
        .bind(id.into_uuid())
        .bind(delta)
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        balance.ok_or_else(|| PortError::not_found("Account", id))
    }

    async fn default_accounts(&mut self, company_id: CompanyId) -> Result<DefaultAccounts, PortError> {
        let row: Option<DefaultAccountsRow> = sqlx::query_as(
            "SELECT cash, accounts_receivable, accounts_payable, sales, sales_tax, cogs, inventory \
             FROM default_accounts WHERE company_id = $1",
        )
        .bind(company_id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        Ok(row.map(DefaultAccounts::from).unwrap_or_default())
    }

    async fn save_default_accounts(&mut self, company_id: CompanyId, defaults: &DefaultAccounts) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO default_accounts \
             (company_id, cash, accounts_receivable, accounts_payable, sales, sales_tax, cogs, inventory) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (company_id) DO UPDATE SET \
             cash = EXCLUDED.cash, accounts_receivable = EXCLUDED.accounts_receivable, \
             accounts_payable = EXCLUDED.accounts_payable, sales = EXCLUDED.sales, \
             sales_tax = EXCLUDED.sales_tax, cogs = EXCLUDED.cogs, inventory = EXCLUDED.inventory, \
             updated_at = NOW()",
        )
        .bind(company_id.into_uuid())
        .bind(defaults.cash.map(AccountId::into_uuid))
        .bind(defaults.accounts_receivable.map(AccountId::into_uuid))
        .bind(defaults.accounts_payable.map(AccountId::into_uuid))
        .bind(defaults.sales.map(AccountId::into_uuid))
        .bind(defaults.sales_tax.map(AccountId::into_uuid))
        .bind(defaults.cogs.map(AccountId::into_uuid))
        .bind(defaults.inventory.map(AccountId::into_uuid))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }

    async fn next_journal_sequence(&mut self, company_id: CompanyId) -> Result<u64, PortError> {
        // The upsert takes the counter row lock, serializing concurrent postings
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO journal_counters (company_id, last_value) VALUES ($1, 1) \
             ON CONFLICT (company_id) DO UPDATE SET last_value = journal_counters.last_value + 1 \
             RETURNING last_value",
        )
        .bind(company_id.into_uuid())
        .fetch_one(self.conn())
        .await
        .map_err(port_error)?;

        u64::try_from(value).map_err(|e| decode_error("last_value", e))
    }

    async fn insert_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO journal_entries (id, company_id, journal_number, entry_date, description, source_type, \
             source_id, status, total_debit, total_credit, reversal_of, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(entry.id.into_uuid())
        .bind(entry.company_id.into_uuid())
        .bind(&entry.journal_number)
        .bind(entry.entry_date)
        .bind(&entry.description)
        .bind(entry.source_type.as_str())
        .bind(entry.source_id)
        .bind(entry.status.as_str())
        .bind(entry.total_debit)
        .bind(entry.total_credit)
        .bind(entry.reversal_of.map(JournalEntryId::into_uuid))
        .bind(entry.created_at)
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        for (index, line) in entry.lines.iter().enumerate() {
            let line_number = u32::try_from(index + 1).map_err(|e| decode_error("line_number", e))?;
            sqlx::query(
                "INSERT INTO journal_lines (id, journal_entry_id, line_number, account_id, description, debit, credit) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(line.id.into_uuid())
            .bind(entry.id.into_uuid())
            .bind(to_db_int("line_number", line_number)?)
            .bind(line.account_id.into_uuid())
            .bind(&line.description)
            .bind(line.debit)
            .bind(line.credit)
            .execute(self.conn())
            .await
            .map_err(port_error)?;
        }

        debug!(journal_number = %entry.journal_number, lines = entry.lines.len(), "journal entry inserted");
        Ok(())
    }

    async fn find_journal_entry(&mut self, company_id: CompanyId, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError> {
        let row: Option<JournalEntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM journal_entries WHERE company_id = $1 AND id = $2",
            ENTRY_COLUMNS
        ))
        .bind(company_id.into_uuid())
        .bind(id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        match row {
            Some(row) => Ok(attach_lines(self.conn(), vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_entry_status(&mut self, id: JournalEntryId, status: EntryStatus) -> Result<(), PortError> {
        let result = sqlx::query("UPDATE journal_entries SET status = $2 WHERE id = $1")
            .bind(id.into_uuid())
            .bind(status.as_str())
            .execute(self.conn())
            .await
            .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("JournalEntry", id));
        }
        Ok(())
    }

    async fn posting_status(&mut self, company_id: CompanyId, source: SourceRef) -> Result<Option<JournalEntryId>, PortError> {
        let linked: Option<Option<Uuid>> = sqlx::query_scalar(
            "SELECT journal_entry_id FROM gl_postings \
             WHERE company_id = $1 AND source_type = $2 AND source_id = $3",
        )
        .bind(company_id.into_uuid())
        .bind(source.source_type.as_str())
        .bind(source.source_id)
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        Ok(linked.flatten().map(JournalEntryId::from_uuid))
    }

    async fn claim_source(&mut self, company_id: CompanyId, source: SourceRef) -> Result<SourceClaim, PortError> {
        // A concurrent claimant's uncommitted row makes this insert wait for
        // its outcome; after a commit the insert does nothing and the select
        // below sees the linked entry.
        let inserted = sqlx::query(
            "INSERT INTO gl_postings (company_id, source_type, source_id) VALUES ($1, $2, $3) \
             ON CONFLICT (company_id, source_type, source_id) DO NOTHING",
        )
        .bind(company_id.into_uuid())
        .bind(source.source_type.as_str())
        .bind(source.source_id)
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        if inserted.rows_affected() == 1 {
            return Ok(SourceClaim::Claimed);
        }

        match self.posting_status(company_id, source).await? {
            Some(entry_id) => Ok(SourceClaim::AlreadyPosted(entry_id)),
            None => Err(PortError::conflict(format!(
                "{} {} is claimed but has no journal entry",
                source.source_type, source.source_id
            ))),
        }
    }

    async fn link_source(&mut self, company_id: CompanyId, source: SourceRef, entry_id: JournalEntryId) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE gl_postings SET journal_entry_id = $4 \
             WHERE company_id = $1 AND source_type = $2 AND source_id = $3 AND journal_entry_id IS NULL",
        )
        .bind(company_id.into_uuid())
        .bind(source.source_type.as_str())
        .bind(source.source_id)
        .bind(entry_id.into_uuid())
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::conflict(format!(
                "{} {} was not claimed",
                source.source_type, source.source_id
            )));
        }
        Ok(())
    }

    async fn find_product(&mut self, company_id: CompanyId, id: ProductId) -> Result<Option<Product>, PortError> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, company_id, name, cost_price, track_inventory, stock_quantity \
             FROM products WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id.into_uuid())
        .bind(id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        Ok(row.map(Product::from))
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: Decimal) -> Result<Decimal, PortError> {
        let quantity: Option<Decimal> = sqlx::query_scalar(
            "UPDATE products SET stock_quantity = stock_quantity + $2 WHERE id = $1 RETURNING stock_quantity",
        )
        .bind(id.into_uuid())
        .bind(delta)
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        quantity.ok_or_else(|| PortError::not_found("Product", id))
    }

    async fn insert_stock_movement(&mut self, movement: &StockMovement) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO stock_movements (id, company_id, product_id, movement_type, quantity, balance_before, \
             balance_after, reference_type, reference_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(movement.id.into_uuid())
        .bind(movement.company_id.into_uuid())
        .bind(movement.product_id.into_uuid())
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.balance_before)
        .bind(movement.balance_after)
        .bind(movement.reference_type.as_str())
        .bind(movement.reference_id)
        .bind(movement.created_at)
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        (*self).commit_tx().await
    }
}

/// Ledger storage in PostgreSQL
#[derive(Clone)]
pub struct PostgresLedgerAdapter {
    pool: PgPool,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl LedgerStore for PostgresLedgerAdapter {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, PortError> {
        Ok(Box::new(PgTx::begin(&self.pool).await?))
    }

    async fn list_accounts(&self, company_id: CompanyId) -> Result<Vec<Account>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(port_error)?;
        fetch_accounts(&mut conn, company_id).await
    }

    async fn list_journal_entries(&self, company_id: CompanyId) -> Result<Vec<JournalEntry>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(port_error)?;
        fetch_journal_entries(&mut conn, company_id).await
    }
}
