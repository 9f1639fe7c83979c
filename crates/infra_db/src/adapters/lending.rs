//! PostgreSQL lending adapter
//!
//! Loans, their schedules and payments, and prepaid expenses. The lending
//! unit of work is the same [`PgTx`] the ledger uses, so a payment's journal
//! entry lands in the same commit as the loan update.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{
    AccountId, CompanyId, DomainPort, JournalEntryId, LoanId, LoanPaymentId, LoanScheduleId, PortError,
    PrepaidExpenseId, PrepaidRecognitionId, Rate,
};
use domain_ledger::{Account, JournalEntry, LedgerStore, LedgerTx};
use domain_lending::{
    LendingStore, LendingTx, Loan, LoanGlAccounts, LoanPayment, PrepaidExpense, PrepaidGlAccounts,
    PrepaidRecognition, ScheduleEntry, UpcomingPayment,
};
use crate::adapters::ledger::{fetch_accounts, fetch_journal_entries};
use crate::adapters::tx::{from_db_int, parse_column, to_db_int, PgTx};
use crate::error::port_error;

#[derive(Debug, FromRow)]
struct LoanRow {
    id: Uuid,
    company_id: Uuid,
    loan_name: String,
    lender_name: String,
    principal_amount: Decimal,
    interest_rate: Decimal,
    interest_type: String,
    term_months: i32,
    payment_frequency: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    monthly_payment: Decimal,
    total_interest: Decimal,
    remaining_balance: Decimal,
    principal_paid: Decimal,
    interest_paid: Decimal,
    total_paid: Decimal,
    is_active: bool,
    loan_account_id: Option<Uuid>,
    interest_account_id: Option<Uuid>,
}

impl TryFrom<LoanRow> for Loan {
    type Error = PortError;

    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        let gl_accounts = match (row.loan_account_id, row.interest_account_id) {
            (Some(liability), Some(interest_expense)) => Some(LoanGlAccounts {
                liability: AccountId::from_uuid(liability),
                interest_expense: AccountId::from_uuid(interest_expense),
            }),
            _ => None,
        };

        Ok(Loan {
            id: LoanId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            loan_name: row.loan_name,
            lender_name: row.lender_name,
            principal_amount: row.principal_amount,
            interest_rate: Rate::new(row.interest_rate),
            interest_type: parse_column("interest_type", &row.interest_type)?,
            term_months: from_db_int("term_months", row.term_months)?,
            payment_frequency: parse_column("payment_frequency", &row.payment_frequency)?,
            start_date: row.start_date,
            end_date: row.end_date,
            monthly_payment: row.monthly_payment,
            total_interest: row.total_interest,
            remaining_balance: row.remaining_balance,
            principal_paid: row.principal_paid,
            interest_paid: row.interest_paid,
            total_paid: row.total_paid,
            is_active: row.is_active,
            gl_accounts,
        })
    }
}

const LOAN_COLUMNS: &str = "id, company_id, loan_name, lender_name, principal_amount, interest_rate, interest_type, \
     term_months, payment_frequency, start_date, end_date, monthly_payment, total_interest, remaining_balance, \
     principal_paid, interest_paid, total_paid, is_active, loan_account_id, interest_account_id";

#[derive(Debug, FromRow)]
struct ScheduleRow {
    id: Uuid,
    loan_id: Uuid,
    period_number: i32,
    due_date: NaiveDate,
    principal_due: Decimal,
    interest_due: Decimal,
    total_due: Decimal,
    balance_after: Decimal,
    is_paid: bool,
    paid_date: Option<NaiveDate>,
}

impl TryFrom<ScheduleRow> for ScheduleEntry {
    type Error = PortError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(ScheduleEntry {
            id: LoanScheduleId::from_uuid(row.id),
            loan_id: LoanId::from_uuid(row.loan_id),
            period_number: from_db_int("period_number", row.period_number)?,
            due_date: row.due_date,
            principal_due: row.principal_due,
            interest_due: row.interest_due,
            total_due: row.total_due,
            balance_after: row.balance_after,
            is_paid: row.is_paid,
            paid_date: row.paid_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    loan_id: Uuid,
    payment_number: i32,
    payment_date: NaiveDate,
    principal_part: Decimal,
    interest_part: Decimal,
    total_payment: Decimal,
    balance_after: Decimal,
    journal_entry_id: Option<Uuid>,
}

impl TryFrom<PaymentRow> for LoanPayment {
    type Error = PortError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(LoanPayment {
            id: LoanPaymentId::from_uuid(row.id),
            loan_id: LoanId::from_uuid(row.loan_id),
            payment_number: from_db_int("payment_number", row.payment_number)?,
            payment_date: row.payment_date,
            principal_part: row.principal_part,
            interest_part: row.interest_part,
            total_payment: row.total_payment,
            balance_after: row.balance_after,
            journal_entry_id: row.journal_entry_id.map(JournalEntryId::from_uuid),
        })
    }
}

#[derive(Debug, FromRow)]
struct UpcomingRow {
    loan_id: Uuid,
    loan_name: String,
    lender_name: String,
    period_number: i32,
    due_date: NaiveDate,
    principal_due: Decimal,
    interest_due: Decimal,
    total_due: Decimal,
}

impl TryFrom<UpcomingRow> for UpcomingPayment {
    type Error = PortError;

    fn try_from(row: UpcomingRow) -> Result<Self, Self::Error> {
        Ok(UpcomingPayment {
            loan_id: LoanId::from_uuid(row.loan_id),
            loan_name: row.loan_name,
            lender_name: row.lender_name,
            period_number: from_db_int("period_number", row.period_number)?,
            due_date: row.due_date,
            principal_due: row.principal_due,
            interest_due: row.interest_due,
            total_due: row.total_due,
        })
    }
}

#[derive(Debug, FromRow)]
struct PrepaidRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    total_amount: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    period_months: i32,
    monthly_amount: Decimal,
    recognized_amount: Decimal,
    remaining_amount: Decimal,
    periods_recognized: i32,
    last_recognized_at: Option<NaiveDate>,
    is_active: bool,
    expense_account_id: Option<Uuid>,
    asset_account_id: Option<Uuid>,
}

impl TryFrom<PrepaidRow> for PrepaidExpense {
    type Error = PortError;

    fn try_from(row: PrepaidRow) -> Result<Self, Self::Error> {
        let gl_accounts = match (row.expense_account_id, row.asset_account_id) {
            (Some(expense), Some(prepaid_asset)) => Some(PrepaidGlAccounts {
                expense: AccountId::from_uuid(expense),
                prepaid_asset: AccountId::from_uuid(prepaid_asset),
            }),
            _ => None,
        };

        Ok(PrepaidExpense {
            id: PrepaidExpenseId::from_uuid(row.id),
            company_id: CompanyId::from_uuid(row.company_id),
            name: row.name,
            total_amount: row.total_amount,
            start_date: row.start_date,
            end_date: row.end_date,
            period_months: from_db_int("period_months", row.period_months)?,
            monthly_amount: row.monthly_amount,
            recognized_amount: row.recognized_amount,
            remaining_amount: row.remaining_amount,
            periods_recognized: from_db_int("periods_recognized", row.periods_recognized)?,
            last_recognized_at: row.last_recognized_at,
            is_active: row.is_active,
            gl_accounts,
        })
    }
}

const PREPAID_COLUMNS: &str = "id, company_id, name, total_amount, start_date, end_date, period_months, \
     monthly_amount, recognized_amount, remaining_amount, periods_recognized, last_recognized_at, is_active, \
     expense_account_id, asset_account_id";

#[derive(Debug, FromRow)]
struct RecognitionRow {
    id: Uuid,
    prepaid_id: Uuid,
    period_number: i32,
    period_date: NaiveDate,
    amount: Decimal,
    journal_entry_id: Option<Uuid>,
}

impl TryFrom<RecognitionRow> for PrepaidRecognition {
    type Error = PortError;

    fn try_from(row: RecognitionRow) -> Result<Self, Self::Error> {
        Ok(PrepaidRecognition {
            id: PrepaidRecognitionId::from_uuid(row.id),
            prepaid_id: PrepaidExpenseId::from_uuid(row.prepaid_id),
            period_number: from_db_int("period_number", row.period_number)?,
            period_date: row.period_date,
            amount: row.amount,
            journal_entry_id: row.journal_entry_id.map(JournalEntryId::from_uuid),
        })
    }
}

#[async_trait]
impl LendingTx for PgTx {
    async fn insert_loan(&mut self, loan: &Loan, schedule: &[ScheduleEntry]) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO loans (id, company_id, loan_name, lender_name, principal_amount, interest_rate, \
             interest_type, term_months, payment_frequency, start_date, end_date, monthly_payment, total_interest, \
             remaining_balance, principal_paid, interest_paid, total_paid, is_active, loan_account_id, \
             interest_account_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(loan.id.into_uuid())
        .bind(loan.company_id.into_uuid())
        .bind(&loan.loan_name)
        .bind(&loan.lender_name)
        .bind(loan.principal_amount)
        .bind(loan.interest_rate.as_decimal())
        .bind(loan.interest_type.as_str())
        .bind(to_db_int("term_months", loan.term_months)?)
        .bind(loan.payment_frequency.as_str())
        .bind(loan.start_date)
        .bind(loan.end_date)
        .bind(loan.monthly_payment)
        .bind(loan.total_interest)
        .bind(loan.remaining_balance)
        .bind(loan.principal_paid)
        .bind(loan.interest_paid)
        .bind(loan.total_paid)
        .bind(loan.is_active)
        .bind(loan.gl_accounts.map(|g| g.liability.into_uuid()))
        .bind(loan.gl_accounts.map(|g| g.interest_expense.into_uuid()))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        for entry in schedule {
            sqlx::query(
                "INSERT INTO loan_schedules (id, loan_id, period_number, due_date, principal_due, interest_due, \
                 total_due, balance_after, is_paid, paid_date) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(entry.id.into_uuid())
            .bind(entry.loan_id.into_uuid())
            .bind(to_db_int("period_number", entry.period_number)?)
            .bind(entry.due_date)
            .bind(entry.principal_due)
            .bind(entry.interest_due)
            .bind(entry.total_due)
            .bind(entry.balance_after)
            .bind(entry.is_paid)
            .bind(entry.paid_date)
            .execute(self.conn())
            .await
            .map_err(port_error)?;
        }

        Ok(())
    }

    async fn find_loan_for_update(&mut self, company_id: CompanyId, id: LoanId) -> Result<Option<Loan>, PortError> {
        let row: Option<LoanRow> = sqlx::query_as(&format!(
            "SELECT {} FROM loans WHERE company_id = $1 AND id = $2 FOR UPDATE",
            LOAN_COLUMNS
        ))
        .bind(company_id.into_uuid())
        .bind(id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        row.map(Loan::try_from).transpose()
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE loans SET remaining_balance = $2, principal_paid = $3, interest_paid = $4, total_paid = $5, \
             is_active = $6 WHERE id = $1",
        )
        .bind(loan.id.into_uuid())
        .bind(loan.remaining_balance)
        .bind(loan.principal_paid)
        .bind(loan.interest_paid)
        .bind(loan.total_paid)
        .bind(loan.is_active)
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Loan", loan.id));
        }
        Ok(())
    }

    async fn next_payment_number(&mut self, loan_id: LoanId) -> Result<u32, PortError> {
        let count: Option<i32> = sqlx::query_scalar(
            "UPDATE loans SET payment_count = payment_count + 1 WHERE id = $1 RETURNING payment_count",
        )
        .bind(loan_id.into_uuid())
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        let count = count.ok_or_else(|| PortError::not_found("Loan", loan_id))?;
        from_db_int("payment_count", count)
    }

    async fn insert_loan_payment(&mut self, payment: &LoanPayment) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO loan_payments (id, loan_id, payment_number, payment_date, principal_part, interest_part, \
             total_payment, balance_after, journal_entry_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(payment.id.into_uuid())
        .bind(payment.loan_id.into_uuid())
        .bind(to_db_int("payment_number", payment.payment_number)?)
        .bind(payment.payment_date)
        .bind(payment.principal_part)
        .bind(payment.interest_part)
        .bind(payment.total_payment)
        .bind(payment.balance_after)
        .bind(payment.journal_entry_id.map(JournalEntryId::into_uuid))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }

    async fn mark_next_schedule_paid(&mut self, loan_id: LoanId, paid_date: NaiveDate) -> Result<Option<u32>, PortError> {
        let period: Option<i32> = sqlx::query_scalar(
            "UPDATE loan_schedules SET is_paid = TRUE, paid_date = $2 \
             WHERE id = (SELECT id FROM loan_schedules WHERE loan_id = $1 AND NOT is_paid \
                         ORDER BY period_number LIMIT 1 FOR UPDATE) \
             RETURNING period_number",
        )
        .bind(loan_id.into_uuid())
        .bind(paid_date)
        .fetch_optional(self.conn())
        .await
        .map_err(port_error)?;

        period.map(|p| from_db_int("period_number", p)).transpose()
    }

    async fn insert_prepaid(&mut self, prepaid: &PrepaidExpense) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO prepaid_expenses (id, company_id, name, total_amount, start_date, end_date, period_months, \
             monthly_amount, recognized_amount, remaining_amount, periods_recognized, last_recognized_at, is_active, \
             expense_account_id, asset_account_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(prepaid.id.into_uuid())
        .bind(prepaid.company_id.into_uuid())
        .bind(&prepaid.name)
        .bind(prepaid.total_amount)
        .bind(prepaid.start_date)
        .bind(prepaid.end_date)
        .bind(to_db_int("period_months", prepaid.period_months)?)
        .bind(prepaid.monthly_amount)
        .bind(prepaid.recognized_amount)
        .bind(prepaid.remaining_amount)
        .bind(to_db_int("periods_recognized", prepaid.periods_recognized)?)
        .bind(prepaid.last_recognized_at)
        .bind(prepaid.is_active)
        .bind(prepaid.gl_accounts.map(|g| g.expense.into_uuid()))
        .bind(prepaid.gl_accounts.map(|g| g.prepaid_asset.into_uuid()))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }

    async fn active_prepaids_for_update(&mut self, company_id: CompanyId) -> Result<Vec<PrepaidExpense>, PortError> {
        let rows: Vec<PrepaidRow> = sqlx::query_as(&format!(
            "SELECT {} FROM prepaid_expenses WHERE company_id = $1 AND is_active ORDER BY id FOR UPDATE",
            PREPAID_COLUMNS
        ))
        .bind(company_id.into_uuid())
        .fetch_all(self.conn())
        .await
        .map_err(port_error)?;

        rows.into_iter().map(PrepaidExpense::try_from).collect()
    }

    async fn update_prepaid(&mut self, prepaid: &PrepaidExpense) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE prepaid_expenses SET recognized_amount = $2, remaining_amount = $3, periods_recognized = $4, \
             last_recognized_at = $5, is_active = $6 WHERE id = $1",
        )
        .bind(prepaid.id.into_uuid())
        .bind(prepaid.recognized_amount)
        .bind(prepaid.remaining_amount)
        .bind(to_db_int("periods_recognized", prepaid.periods_recognized)?)
        .bind(prepaid.last_recognized_at)
        .bind(prepaid.is_active)
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("PrepaidExpense", prepaid.id));
        }
        Ok(())
    }

    async fn insert_prepaid_recognition(&mut self, recognition: &PrepaidRecognition) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO prepaid_recognitions (id, prepaid_id, period_number, period_date, amount, journal_entry_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(recognition.id.into_uuid())
        .bind(recognition.prepaid_id.into_uuid())
        .bind(to_db_int("period_number", recognition.period_number)?)
        .bind(recognition.period_date)
        .bind(recognition.amount)
        .bind(recognition.journal_entry_id.map(JournalEntryId::into_uuid))
        .execute(self.conn())
        .await
        .map_err(port_error)?;

        Ok(())
    }
}

/// Lending and ledger storage in PostgreSQL
#[derive(Clone)]
pub struct PostgresLendingAdapter {
    pool: PgPool,
}

impl PostgresLendingAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresLendingAdapter {}

#[async_trait]
impl LedgerStore for PostgresLendingAdapter {
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

#[async_trait]
impl LendingStore for PostgresLendingAdapter {
    async fn begin_lending(&self) -> Result<Box<dyn LendingTx>, PortError> {
        Ok(Box::new(PgTx::begin(&self.pool).await?))
    }

    async fn active_loans(&self, company_id: CompanyId) -> Result<Vec<Loan>, PortError> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {} FROM loans WHERE company_id = $1 AND is_active ORDER BY start_date, loan_name",
            LOAN_COLUMNS
        ))
        .bind(company_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(Loan::try_from).collect()
    }

    async fn loan_schedule(&self, loan_id: LoanId) -> Result<Vec<ScheduleEntry>, PortError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT id, loan_id, period_number, due_date, principal_due, interest_due, total_due, balance_after, \
             is_paid, paid_date FROM loan_schedules WHERE loan_id = $1 ORDER BY period_number",
        )
        .bind(loan_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(ScheduleEntry::try_from).collect()
    }

    async fn loan_payments(&self, loan_id: LoanId) -> Result<Vec<LoanPayment>, PortError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            "SELECT id, loan_id, payment_number, payment_date, principal_part, interest_part, total_payment, \
             balance_after, journal_entry_id FROM loan_payments WHERE loan_id = $1 ORDER BY payment_number",
        )
        .bind(loan_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(LoanPayment::try_from).collect()
    }

    async fn upcoming_schedule(
        &self,
        company_id: CompanyId,
        until: NaiveDate,
    ) -> Result<Vec<UpcomingPayment>, PortError> {
        let rows: Vec<UpcomingRow> = sqlx::query_as(
            "SELECT l.id AS loan_id, l.loan_name, l.lender_name, s.period_number, s.due_date, s.principal_due, \
             s.interest_due, s.total_due \
             FROM loan_schedules s JOIN loans l ON l.id = s.loan_id \
             WHERE l.company_id = $1 AND l.is_active AND NOT s.is_paid AND s.due_date <= $2 \
             ORDER BY s.due_date, l.loan_name",
        )
        .bind(company_id.into_uuid())
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(UpcomingPayment::try_from).collect()
    }

    async fn prepaid_expenses(&self, company_id: CompanyId) -> Result<Vec<PrepaidExpense>, PortError> {
        let rows: Vec<PrepaidRow> = sqlx::query_as(&format!(
            "SELECT {} FROM prepaid_expenses WHERE company_id = $1 ORDER BY start_date, name",
            PREPAID_COLUMNS
        ))
        .bind(company_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(PrepaidExpense::try_from).collect()
    }

    async fn prepaid_recognitions(&self, prepaid_id: PrepaidExpenseId) -> Result<Vec<PrepaidRecognition>, PortError> {
        let rows: Vec<RecognitionRow> = sqlx::query_as(
            "SELECT id, prepaid_id, period_number, period_date, amount, journal_entry_id \
             FROM prepaid_recognitions WHERE prepaid_id = $1 ORDER BY period_number",
        )
        .bind(prepaid_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        rows.into_iter().map(PrepaidRecognition::try_from).collect()
    }
}
