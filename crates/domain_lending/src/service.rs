//! Lending service
//!
//! Each write operation runs in one lending transaction. Journal entries are
//! posted through [`post_in_tx`] inside that same transaction, so a payment
//! whose entry cannot be posted leaves the loan untouched.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use core_kernel::{round2, CompanyId, JournalEntryId, LoanId, PrepaidExpenseId};
use domain_ledger::{
    post_in_tx, resolve_accounts, AccountRole, PostingPolicy, PostingRequest, SourceType,
};
use crate::accrual::{calculate_interest_accrual, AccrualReport};
use crate::amortization::ScheduleEntry;
use crate::error::LendingError;
use crate::loan::{Loan, NewLoan};
use crate::payment::{allocate_payment, LoanPayment, PaymentAllocation};
use crate::ports::{LendingStore, LendingTx, UpcomingPayment};
use crate::prepaid::{NewPrepaidExpense, PrepaidExpense, PrepaidRecognition, PrepaidScheduleEntry};

/// Days ahead `upcoming_payments` looks when no window is given
pub const DEFAULT_UPCOMING_DAYS: u32 = 30;

/// What recording a payment did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: LoanPayment,
    pub allocation: PaymentAllocation,
    /// The loan after the payment
    pub loan: Loan,
    /// Schedule period marked paid, if any was still open
    pub schedule_period: Option<u32>,
}

/// Periods recognized for one prepaid expense in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedPrepaid {
    pub prepaid_id: PrepaidExpenseId,
    pub name: String,
    pub recognitions: Vec<PrepaidRecognition>,
    pub amount: Decimal,
    pub remaining_amount: Decimal,
    pub journal_entry_id: Option<JournalEntryId>,
}

/// Outcome of a recognition run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionRun {
    pub as_of: NaiveDate,
    /// Active prepaid expenses examined
    pub assets_examined: usize,
    pub total_recognized: Decimal,
    pub recognized: Vec<RecognizedPrepaid>,
}

impl RecognitionRun {
    /// Number of periods recognized across all assets
    pub fn periods_recognized(&self) -> usize {
        self.recognized.iter().map(|r| r.recognitions.len()).sum()
    }
}

/// Loans and prepaid expenses
#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn LendingStore>,
    policy: PostingPolicy,
}

impl LendingService {
    pub fn new(store: Arc<dyn LendingStore>, policy: PostingPolicy) -> Self {
        Self { store, policy }
    }

    /// Creates a loan and stores it with its schedule
    #[instrument(skip(self, terms), fields(loan_name = %terms.loan_name))]
    pub async fn create_loan(&self, company_id: CompanyId, terms: NewLoan) -> Result<Loan, LendingError> {
        let (loan, schedule) = Loan::create(company_id, terms)?;

        let mut tx = self.store.begin_lending().await?;
        tx.insert_loan(&loan, &schedule).await?;
        tx.commit().await?;

        info!(
            loan_id = %loan.id,
            principal = %loan.principal_amount,
            monthly_payment = %loan.monthly_payment,
            periods = schedule.len(),
            "loan created"
        );
        Ok(loan)
    }

    /// Records a payment against a loan
    ///
    /// Interest for one month on the remaining balance is settled first. The
    /// oldest unpaid schedule entry is marked paid. If the loan has ledger
    /// accounts, a `LOAN_PAYMENT` entry is posted: Dr loan liability for the
    /// principal, Dr interest expense for the interest, Cr cash for the total.
    ///
    /// # Errors
    ///
    /// - `LoanNotFound` if the company has no such loan
    /// - `InvalidState` if the loan is already fully paid
    /// - `InvalidInput` if the amount rounds to less than one cent
    /// - `Ledger(MissingDefaultAccount)` if the entry needs a cash account
    ///   and none is configured
    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        company_id: CompanyId,
        loan_id: LoanId,
        amount: Decimal,
        payment_date: NaiveDate,
    ) -> Result<PaymentReceipt, LendingError> {
        let mut tx = self.store.begin_lending().await?;

        let mut loan = tx
            .find_loan_for_update(company_id, loan_id)
            .await?
            .ok_or_else(|| LendingError::LoanNotFound(loan_id.to_string()))?;

        if loan.remaining_balance <= Decimal::ZERO {
            return Err(LendingError::InvalidState("loan already fully paid".to_string()));
        }
        // Allocation works in whole cents, so a sub-cent amount is no payment.
        if round2(amount) <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(format!("payment amount must be at least 0.01, got {}", amount)));
        }

        let allocation = allocate_payment(loan.remaining_balance, loan.interest_rate, amount);
        let payment_number = tx.next_payment_number(loan_id).await?;
        let mut payment = LoanPayment::new(loan_id, payment_number, payment_date, &allocation);

        if let Some(accounts) = loan.gl_accounts {
            let cash = resolve_accounts(tx.as_mut(), company_id).await?.require(AccountRole::Cash)?;

            let mut request = PostingRequest::new(
                SourceType::LoanPayment,
                format!("Loan payment #{} - {}", payment_number, loan.loan_name),
                payment_date,
            )
            .with_source_id(payment.id);
            if allocation.principal_part > Decimal::ZERO {
                request = request.debit(accounts.liability, allocation.principal_part);
            }
            if allocation.interest_part > Decimal::ZERO {
                request = request.debit(accounts.interest_expense, allocation.interest_part);
            }
            request = request.credit(cash, allocation.total_payment);

            let outcome = post_in_tx(tx.as_mut(), company_id, &request, &self.policy).await?;
            payment.journal_entry_id = Some(outcome.journal_entry_id());
        }

        tx.insert_loan_payment(&payment).await?;
        loan.apply_payment(&allocation);
        tx.update_loan(&loan).await?;
        let schedule_period = tx.mark_next_schedule_paid(loan_id, payment_date).await?;

        tx.commit().await?;

        info!(
            %loan_id,
            payment_number,
            principal = %allocation.principal_part,
            interest = %allocation.interest_part,
            balance = %loan.remaining_balance,
            "loan payment recorded"
        );

        Ok(PaymentReceipt {
            payment,
            allocation,
            loan,
            schedule_period,
        })
    }

    /// Unpaid installments of active loans due within `days_ahead` days of
    /// `as_of` (30 when not given), plus any still unpaid past their due date
    #[instrument(skip(self))]
    pub async fn upcoming_payments(
        &self,
        company_id: CompanyId,
        as_of: NaiveDate,
        days_ahead: Option<u32>,
    ) -> Result<Vec<UpcomingPayment>, LendingError> {
        let days = days_ahead.unwrap_or(DEFAULT_UPCOMING_DAYS);
        let until = as_of
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| LendingError::InvalidInput(format!("{} plus {} days is out of range", as_of, days)))?;

        Ok(self.store.upcoming_schedule(company_id, until).await?)
    }

    /// One month of interest on every active loan
    #[instrument(skip(self))]
    pub async fn interest_accrual(&self, company_id: CompanyId, as_of: NaiveDate) -> Result<AccrualReport, LendingError> {
        let loans = self.store.active_loans(company_id).await?;
        Ok(calculate_interest_accrual(&loans, as_of))
    }

    pub async fn loan_schedule(&self, loan_id: LoanId) -> Result<Vec<ScheduleEntry>, LendingError> {
        Ok(self.store.loan_schedule(loan_id).await?)
    }

    pub async fn loan_payments(&self, loan_id: LoanId) -> Result<Vec<LoanPayment>, LendingError> {
        Ok(self.store.loan_payments(loan_id).await?)
    }

    /// Registers a prepaid expense
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_prepaid_expense(
        &self,
        company_id: CompanyId,
        request: NewPrepaidExpense,
    ) -> Result<PrepaidExpense, LendingError> {
        let prepaid = PrepaidExpense::create(company_id, request)?;

        let mut tx = self.store.begin_lending().await?;
        tx.insert_prepaid(&prepaid).await?;
        tx.commit().await?;

        info!(
            prepaid_id = %prepaid.id,
            total = %prepaid.total_amount,
            periods = prepaid.period_months,
            "prepaid expense created"
        );
        Ok(prepaid)
    }

    pub async fn prepaid_expenses(&self, company_id: CompanyId) -> Result<Vec<PrepaidExpense>, LendingError> {
        Ok(self.store.prepaid_expenses(company_id).await?)
    }

    /// Recognition plan of one prepaid expense
    ///
    /// # Errors
    ///
    /// `PrepaidNotFound` if the company has no such prepaid expense
    pub async fn prepaid_schedule(
        &self,
        company_id: CompanyId,
        prepaid_id: PrepaidExpenseId,
    ) -> Result<Vec<PrepaidScheduleEntry>, LendingError> {
        self.store
            .prepaid_expenses(company_id)
            .await?
            .into_iter()
            .find(|p| p.id == prepaid_id)
            .ok_or_else(|| LendingError::PrepaidNotFound(prepaid_id.to_string()))?
            .schedule()
    }

    /// Recognizes every prepaid period that has come due by `as_of`
    ///
    /// Runs in a single transaction. Assets with ledger accounts get one
    /// `EXPENSE_AMORTIZATION` entry per run covering all their newly due
    /// periods. Repeating a run for the same date recognizes nothing.
    #[instrument(skip(self))]
    pub async fn process_pending_prepaids(
        &self,
        company_id: CompanyId,
        as_of: NaiveDate,
    ) -> Result<RecognitionRun, LendingError> {
        let mut tx = self.store.begin_lending().await?;
        let prepaids = tx.active_prepaids_for_update(company_id).await?;

        let mut run = RecognitionRun {
            as_of,
            assets_examined: prepaids.len(),
            total_recognized: Decimal::ZERO,
            recognized: Vec::new(),
        };

        for mut prepaid in prepaids {
            let mut recognitions = prepaid.pending_recognitions(as_of)?;
            if recognitions.is_empty() {
                debug!(prepaid_id = %prepaid.id, "nothing due");
                continue;
            }

            let amount: Decimal = recognitions.iter().map(|r| r.amount).sum();
            let journal_entry_id =
                post_recognition(tx.as_mut(), company_id, &prepaid, &recognitions, amount, as_of, &self.policy).await?;

            for recognition in &mut recognitions {
                recognition.journal_entry_id = journal_entry_id;
                tx.insert_prepaid_recognition(recognition).await?;
            }
            prepaid.apply_recognitions(&recognitions, as_of);
            tx.update_prepaid(&prepaid).await?;

            run.total_recognized += amount;
            run.recognized.push(RecognizedPrepaid {
                prepaid_id: prepaid.id,
                name: prepaid.name.clone(),
                recognitions,
                amount,
                remaining_amount: prepaid.remaining_amount,
                journal_entry_id,
            });
        }

        tx.commit().await?;

        info!(
            %company_id,
            %as_of,
            assets = run.recognized.len(),
            periods = run.periods_recognized(),
            total = %run.total_recognized,
            "prepaid expenses recognized"
        );

        Ok(run)
    }
}

async fn post_recognition(
    tx: &mut dyn LendingTx,
    company_id: CompanyId,
    prepaid: &PrepaidExpense,
    recognitions: &[PrepaidRecognition],
    amount: Decimal,
    as_of: NaiveDate,
    policy: &PostingPolicy,
) -> Result<Option<JournalEntryId>, LendingError> {
    let (Some(accounts), Some(first)) = (prepaid.gl_accounts, recognitions.first()) else {
        return Ok(None);
    };

    let request = PostingRequest::new(
        SourceType::ExpenseAmortization,
        format!("Prepaid expense recognition - {} ({} period(s))", prepaid.name, recognitions.len()),
        as_of,
    )
    .with_source_id(first.id)
    .debit(accounts.expense, amount)
    .credit(accounts.prepaid_asset, amount);

    let outcome = post_in_tx(tx, company_id, &request, policy).await?;
    Ok(Some(outcome.journal_entry_id()))
}
