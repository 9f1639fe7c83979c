//! In-memory lending store
//!
//! Extends the in-memory ledger with loans and prepaid expenses. Ledger
//! operations come from the shared [`MemoryTx`] implementation, so a loan
//! payment and its journal entry commit or vanish together.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use core_kernel::{CompanyId, DomainPort, LoanId, PortError, PrepaidExpenseId};
use domain_ledger::{Account, HasLedgerState, JournalEntry, LedgerState, LedgerStore, LedgerTx, MemoryTx};
use crate::amortization::ScheduleEntry;
use crate::loan::Loan;
use crate::payment::LoanPayment;
use crate::ports::{LendingStore, LendingTx, UpcomingPayment};
use crate::prepaid::{PrepaidExpense, PrepaidRecognition};

/// The ledger plus lending records
#[derive(Debug, Clone, Default)]
pub struct LendingState {
    ledger: LedgerState,
    loans: HashMap<LoanId, Loan>,
    schedules: HashMap<LoanId, Vec<ScheduleEntry>>,
    payments: Vec<LoanPayment>,
    payment_counters: HashMap<LoanId, u32>,
    prepaids: HashMap<PrepaidExpenseId, PrepaidExpense>,
    recognitions: Vec<PrepaidRecognition>,
}

impl HasLedgerState for LendingState {
    fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut LedgerState {
        &mut self.ledger
    }
}

impl LendingState {
    pub fn loan(&self, id: LoanId) -> Option<&Loan> {
        self.loans.get(&id)
    }

    /// A loan's schedule in period order
    pub fn schedule(&self, loan_id: LoanId) -> &[ScheduleEntry] {
        self.schedules.get(&loan_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A loan's payments in payment order
    pub fn payments(&self, loan_id: LoanId) -> Vec<LoanPayment> {
        self.payments.iter().filter(|p| p.loan_id == loan_id).cloned().collect()
    }

    pub fn prepaid(&self, id: PrepaidExpenseId) -> Option<&PrepaidExpense> {
        self.prepaids.get(&id)
    }

    /// A prepaid expense's recognitions in period order
    pub fn recognitions(&self, prepaid_id: PrepaidExpenseId) -> Vec<PrepaidRecognition> {
        let mut recognitions: Vec<_> = self
            .recognitions
            .iter()
            .filter(|r| r.prepaid_id == prepaid_id)
            .cloned()
            .collect();
        recognitions.sort_by_key(|r| r.period_number);
        recognitions
    }

    fn company_loans(&self, company_id: CompanyId) -> impl Iterator<Item = &Loan> {
        self.loans.values().filter(move |l| l.company_id == company_id)
    }

    fn upcoming(&self, company_id: CompanyId, until: NaiveDate) -> Vec<UpcomingPayment> {
        let mut upcoming: Vec<UpcomingPayment> = self
            .company_loans(company_id)
            .filter(|loan| loan.is_active)
            .flat_map(|loan| {
                self.schedule(loan.id)
                    .iter()
                    .filter(move |e| !e.is_paid && e.due_date <= until)
                    .map(move |e| UpcomingPayment {
                        loan_id: loan.id,
                        loan_name: loan.loan_name.clone(),
                        lender_name: loan.lender_name.clone(),
                        period_number: e.period_number,
                        due_date: e.due_date,
                        principal_due: e.principal_due,
                        interest_due: e.interest_due,
                        total_due: e.total_due,
                    })
            })
            .collect();
        upcoming.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.loan_name.cmp(&b.loan_name)));
        upcoming
    }
}

#[async_trait]
impl LendingTx for MemoryTx<LendingState> {
    async fn insert_loan(&mut self, loan: &Loan, schedule: &[ScheduleEntry]) -> Result<(), PortError> {
        let state = self.state_mut();
        if state.loans.contains_key(&loan.id) {
            return Err(PortError::conflict(format!("loan {} already exists", loan.id)));
        }
        state.loans.insert(loan.id, loan.clone());
        state.schedules.insert(loan.id, schedule.to_vec());
        Ok(())
    }

    async fn find_loan_for_update(&mut self, company_id: CompanyId, id: LoanId) -> Result<Option<Loan>, PortError> {
        Ok(self
            .state()
            .loans
            .get(&id)
            .filter(|l| l.company_id == company_id)
            .cloned())
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<(), PortError> {
        let stored = self
            .state_mut()
            .loans
            .get_mut(&loan.id)
            .ok_or_else(|| PortError::not_found("Loan", loan.id))?;
        *stored = loan.clone();
        Ok(())
    }

    async fn next_payment_number(&mut self, loan_id: LoanId) -> Result<u32, PortError> {
        let counter = self.state_mut().payment_counters.entry(loan_id).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_loan_payment(&mut self, payment: &LoanPayment) -> Result<(), PortError> {
        self.state_mut().payments.push(payment.clone());
        Ok(())
    }

    async fn mark_next_schedule_paid(&mut self, loan_id: LoanId, paid_date: NaiveDate) -> Result<Option<u32>, PortError> {
        let next = self
            .state_mut()
            .schedules
            .get_mut(&loan_id)
            .and_then(|entries| entries.iter_mut().filter(|e| !e.is_paid).min_by_key(|e| e.period_number));

        Ok(next.map(|entry| {
            entry.mark_paid(paid_date);
            entry.period_number
        }))
    }

    async fn insert_prepaid(&mut self, prepaid: &PrepaidExpense) -> Result<(), PortError> {
        let state = self.state_mut();
        if state.prepaids.contains_key(&prepaid.id) {
            return Err(PortError::conflict(format!("prepaid expense {} already exists", prepaid.id)));
        }
        state.prepaids.insert(prepaid.id, prepaid.clone());
        Ok(())
    }

    async fn active_prepaids_for_update(&mut self, company_id: CompanyId) -> Result<Vec<PrepaidExpense>, PortError> {
        let mut prepaids: Vec<_> = self
            .state()
            .prepaids
            .values()
            .filter(|p| p.company_id == company_id && p.is_active)
            .cloned()
            .collect();
        prepaids.sort_by_key(|p| p.id.into_uuid());
        Ok(prepaids)
    }

    async fn update_prepaid(&mut self, prepaid: &PrepaidExpense) -> Result<(), PortError> {
        let stored = self
            .state_mut()
            .prepaids
            .get_mut(&prepaid.id)
            .ok_or_else(|| PortError::not_found("PrepaidExpense", prepaid.id))?;
        *stored = prepaid.clone();
        Ok(())
    }

    async fn insert_prepaid_recognition(&mut self, recognition: &PrepaidRecognition) -> Result<(), PortError> {
        self.state_mut().recognitions.push(recognition.clone());
        Ok(())
    }
}

/// Lending and ledger store held in process memory
#[derive(Clone, Default)]
pub struct InMemoryLendingStore {
    state: Arc<Mutex<LendingState>>,
}

impl InMemoryLendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a setup change outside any transaction
    pub async fn setup(&self, f: impl FnOnce(&mut LendingState)) {
        let mut state = self.state.lock().await;
        f(&mut *state);
    }

    /// A copy of the committed state
    pub async fn snapshot(&self) -> LendingState {
        self.state.lock().await.clone()
    }
}

impl DomainPort for InMemoryLendingStore {}

#[async_trait]
impl LedgerStore for InMemoryLendingStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, PortError> {
        Ok(Box::new(MemoryTx::begin(&self.state).await))
    }

    async fn list_accounts(&self, company_id: CompanyId) -> Result<Vec<Account>, PortError> {
        Ok(self.state.lock().await.ledger.accounts(company_id))
    }

    async fn list_journal_entries(&self, company_id: CompanyId) -> Result<Vec<JournalEntry>, PortError> {
        Ok(self.state.lock().await.ledger.journal_entries(company_id))
    }
}

#[async_trait]
impl LendingStore for InMemoryLendingStore {
    async fn begin_lending(&self) -> Result<Box<dyn LendingTx>, PortError> {
        Ok(Box::new(MemoryTx::begin(&self.state).await))
    }

    async fn active_loans(&self, company_id: CompanyId) -> Result<Vec<Loan>, PortError> {
        let state = self.state.lock().await;
        let mut loans: Vec<Loan> = state.company_loans(company_id).filter(|l| l.is_active).cloned().collect();
        loans.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.loan_name.cmp(&b.loan_name)));
        Ok(loans)
    }

    async fn loan_schedule(&self, loan_id: LoanId) -> Result<Vec<ScheduleEntry>, PortError> {
        Ok(self.state.lock().await.schedule(loan_id).to_vec())
    }

    async fn loan_payments(&self, loan_id: LoanId) -> Result<Vec<LoanPayment>, PortError> {
        Ok(self.state.lock().await.payments(loan_id))
    }

    async fn upcoming_schedule(
        &self,
        company_id: CompanyId,
        until: NaiveDate,
    ) -> Result<Vec<UpcomingPayment>, PortError> {
        Ok(self.state.lock().await.upcoming(company_id, until))
    }

    async fn prepaid_expenses(&self, company_id: CompanyId) -> Result<Vec<PrepaidExpense>, PortError> {
        let state = self.state.lock().await;
        let mut prepaids: Vec<_> = state
            .prepaids
            .values()
            .filter(|p| p.company_id == company_id)
            .cloned()
            .collect();
        prepaids.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));
        Ok(prepaids)
    }

    async fn prepaid_recognitions(&self, prepaid_id: PrepaidExpenseId) -> Result<Vec<PrepaidRecognition>, PortError> {
        Ok(self.state.lock().await.recognitions(prepaid_id))
    }
}
