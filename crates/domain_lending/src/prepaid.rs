//! Prepaid expenses
//!
//! A prepaid amount is expensed straight-line over the calendar months its
//! coverage touches. Period `k` (1-based) becomes due on `start + (k-1)`
//! months. `periods_recognized` records how many periods have been expensed,
//! so a run only ever recognizes periods past that mark and running twice
//! for the same date recognizes nothing the second time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    add_months, checked_div, elapsed_periods, months_between_inclusive, round2, AccountId, CalendarError,
    CompanyId, JournalEntryId, PrepaidExpenseId, PrepaidRecognitionId,
};
use crate::error::LendingError;

/// Ledger accounts a recognition posts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaidGlAccounts {
    /// Expense debited each period
    pub expense: AccountId,
    /// Prepaid asset credited each period
    pub prepaid_asset: AccountId,
}

/// A prepaid expense to register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrepaidExpense {
    pub name: String,
    pub total_amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub gl_accounts: Option<PrepaidGlAccounts>,
}

impl NewPrepaidExpense {
    pub fn new(name: impl Into<String>, total_amount: Decimal, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            total_amount,
            start_date,
            end_date,
            gl_accounts: None,
        }
    }

    pub fn with_gl_accounts(mut self, gl_accounts: PrepaidGlAccounts) -> Self {
        self.gl_accounts = Some(gl_accounts);
        self
    }
}

/// A prepaid asset being expensed over time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaidExpense {
    pub id: PrepaidExpenseId,
    pub company_id: CompanyId,
    pub name: String,
    pub total_amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period_months: u32,
    pub monthly_amount: Decimal,
    pub recognized_amount: Decimal,
    pub remaining_amount: Decimal,
    pub periods_recognized: u32,
    pub last_recognized_at: Option<NaiveDate>,
    pub is_active: bool,
    pub gl_accounts: Option<PrepaidGlAccounts>,
}

/// One recognized period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaidRecognition {
    pub id: PrepaidRecognitionId,
    pub prepaid_id: PrepaidExpenseId,
    pub period_number: u32,
    pub period_date: NaiveDate,
    pub amount: Decimal,
    pub journal_entry_id: Option<JournalEntryId>,
}

/// One period of a prepaid expense's recognition plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepaidScheduleEntry {
    pub period_number: u32,
    pub period_date: NaiveDate,
    pub amount: Decimal,
    pub cumulative_recognized: Decimal,
    pub remaining_balance: Decimal,
    pub is_recognized: bool,
}

impl PrepaidExpense {
    /// Registers a prepaid expense
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the amount is not positive or the end date precedes
    /// the start date.
    pub fn create(company_id: CompanyId, request: NewPrepaidExpense) -> Result<Self, LendingError> {
        if request.total_amount <= Decimal::ZERO {
            return Err(LendingError::InvalidInput(format!(
                "prepaid amount must be positive, got {}",
                request.total_amount
            )));
        }
        if request.end_date < request.start_date {
            return Err(CalendarError::InvalidRange {
                start: request.start_date,
                end: request.end_date,
            }
            .into());
        }

        let total_amount = round2(request.total_amount);
        let period_months = months_between_inclusive(request.start_date, request.end_date);
        let monthly_amount = round2(checked_div(total_amount, Decimal::from(period_months))?);

        Ok(Self {
            id: PrepaidExpenseId::new_v7(),
            company_id,
            name: request.name,
            total_amount,
            start_date: request.start_date,
            end_date: request.end_date,
            period_months,
            monthly_amount,
            recognized_amount: Decimal::ZERO,
            remaining_amount: total_amount,
            periods_recognized: 0,
            last_recognized_at: None,
            is_active: true,
            gl_accounts: request.gl_accounts,
        })
    }

    /// Periods that have come due by `as_of` and are not yet recognized
    ///
    /// Each period expenses `min(monthly_amount, remaining)`; the final
    /// period takes whatever remains so rounding residue is absorbed.
    pub fn pending_recognitions(&self, as_of: NaiveDate) -> Result<Vec<PrepaidRecognition>, LendingError> {
        if !self.is_active {
            return Ok(Vec::new());
        }

        let elapsed = elapsed_periods(self.start_date, as_of, 1, self.period_months);
        let mut remaining = self.remaining_amount;
        let mut pending = Vec::new();

        for period in (self.periods_recognized + 1)..=elapsed {
            if remaining <= Decimal::ZERO {
                break;
            }
            let amount = if period == self.period_months {
                remaining
            } else {
                self.monthly_amount.min(remaining)
            };
            remaining -= amount;

            pending.push(PrepaidRecognition {
                id: PrepaidRecognitionId::new_v7(),
                prepaid_id: self.id,
                period_number: period,
                period_date: add_months(self.start_date, period - 1)?,
                amount,
                journal_entry_id: None,
            });
        }

        Ok(pending)
    }

    /// Every period from start to end with the amount it expenses
    ///
    /// Uses the same split as [`Self::pending_recognitions`], so the plan
    /// agrees with what runs have already recognized.
    pub fn schedule(&self) -> Result<Vec<PrepaidScheduleEntry>, LendingError> {
        let mut cumulative = Decimal::ZERO;
        let mut entries = Vec::with_capacity(self.period_months as usize);

        for period in 1..=self.period_months {
            let remaining = self.total_amount - cumulative;
            let amount = if period == self.period_months {
                remaining
            } else {
                self.monthly_amount.min(remaining)
            };
            cumulative += amount;

            entries.push(PrepaidScheduleEntry {
                period_number: period,
                period_date: add_months(self.start_date, period - 1)?,
                amount,
                cumulative_recognized: cumulative,
                remaining_balance: self.total_amount - cumulative,
                is_recognized: period <= self.periods_recognized,
            });
        }

        Ok(entries)
    }

    /// Applies recognized periods to the running amounts
    pub fn apply_recognitions(&mut self, recognitions: &[PrepaidRecognition], as_of: NaiveDate) {
        for recognition in recognitions {
            self.recognized_amount += recognition.amount;
            self.remaining_amount -= recognition.amount;
            self.periods_recognized = self.periods_recognized.max(recognition.period_number);
        }
        self.last_recognized_at = Some(as_of);
        self.is_active = self.remaining_amount > Decimal::ZERO;
    }
}
