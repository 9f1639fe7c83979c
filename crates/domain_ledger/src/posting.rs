//! The posting engine
//!
//! [`post_in_tx`] is the one path by which journal entries are written and
//! account balances move. [`PostingEngine`] wraps it in a unit of work for
//! callers that post a single entry; other domains call [`post_in_tx`]
//! directly so their own writes commit together with the entry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    approx_eq, round2, AccountId, CompanyId, JournalEntryId, JournalLineId, StockMovementId,
};
use crate::account::Account;
use crate::defaults::resolve_accounts;
use crate::error::LedgerError;
use crate::events::{BusinessEvent, LineContext};
use crate::inventory::{Product, StockMovement};
use crate::journal::{EntryStatus, JournalEntry, JournalLine, SourceRef, SourceType};
use crate::policy::PostingPolicy;
use crate::ports::{LedgerStore, LedgerTx, SourceClaim};

/// A line to be posted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDraft {
    pub account_id: AccountId,
    pub description: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl LineDraft {
    /// A debit line, amount rounded to cents
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            description: None,
            debit: round2(amount),
            credit: Decimal::ZERO,
        }
    }

    /// A credit line, amount rounded to cents
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            description: None,
            debit: Decimal::ZERO,
            credit: round2(amount),
        }
    }

    /// Sets the line description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The same line with debit and credit swapped
    pub fn reversed(&self) -> Self {
        Self {
            account_id: self.account_id,
            description: self.description.clone(),
            debit: self.credit,
            credit: self.debit,
        }
    }
}

/// A request to post one journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRequest {
    pub source_type: SourceType,
    /// Originating record; posting is at most once per source
    pub source_id: Option<Uuid>,
    pub description: String,
    pub entry_date: NaiveDate,
    pub lines: Vec<LineDraft>,
    pub reversal_of: Option<JournalEntryId>,
}

impl PostingRequest {
    pub fn new(source_type: SourceType, description: impl Into<String>, entry_date: NaiveDate) -> Self {
        Self {
            source_type,
            source_id: None,
            description: description.into(),
            entry_date,
            lines: Vec::new(),
            reversal_of: None,
        }
    }

    /// A manual entry with no source record
    pub fn manual(description: impl Into<String>, entry_date: NaiveDate) -> Self {
        Self::new(SourceType::Manual, description, entry_date)
    }

    /// Sets the originating record
    pub fn with_source_id(mut self, source_id: impl Into<Uuid>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Adds a line
    pub fn line(mut self, line: LineDraft) -> Self {
        self.lines.push(line);
        self
    }

    /// Adds several lines
    pub fn lines(mut self, lines: impl IntoIterator<Item = LineDraft>) -> Self {
        self.lines.extend(lines);
        self
    }

    /// Adds a debit line
    pub fn debit(self, account_id: AccountId, amount: Decimal) -> Self {
        self.line(LineDraft::debit(account_id, amount))
    }

    /// Adds a credit line
    pub fn credit(self, account_id: AccountId, amount: Decimal) -> Self {
        self.line(LineDraft::credit(account_id, amount))
    }

    /// The source record, if any
    pub fn source(&self) -> Option<SourceRef> {
        self.source_id.map(|id| SourceRef::new(self.source_type, id))
    }

    /// Checks the lines and returns `(debits, credits)`
    ///
    /// # Errors
    ///
    /// - `EmptyEntry` if there are no lines
    /// - `InvalidLine` if a line has no amount, a negative amount, or both sides
    /// - `UnbalancedEntry` if the totals differ by a cent or more
    pub fn validate(&self) -> Result<(Decimal, Decimal), LedgerError> {
        if self.lines.is_empty() {
            return Err(LedgerError::EmptyEntry);
        }

        let mut debits = Decimal::ZERO;
        let mut credits = Decimal::ZERO;

        for (index, line) in self.lines.iter().enumerate() {
            let debit = round2(line.debit);
            let credit = round2(line.credit);

            if debit.is_sign_negative() || credit.is_sign_negative() {
                return Err(LedgerError::InvalidLine {
                    index,
                    reason: "amounts must not be negative".to_string(),
                });
            }
            match (debit.is_zero(), credit.is_zero()) {
                (true, true) => {
                    return Err(LedgerError::InvalidLine {
                        index,
                        reason: "line has neither a debit nor a credit".to_string(),
                    })
                }
                (false, false) => {
                    return Err(LedgerError::InvalidLine {
                        index,
                        reason: "line has both a debit and a credit".to_string(),
                    })
                }
                _ => {}
            }

            debits += debit;
            credits += credit;
        }

        if !approx_eq(debits, credits) {
            return Err(LedgerError::UnbalancedEntry { debits, credits });
        }

        Ok((debits, credits))
    }
}

/// Result of a posting attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PostingOutcome {
    /// A new entry was written
    Posted(JournalEntry),
    /// The source was already posted; nothing was written
    AlreadyPosted { journal_entry_id: JournalEntryId },
}

impl PostingOutcome {
    /// The newly posted entry, if any
    pub fn entry(&self) -> Option<&JournalEntry> {
        match self {
            PostingOutcome::Posted(entry) => Some(entry),
            PostingOutcome::AlreadyPosted { .. } => None,
        }
    }

    /// Returns true if this attempt wrote an entry
    pub fn is_posted(&self) -> bool {
        matches!(self, PostingOutcome::Posted(_))
    }

    /// Id of the entry that records the source
    pub fn journal_entry_id(&self) -> JournalEntryId {
        match self {
            PostingOutcome::Posted(entry) => entry.id,
            PostingOutcome::AlreadyPosted { journal_entry_id } => *journal_entry_id,
        }
    }
}

/// Posts an entry inside a caller-owned transaction
///
/// Validation happens before anything is written. The source is then
/// claimed; a source that is already posted turns the call into a no-op.
/// Otherwise a journal number is allocated, the entry is inserted, every
/// line's signed delta is applied to its account, and the claim is linked
/// to the new entry. Nothing is committed here.
pub async fn post_in_tx<T>(
    tx: &mut T,
    company_id: CompanyId,
    request: &PostingRequest,
    policy: &PostingPolicy,
) -> Result<PostingOutcome, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    let (total_debit, total_credit) = request.validate()?;

    let source = request.source();
    if let Some(source) = source {
        if let SourceClaim::AlreadyPosted(journal_entry_id) = tx.claim_source(company_id, source).await? {
            warn!(
                %company_id,
                source_type = %source.source_type,
                source_id = %source.source_id,
                %journal_entry_id,
                "source already posted, skipping"
            );
            return Ok(PostingOutcome::AlreadyPosted { journal_entry_id });
        }
    }

    let mut accounts: HashMap<AccountId, Account> = HashMap::new();
    for line in &request.lines {
        if accounts.contains_key(&line.account_id) {
            continue;
        }
        let account = tx
            .find_account(company_id, line.account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(line.account_id.to_string()))?;
        accounts.insert(account.id, account);
    }

    let sequence = tx.next_journal_sequence(company_id).await?;
    let entry_id = JournalEntryId::new_v7();

    let lines: Vec<JournalLine> = request
        .lines
        .iter()
        .map(|line| JournalLine {
            id: JournalLineId::new_v7(),
            journal_entry_id: entry_id,
            account_id: line.account_id,
            description: line.description.clone(),
            debit: round2(line.debit),
            credit: round2(line.credit),
        })
        .collect();

    let entry = JournalEntry {
        id: entry_id,
        company_id,
        journal_number: policy.format_journal_number(sequence),
        entry_date: request.entry_date,
        description: request.description.clone(),
        source_type: request.source_type,
        source_id: request.source_id,
        status: EntryStatus::Posted,
        total_debit,
        total_credit,
        reversal_of: request.reversal_of,
        lines,
        created_at: Utc::now(),
    };

    tx.insert_journal_entry(&entry).await?;

    for line in &entry.lines {
        if let Some(account) = accounts.get(&line.account_id) {
            let delta = account.balance_change(line.debit, line.credit);
            let balance = tx.apply_balance_delta(line.account_id, delta).await?;
            debug!(account = %account.code, %delta, %balance, "balance updated");
        }
    }

    if let Some(source) = source {
        tx.link_source(company_id, source, entry.id).await?;
    }

    info!(
        %company_id,
        journal_number = %entry.journal_number,
        source_type = %entry.source_type,
        total = %entry.total_debit,
        "journal entry posted"
    );

    Ok(PostingOutcome::Posted(entry))
}

/// Posts entries and business events, one unit of work per call
#[derive(Clone)]
pub struct PostingEngine {
    store: Arc<dyn LedgerStore>,
    policy: PostingPolicy,
}

impl PostingEngine {
    /// Creates an engine over a store
    pub fn new(store: Arc<dyn LedgerStore>, policy: PostingPolicy) -> Self {
        Self { store, policy }
    }

    /// The engine's posting policy
    pub fn policy(&self) -> &PostingPolicy {
        &self.policy
    }

    /// Posts a prepared entry
    #[instrument(skip(self, request), fields(source_type = %request.source_type))]
    pub async fn post_entry(
        &self,
        company_id: CompanyId,
        request: &PostingRequest,
    ) -> Result<PostingOutcome, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = post_in_tx(tx.as_mut(), company_id, request, &self.policy).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Posts a business event
    ///
    /// An event whose source is already posted is a no-op, checked before
    /// default accounts are resolved. Stock effects of returns are applied
    /// in the same transaction as the entry.
    ///
    /// # Errors
    ///
    /// - `MissingDefaultAccount` if a role the event needs is not configured
    /// - `ProductNotFound` if an item references an unknown product
    /// - `InvalidDocument` for documents with no items or bad amounts
    #[instrument(skip(self, event), fields(source = ?event.source()))]
    pub async fn post_event(
        &self,
        company_id: CompanyId,
        event: &BusinessEvent,
    ) -> Result<PostingOutcome, LedgerError> {
        let postable = event.as_postable();
        let source = event.source();

        let mut tx = self.store.begin().await?;

        if let Some(journal_entry_id) = tx.posting_status(company_id, source).await? {
            warn!(%company_id, %journal_entry_id, "source already posted, skipping");
            return Ok(PostingOutcome::AlreadyPosted { journal_entry_id });
        }

        let accounts = resolve_accounts(tx.as_mut(), company_id).await?;

        let mut products: HashMap<_, Product> = HashMap::new();
        for product_id in postable.product_ids() {
            let product = tx
                .find_product(company_id, product_id)
                .await?
                .ok_or_else(|| LedgerError::ProductNotFound(product_id.to_string()))?;
            products.insert(product_id, product);
        }

        let lines = postable.build_lines(&LineContext {
            accounts: &accounts,
            policy: &self.policy,
            products: &products,
        })?;
        let request = PostingRequest::new(postable.source_type(), postable.description(), postable.entry_date())
            .with_source_id(postable.source_id())
            .lines(lines);

        let outcome = post_in_tx(tx.as_mut(), company_id, &request, &self.policy).await?;

        if outcome.is_posted() {
            for effect in postable.stock_effects(&products) {
                let balance_after = tx.adjust_stock(effect.product_id, effect.quantity).await?;
                let movement = StockMovement {
                    id: StockMovementId::new_v7(),
                    company_id,
                    product_id: effect.product_id,
                    movement_type: effect.movement_type,
                    quantity: effect.quantity,
                    balance_before: balance_after - effect.quantity,
                    balance_after,
                    reference_type: source.source_type,
                    reference_id: source.source_id,
                    created_at: Utc::now(),
                };
                tx.insert_stock_movement(&movement).await?;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Reverses a posted entry
    ///
    /// Posts a `REVERSAL` entry with every line's debit and credit swapped
    /// and marks the original `REVERSED`. The reversal is keyed on the
    /// original entry, so reversing twice is a no-op.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry does not exist for the company
    /// - `InvalidState` if the entry is not posted
    #[instrument(skip(self))]
    pub async fn reverse_entry(
        &self,
        company_id: CompanyId,
        entry_id: JournalEntryId,
        reversal_date: NaiveDate,
    ) -> Result<PostingOutcome, LedgerError> {
        let mut tx = self.store.begin().await?;

        let source = SourceRef::new(SourceType::Reversal, entry_id);
        if let Some(journal_entry_id) = tx.posting_status(company_id, source).await? {
            return Ok(PostingOutcome::AlreadyPosted { journal_entry_id });
        }

        let original = tx
            .find_journal_entry(company_id, entry_id)
            .await?
            .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string()))?;

        if original.status != EntryStatus::Posted {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is {} and cannot be reversed",
                original.journal_number, original.status
            )));
        }

        let mut request = PostingRequest::new(
            SourceType::Reversal,
            format!("Reversal of {}: {}", original.journal_number, original.description),
            reversal_date,
        )
        .with_source_id(entry_id)
        .lines(original.lines.iter().map(|line| {
            LineDraft {
                account_id: line.account_id,
                description: line.description.clone(),
                debit: line.debit,
                credit: line.credit,
            }
            .reversed()
        }));
        request.reversal_of = Some(entry_id);

        let outcome = post_in_tx(tx.as_mut(), company_id, &request, &self.policy).await?;
        if outcome.is_posted() {
            tx.update_entry_status(entry_id, EntryStatus::Reversed).await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    #[test]
    fn test_validate_balanced() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let request = PostingRequest::manual("Accrual", date()).debit(a, dec!(100)).credit(b, dec!(100));
        assert_eq!(request.validate().unwrap(), (dec!(100), dec!(100)));
    }

    #[test]
    fn test_validate_rejects_unbalanced_with_totals() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let request = PostingRequest::manual("Bad", date()).debit(a, dec!(100)).credit(b, dec!(99.98));

        match request.validate() {
            Err(LedgerError::UnbalancedEntry { debits, credits }) => {
                assert_eq!(debits, dec!(100));
                assert_eq!(credits, dec!(99.98));
            }
            other => panic!("expected unbalanced entry, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_and_double_sided_lines() {
        let a = AccountId::new();
        let zero = PostingRequest::manual("Zero", date()).debit(a, Decimal::ZERO);
        assert!(matches!(zero.validate(), Err(LedgerError::InvalidLine { index: 0, .. })));

        let both = PostingRequest::manual("Both", date()).line(LineDraft {
            account_id: a,
            description: None,
            debit: dec!(1),
            credit: dec!(1),
        });
        assert!(matches!(both.validate(), Err(LedgerError::InvalidLine { .. })));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(PostingRequest::manual("Empty", date()).validate(), Err(LedgerError::EmptyEntry)));
    }

    #[test]
    fn test_line_reversal_swaps_sides() {
        let line = LineDraft::debit(AccountId::new(), dec!(12.5));
        let reversed = line.reversed();
        assert_eq!(reversed.debit, Decimal::ZERO);
        assert_eq!(reversed.credit, dec!(12.50));
    }
}
