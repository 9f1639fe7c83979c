//! Journal entries and lines
//!
//! A posted entry is immutable: corrections are made by posting a reversing
//! entry, after which the original is marked [`EntryStatus::Reversed`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{approx_eq, wire_enum, AccountId, CompanyId, JournalEntryId, JournalLineId};

wire_enum! {
    /// What caused an entry to be posted
    pub enum SourceType {
        Invoice => "INVOICE",
        PaymentReceived => "PAYMENT_RECEIVED",
        PaymentMade => "PAYMENT_MADE",
        Expense => "EXPENSE",
        Bill => "BILL",
        PosSale => "POS_SALE",
        SalesReturn => "SALES_RETURN",
        PurchaseReturn => "PURCHASE_RETURN",
        LoanPayment => "LOAN_PAYMENT",
        ExpenseAmortization => "EXPENSE_AMORTIZATION",
        Reversal => "REVERSAL",
        Manual => "MANUAL",
    }
}

wire_enum! {
    /// Lifecycle of a journal entry
    pub enum EntryStatus {
        Draft => "DRAFT",
        Posted => "POSTED",
        Reversed => "REVERSED",
    }
}

/// The source document behind an entry
///
/// A source may be posted at most once; the store keeps a registry of
/// `(company, source)` to journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_type: SourceType,
    pub source_id: Uuid,
}

impl SourceRef {
    pub fn new(source_type: SourceType, source_id: impl Into<Uuid>) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
        }
    }
}

/// A single line of a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub id: JournalLineId,
    pub journal_entry_id: JournalEntryId,
    pub account_id: AccountId,
    pub description: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
}

/// A journal entry with its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub company_id: CompanyId,
    /// Per-company sequential number, e.g. `JE-000042`
    pub journal_number: String,
    pub entry_date: NaiveDate,
    pub description: String,
    pub source_type: SourceType,
    pub source_id: Option<Uuid>,
    pub status: EntryStatus,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    /// Set on reversing entries
    pub reversal_of: Option<JournalEntryId>,
    pub lines: Vec<JournalLine>,
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Returns true if debits equal credits within tolerance
    pub fn is_balanced(&self) -> bool {
        approx_eq(self.total_debit, self.total_credit)
    }

    /// The source document, if the entry has one
    pub fn source(&self) -> Option<SourceRef> {
        self.source_id.map(|id| SourceRef::new(self.source_type, id))
    }

    /// Lines posted to the given account
    pub fn lines_for(&self, account_id: AccountId) -> impl Iterator<Item = &JournalLine> {
        self.lines.iter().filter(move |line| line.account_id == account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_wire_names() {
        assert_eq!(SourceType::PaymentReceived.as_str(), "PAYMENT_RECEIVED");
        assert_eq!("POS_SALE".parse::<SourceType>().unwrap(), SourceType::PosSale);
        assert_eq!(SourceType::PaymentMade.as_str(), "PAYMENT_MADE");
        assert!("POS".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_source_ref_equality_uses_type_and_id() {
        let id = Uuid::new_v4();
        assert_eq!(SourceRef::new(SourceType::Invoice, id), SourceRef::new(SourceType::Invoice, id));
        assert_ne!(SourceRef::new(SourceType::Invoice, id), SourceRef::new(SourceType::Bill, id));
    }
}
