//! Reconciliation arithmetic and match sets

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{approx_eq, round2, BankAccountId, BankEntryId, BankTransactionId, ReconciliationId};
use crate::account::SystemTransaction;
use crate::error::BankingError;

/// Net movement of a set of system transactions: credits in, debits out
pub fn system_balance<'a>(transactions: impl IntoIterator<Item = &'a SystemTransaction>) -> Decimal {
    round2(transactions.into_iter().map(SystemTransaction::signed_amount).sum())
}

/// Where a bank account stands against its statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub statement_balance: Decimal,
    pub system_balance: Decimal,
    /// `statement_balance - system_balance`
    pub difference: Decimal,
    /// True when the difference is under one cent
    pub is_reconciled: bool,
    pub unreconciled_count: usize,
}

impl ReconciliationSummary {
    pub fn compute(statement_balance: Decimal, system_balance: Decimal, unreconciled_count: usize) -> Self {
        let difference = round2(statement_balance - system_balance);
        Self {
            statement_balance,
            system_balance: round2(system_balance),
            difference,
            is_reconciled: approx_eq(difference, Decimal::ZERO),
            unreconciled_count,
        }
    }
}

/// A proposed pairing of a system transaction with a statement entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchPair {
    pub system_transaction_id: BankTransactionId,
    pub bank_entry_id: BankEntryId,
}

impl MatchPair {
    pub fn new(system_transaction_id: BankTransactionId, bank_entry_id: BankEntryId) -> Self {
        Self {
            system_transaction_id,
            bank_entry_id,
        }
    }
}

/// Pairs in which every transaction and every entry appears at most once
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchSet {
    pairs: Vec<MatchPair>,
}

impl MatchSet {
    /// Checks a submission for repeated transactions or entries
    ///
    /// # Errors
    ///
    /// `DuplicateMatch` naming the first id seen twice.
    pub fn try_from_pairs(pairs: impl IntoIterator<Item = MatchPair>) -> Result<Self, BankingError> {
        let mut transactions = HashSet::new();
        let mut entries = HashSet::new();
        let mut accepted = Vec::new();

        for pair in pairs {
            if !transactions.insert(pair.system_transaction_id) {
                return Err(BankingError::DuplicateMatch {
                    kind: "system transaction",
                    id: pair.system_transaction_id.to_string(),
                });
            }
            if !entries.insert(pair.bank_entry_id) {
                return Err(BankingError::DuplicateMatch {
                    kind: "bank entry",
                    id: pair.bank_entry_id.to_string(),
                });
            }
            accepted.push(pair);
        }

        Ok(Self { pairs: accepted })
    }

    pub fn pairs(&self) -> &[MatchPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn into_pairs(self) -> Vec<MatchPair> {
        self.pairs
    }
}

/// A completed reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub id: ReconciliationId,
    pub bank_account_id: BankAccountId,
    pub statement_date: NaiveDate,
    pub statement_balance: Decimal,
    pub system_balance: Decimal,
    pub difference: Decimal,
    pub is_reconciled: bool,
    pub matches: Vec<MatchPair>,
    pub completed_at: DateTime<Utc>,
}

impl Reconciliation {
    pub fn new(
        bank_account_id: BankAccountId,
        statement_date: NaiveDate,
        summary: &ReconciliationSummary,
        matches: Vec<MatchPair>,
    ) -> Self {
        Self {
            id: ReconciliationId::new_v7(),
            bank_account_id,
            statement_date,
            statement_balance: summary.statement_balance,
            system_balance: summary.system_balance,
            difference: summary.difference,
            is_reconciled: summary.is_reconciled,
            matches,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{NewSystemTransaction, TransactionDirection};
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_with_difference() {
        let summary = ReconciliationSummary::compute(dec!(10000), dec!(9950), 3);

        assert_eq!(summary.difference, dec!(50.00));
        assert!(!summary.is_reconciled);
        assert_eq!(summary.unreconciled_count, 3);
    }

    #[test]
    fn test_sub_cent_difference_is_reconciled() {
        let summary = ReconciliationSummary::compute(dec!(100.004), dec!(100), 0);
        assert!(summary.is_reconciled);
    }

    #[test]
    fn test_system_balance_nets_directions() {
        let account = BankAccountId::new();
        let txn = |amount, direction| {
            SystemTransaction::create(
                account,
                NewSystemTransaction {
                    date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    description: "t".into(),
                    reference: None,
                    amount,
                    direction,
                },
            )
            .unwrap()
        };
        let transactions = vec![
            txn(dec!(5000), TransactionDirection::Credit),
            txn(dec!(1200.50), TransactionDirection::Debit),
        ];

        assert_eq!(system_balance(&transactions), dec!(3799.50));
    }

    #[test]
    fn test_duplicate_transaction_rejected() {
        let txn = BankTransactionId::new();
        let pairs = vec![
            MatchPair::new(txn, BankEntryId::new()),
            MatchPair::new(txn, BankEntryId::new()),
        ];

        match MatchSet::try_from_pairs(pairs) {
            Err(BankingError::DuplicateMatch { kind, .. }) => assert_eq!(kind, "system transaction"),
            other => panic!("expected duplicate match, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let entry = BankEntryId::new();
        let pairs = vec![
            MatchPair::new(BankTransactionId::new(), entry),
            MatchPair::new(BankTransactionId::new(), entry),
        ];

        assert!(matches!(
            MatchSet::try_from_pairs(pairs),
            Err(BankingError::DuplicateMatch { kind: "bank entry", .. })
        ));
    }
}
