//! Bank accounts and the two sides being reconciled
//!
//! A [`SystemTransaction`] is what the books say moved through the account;
//! a [`BankEntry`] is a line from the bank's statement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{round2, wire_enum, AccountId, BankAccountId, BankEntryId, BankTransactionId, CompanyId};
use crate::error::BankingError;

wire_enum! {
    /// Direction of money relative to the bank account
    pub enum TransactionDirection {
        /// Money in
        Credit => "CREDIT",
        /// Money out
        Debit => "DEBIT",
    }
}

impl TransactionDirection {
    /// The amount signed by direction: positive in, negative out
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionDirection::Credit => amount,
            TransactionDirection::Debit => -amount,
        }
    }
}

/// A company's bank account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankAccountId,
    pub company_id: CompanyId,
    pub account_name: String,
    pub account_number: Option<String>,
    pub current_balance: Decimal,
    /// Ledger account mirroring this bank account
    pub gl_account_id: Option<AccountId>,
}

impl BankAccount {
    pub fn new(company_id: CompanyId, account_name: impl Into<String>) -> Self {
        Self {
            id: BankAccountId::new_v7(),
            company_id,
            account_name: account_name.into(),
            account_number: None,
            current_balance: Decimal::ZERO,
            gl_account_id: None,
        }
    }

    pub fn with_account_number(mut self, account_number: impl Into<String>) -> Self {
        self.account_number = Some(account_number.into());
        self
    }

    pub fn with_gl_account(mut self, gl_account_id: AccountId) -> Self {
        self.gl_account_id = Some(gl_account_id);
        self
    }
}

fn validate_amount(amount: Decimal) -> Result<Decimal, BankingError> {
    if amount <= Decimal::ZERO {
        return Err(BankingError::InvalidInput(format!("amount must be positive, got {}", amount)));
    }
    Ok(round2(amount))
}

/// A movement recorded in the books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTransaction {
    pub id: BankTransactionId,
    pub bank_account_id: BankAccountId,
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub amount: Decimal,
    pub direction: TransactionDirection,
    pub is_reconciled: bool,
    pub matched_entry_id: Option<BankEntryId>,
}

/// A movement to record in the books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSystemTransaction {
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: Decimal,
    pub direction: TransactionDirection,
}

impl SystemTransaction {
    /// An unreconciled transaction on the account
    pub fn create(bank_account_id: BankAccountId, request: NewSystemTransaction) -> Result<Self, BankingError> {
        Ok(Self {
            id: BankTransactionId::new_v7(),
            bank_account_id,
            date: request.date,
            description: request.description,
            reference: request.reference,
            amount: validate_amount(request.amount)?,
            direction: request.direction,
            is_reconciled: false,
            matched_entry_id: None,
        })
    }

    pub fn signed_amount(&self) -> Decimal {
        self.direction.signed(self.amount)
    }
}

/// A line of the bank statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEntry {
    pub id: BankEntryId,
    pub bank_account_id: BankAccountId,
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub amount: Decimal,
    pub direction: TransactionDirection,
    pub is_matched: bool,
    pub matched_transaction_id: Option<BankTransactionId>,
}

/// A statement line to import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBankEntry {
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: Decimal,
    pub direction: TransactionDirection,
}

impl BankEntry {
    /// An unmatched statement entry on the account
    pub fn create(bank_account_id: BankAccountId, request: NewBankEntry) -> Result<Self, BankingError> {
        Ok(Self {
            id: BankEntryId::new_v7(),
            bank_account_id,
            date: request.date,
            description: request.description,
            reference: request.reference,
            amount: validate_amount(request.amount)?,
            direction: request.direction,
            is_matched: false,
            matched_transaction_id: None,
        })
    }

    pub fn signed_amount(&self) -> Decimal {
        self.direction.signed(self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_signs_amount() {
        assert_eq!(TransactionDirection::Credit.signed(dec!(10)), dec!(10));
        assert_eq!(TransactionDirection::Debit.signed(dec!(10)), dec!(-10));
        assert_eq!("DEBIT".parse::<TransactionDirection>().unwrap(), TransactionDirection::Debit);
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let request = NewBankEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: "Fee".into(),
            reference: None,
            amount: dec!(0),
            direction: TransactionDirection::Debit,
        };
        assert!(matches!(
            BankEntry::create(BankAccountId::new(), request),
            Err(BankingError::InvalidInput(_))
        ));
    }
}
