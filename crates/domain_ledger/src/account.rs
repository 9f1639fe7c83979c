//! Account types for the chart of accounts
//!
//! An account's `current_balance` is expressed on its normal side: a debit
//! increases an asset or expense account and decreases a liability, equity
//! or revenue account. The balance only ever moves through
//! [`crate::ports::LedgerTx::apply_balance_delta`] with a delta computed by
//! [`NormalBalance::signed_delta`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{wire_enum, AccountId, CompanyId};

wire_enum! {
    /// Types of accounts in the chart of accounts
    pub enum AccountType {
        /// Asset accounts (debit normal balance)
        Asset => "ASSET",
        /// Liability accounts (credit normal balance)
        Liability => "LIABILITY",
        /// Equity accounts (credit normal balance)
        Equity => "EQUITY",
        /// Revenue accounts (credit normal balance)
        Revenue => "REVENUE",
        /// Expense accounts (debit normal balance)
        Expense => "EXPENSE",
    }
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// The conventional normal balance for this type
    pub fn default_normal_balance(&self) -> NormalBalance {
        if self.is_debit_normal() {
            NormalBalance::Debit
        } else {
            NormalBalance::Credit
        }
    }
}

wire_enum! {
    /// Sub-classification of an account for reporting
    pub enum AccountCategory {
        CurrentAsset => "CURRENT_ASSET",
        FixedAsset => "FIXED_ASSET",
        CurrentLiability => "CURRENT_LIABILITY",
        LongTermLiability => "LONG_TERM_LIABILITY",
        Capital => "CAPITAL",
        RetainedEarnings => "RETAINED_EARNINGS",
        OperatingRevenue => "OPERATING_REVENUE",
        OtherIncome => "OTHER_INCOME",
        CostOfGoodsSold => "COST_OF_GOODS_SOLD",
        OperatingExpense => "OPERATING_EXPENSE",
        OtherExpense => "OTHER_EXPENSE",
    }
}

wire_enum! {
    /// The side on which an account's balance grows
    pub enum NormalBalance {
        Debit => "DEBIT",
        Credit => "CREDIT",
    }
}

impl NormalBalance {
    /// Change to `current_balance` for a line with the given debit and credit
    ///
    /// `(debit - credit)` for debit-normal accounts, `(credit - debit)` for
    /// credit-normal ones.
    pub fn signed_delta(&self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            NormalBalance::Debit => debit - credit,
            NormalBalance::Credit => credit - debit,
        }
    }
}

/// An account in a company's chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Owning company
    pub company_id: CompanyId,
    /// Account code (e.g., "1000"), unique per company
    pub code: String,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Account category
    pub category: Option<AccountCategory>,
    /// Side on which the balance grows
    pub normal_balance: NormalBalance,
    /// Running balance on the normal side
    pub current_balance: Decimal,
    /// Whether account is active
    pub is_active: bool,
}

impl Account {
    /// Creates a new account with a zero balance
    ///
    /// The normal balance follows the account type; use
    /// [`Account::with_normal_balance`] for contra accounts.
    pub fn new(
        company_id: CompanyId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id: AccountId::new_v7(),
            company_id,
            code: code.into(),
            name: name.into(),
            account_type,
            category: None,
            normal_balance: account_type.default_normal_balance(),
            current_balance: Decimal::ZERO,
            is_active: true,
        }
    }

    /// Sets the account category
    pub fn with_category(mut self, category: AccountCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Overrides the normal balance side
    pub fn with_normal_balance(mut self, normal_balance: NormalBalance) -> Self {
        self.normal_balance = normal_balance;
        self
    }

    /// Balance change this account sees for a line
    pub fn balance_change(&self, debit: Decimal, credit: Decimal) -> Decimal {
        self.normal_balance.signed_delta(debit, credit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normal_balance_follows_type() {
        let company = CompanyId::new();
        let cash = Account::new(company, "1000", "Cash", AccountType::Asset);
        let sales = Account::new(company, "4000", "Sales Revenue", AccountType::Revenue);

        assert_eq!(cash.normal_balance, NormalBalance::Debit);
        assert_eq!(sales.normal_balance, NormalBalance::Credit);
    }

    #[test]
    fn test_balance_change_sign() {
        let company = CompanyId::new();
        let cash = Account::new(company, "1000", "Cash", AccountType::Asset);
        let payable = Account::new(company, "2000", "Accounts Payable", AccountType::Liability);

        assert_eq!(cash.balance_change(dec!(100), Decimal::ZERO), dec!(100));
        assert_eq!(cash.balance_change(Decimal::ZERO, dec!(40)), dec!(-40));
        assert_eq!(payable.balance_change(Decimal::ZERO, dec!(100)), dec!(100));
        assert_eq!(payable.balance_change(dec!(100), Decimal::ZERO), dec!(-100));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(AccountCategory::CostOfGoodsSold.as_str(), "COST_OF_GOODS_SOLD");
        assert_eq!("LONG_TERM_LIABILITY".parse::<AccountCategory>().unwrap(), AccountCategory::LongTermLiability);
        assert_eq!(serde_json::to_string(&AccountType::Equity).unwrap(), "\"EQUITY\"");
    }
}
