//! Standard chart of accounts and the seeder that installs it

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::CompanyId;
use crate::account::{Account, AccountCategory, AccountType};
use crate::defaults::AccountRole;
use crate::error::LedgerError;
use crate::ports::LedgerStore;

/// One row of the standard chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardAccount {
    pub code: &'static str,
    pub name: &'static str,
    pub account_type: AccountType,
    pub category: AccountCategory,
}

const fn standard(
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    category: AccountCategory,
) -> StandardAccount {
    StandardAccount { code, name, account_type, category }
}

/// The accounts every company starts with
pub const STANDARD_CHART: &[StandardAccount] = &[
    // Assets
    standard("1000", "Cash", AccountType::Asset, AccountCategory::CurrentAsset),
    standard("1010", "Cash Register", AccountType::Asset, AccountCategory::CurrentAsset),
    standard("1020", "Bank", AccountType::Asset, AccountCategory::CurrentAsset),
    standard("1100", "Accounts Receivable", AccountType::Asset, AccountCategory::CurrentAsset),
    standard("1200", "Inventory", AccountType::Asset, AccountCategory::CurrentAsset),
    standard("1300", "Prepaid Expenses", AccountType::Asset, AccountCategory::CurrentAsset),
    standard("1500", "Fixed Assets", AccountType::Asset, AccountCategory::FixedAsset),
    // Liabilities
    standard("2000", "Accounts Payable", AccountType::Liability, AccountCategory::CurrentLiability),
    standard("2100", "Sales Tax Payable", AccountType::Liability, AccountCategory::CurrentLiability),
    standard("2500", "Long-term Debt", AccountType::Liability, AccountCategory::LongTermLiability),
    // Equity
    standard("3000", "Owner's Capital", AccountType::Equity, AccountCategory::Capital),
    standard("3100", "Retained Earnings", AccountType::Equity, AccountCategory::RetainedEarnings),
    // Revenue
    standard("4000", "Sales Revenue", AccountType::Revenue, AccountCategory::OperatingRevenue),
    standard("4100", "Service Revenue", AccountType::Revenue, AccountCategory::OperatingRevenue),
    standard("4500", "Other Income", AccountType::Revenue, AccountCategory::OtherIncome),
    // Expenses
    standard("5000", "Cost of Goods Sold", AccountType::Expense, AccountCategory::CostOfGoodsSold),
    standard("5100", "Salaries & Wages", AccountType::Expense, AccountCategory::OperatingExpense),
    standard("5200", "Rent Expense", AccountType::Expense, AccountCategory::OperatingExpense),
    standard("5300", "Utilities", AccountType::Expense, AccountCategory::OperatingExpense),
    standard("5400", "Marketing & Advertising", AccountType::Expense, AccountCategory::OperatingExpense),
    standard("5500", "Office Supplies", AccountType::Expense, AccountCategory::OperatingExpense),
    standard("5900", "Other Expenses", AccountType::Expense, AccountCategory::OtherExpense),
    standard("6800", "Interest Expense", AccountType::Expense, AccountCategory::OtherExpense),
];

impl StandardAccount {
    /// A fresh account for the company
    pub fn to_account(&self, company_id: CompanyId) -> Account {
        Account::new(company_id, self.code, self.name, self.account_type).with_category(self.category)
    }
}

/// What a seeding run changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    /// Accounts inserted by this run
    pub accounts_created: usize,
    /// Standard accounts the company already had
    pub accounts_existing: usize,
    /// Default roles filled in by this run
    pub roles_assigned: Vec<AccountRole>,
}

/// Installs the standard chart and default account pointers
pub struct ChartSeeder {
    store: Arc<dyn LedgerStore>,
}

impl ChartSeeder {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Seeds a company's chart of accounts
    ///
    /// Accounts are keyed by code and never overwritten. Only default roles
    /// that are still unset are pointed at the matching standard account, so
    /// a customised role survives re-seeding.
    #[instrument(skip(self))]
    pub async fn seed(&self, company_id: CompanyId) -> Result<SeedReport, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut report = SeedReport::default();

        for standard in STANDARD_CHART {
            if tx.insert_account_if_absent(&standard.to_account(company_id)).await? {
                report.accounts_created += 1;
            } else {
                report.accounts_existing += 1;
            }
        }

        let mut defaults = tx.default_accounts(company_id).await?;
        for role in defaults.missing_roles() {
            let account = tx
                .find_account_by_code(company_id, role.standard_code())
                .await?
                .ok_or_else(|| {
                    LedgerError::Configuration(format!(
                        "standard account {} for {} is missing after seeding",
                        role.standard_code(),
                        role
                    ))
                })?;
            defaults.set(role, account.id);
            report.roles_assigned.push(role);
        }

        if !report.roles_assigned.is_empty() {
            tx.save_default_accounts(company_id, &defaults).await?;
        }

        tx.commit().await?;

        info!(
            %company_id,
            created = report.accounts_created,
            existing = report.accounts_existing,
            roles = report.roles_assigned.len(),
            "chart of accounts seeded"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_standard_codes_are_unique() {
        let codes: HashSet<_> = STANDARD_CHART.iter().map(|a| a.code).collect();
        assert_eq!(codes.len(), STANDARD_CHART.len());
    }

    #[test]
    fn test_every_role_has_a_standard_account() {
        for role in AccountRole::ALL {
            assert!(
                STANDARD_CHART.iter().any(|a| a.code == role.standard_code()),
                "no standard account for {}",
                role
            );
        }
    }

    #[test]
    fn test_normal_balances_follow_types() {
        let company = CompanyId::new();
        let payable = STANDARD_CHART.iter().find(|a| a.code == "2000").unwrap().to_account(company);
        assert_eq!(payable.normal_balance, crate::account::NormalBalance::Credit);
    }
}
