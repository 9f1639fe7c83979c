//! Default account roles
//!
//! Each event posts to a handful of well-known accounts (cash, receivables,
//! sales, ...). A company points each role at one of its accounts through its
//! [`DefaultAccounts`] record. Roles left unset fall back to the account with
//! the role's standard code, so a freshly seeded chart works without any
//! further setup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{wire_enum, AccountId, CompanyId};
use crate::error::LedgerError;
use crate::ports::LedgerTx;

wire_enum! {
    /// A default account slot
    pub enum AccountRole {
        Cash => "CASH",
        AccountsReceivable => "ACCOUNTS_RECEIVABLE",
        AccountsPayable => "ACCOUNTS_PAYABLE",
        Sales => "SALES",
        SalesTax => "SALES_TAX",
        Cogs => "COGS",
        Inventory => "INVENTORY",
    }
}

impl AccountRole {
    /// Code of the standard chart account that fills this role
    pub fn standard_code(&self) -> &'static str {
        match self {
            AccountRole::Cash => "1000",
            AccountRole::AccountsReceivable => "1100",
            AccountRole::Inventory => "1200",
            AccountRole::AccountsPayable => "2000",
            AccountRole::SalesTax => "2100",
            AccountRole::Sales => "4000",
            AccountRole::Cogs => "5000",
        }
    }
}

/// A company's configured default accounts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAccounts {
    pub cash: Option<AccountId>,
    pub accounts_receivable: Option<AccountId>,
    pub accounts_payable: Option<AccountId>,
    pub sales: Option<AccountId>,
    pub sales_tax: Option<AccountId>,
    pub cogs: Option<AccountId>,
    pub inventory: Option<AccountId>,
}

impl DefaultAccounts {
    /// The account configured for a role
    pub fn get(&self, role: AccountRole) -> Option<AccountId> {
        match role {
            AccountRole::Cash => self.cash,
            AccountRole::AccountsReceivable => self.accounts_receivable,
            AccountRole::AccountsPayable => self.accounts_payable,
            AccountRole::Sales => self.sales,
            AccountRole::SalesTax => self.sales_tax,
            AccountRole::Cogs => self.cogs,
            AccountRole::Inventory => self.inventory,
        }
    }

    /// Points a role at an account
    pub fn set(&mut self, role: AccountRole, account_id: AccountId) {
        let slot = match role {
            AccountRole::Cash => &mut self.cash,
            AccountRole::AccountsReceivable => &mut self.accounts_receivable,
            AccountRole::AccountsPayable => &mut self.accounts_payable,
            AccountRole::Sales => &mut self.sales,
            AccountRole::SalesTax => &mut self.sales_tax,
            AccountRole::Cogs => &mut self.cogs,
            AccountRole::Inventory => &mut self.inventory,
        };
        *slot = Some(account_id);
    }

    /// Builder form of [`DefaultAccounts::set`]
    pub fn with(mut self, role: AccountRole, account_id: AccountId) -> Self {
        self.set(role, account_id);
        self
    }

    /// Roles with no account configured
    pub fn missing_roles(&self) -> Vec<AccountRole> {
        AccountRole::ALL
            .iter()
            .copied()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }
}

/// Default accounts resolved for one operation
#[derive(Debug, Clone, Default)]
pub struct ResolvedAccounts {
    accounts: HashMap<AccountRole, AccountId>,
}

impl ResolvedAccounts {
    /// Builds a resolution from explicit pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (AccountRole, AccountId)>) -> Self {
        Self {
            accounts: pairs.into_iter().collect(),
        }
    }

    /// The account for a role, if resolved
    pub fn get(&self, role: AccountRole) -> Option<AccountId> {
        self.accounts.get(&role).copied()
    }

    /// The account for a role the event cannot post without
    pub fn require(&self, role: AccountRole) -> Result<AccountId, LedgerError> {
        self.get(role)
            .ok_or(LedgerError::MissingDefaultAccount { role })
    }
}

/// Resolves every role for a company inside a transaction
///
/// Configured pointers win; unset roles are looked up by standard code.
/// Roles that resolve to nothing are simply absent, and the event that
/// needs them reports [`LedgerError::MissingDefaultAccount`].
pub async fn resolve_accounts<T>(tx: &mut T, company_id: CompanyId) -> Result<ResolvedAccounts, LedgerError>
where
    T: LedgerTx + ?Sized,
{
    let configured = tx.default_accounts(company_id).await?;
    let mut accounts = HashMap::new();

    for role in AccountRole::ALL.iter().copied() {
        let account_id = match configured.get(role) {
            Some(id) => Some(id),
            None => tx
                .find_account_by_code(company_id, role.standard_code())
                .await?
                .map(|account| account.id),
        };

        match account_id {
            Some(id) => {
                accounts.insert(role, id);
            }
            None => debug!(%company_id, %role, "default account role unresolved"),
        }
    }

    Ok(ResolvedAccounts { accounts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_roles() {
        let cash = AccountId::new();
        let defaults = DefaultAccounts::default().with(AccountRole::Cash, cash);

        assert_eq!(defaults.get(AccountRole::Cash), Some(cash));
        assert_eq!(defaults.missing_roles().len(), AccountRole::ALL.len() - 1);
    }

    #[test]
    fn test_require_reports_role() {
        let resolved = ResolvedAccounts::default();
        match resolved.require(AccountRole::SalesTax) {
            Err(LedgerError::MissingDefaultAccount { role }) => assert_eq!(role, AccountRole::SalesTax),
            other => panic!("expected missing default account, got {:?}", other),
        }
    }
}
