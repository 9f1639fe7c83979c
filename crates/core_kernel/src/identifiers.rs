//! Strongly-typed identifiers for domain entities
//!
//! Newtype wrappers around UUIDs keep a loan id from being passed where an
//! account id is expected. Display renders `PREFIX-uuid`; parsing accepts
//! either form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Consumes the id, yielding the UUID (used when binding query parameters)
            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Tenant
define_id!(CompanyId, "CO");

// Ledger identifiers
define_id!(AccountId, "ACC");
define_id!(JournalEntryId, "JNL");
define_id!(JournalLineId, "JNLL");

// Source documents posted to the ledger
define_id!(InvoiceId, "INV");
define_id!(PaymentId, "PAY");
define_id!(BillId, "BILL");
define_id!(PosSaleId, "POS");
define_id!(SalesReturnId, "SRET");
define_id!(PurchaseReturnId, "PRET");
define_id!(SupplierPaymentId, "SPAY");
define_id!(ExpenseId, "EXP");

// Inventory identifiers
define_id!(ProductId, "PRD");
define_id!(StockMovementId, "STM");

// Lending identifiers
define_id!(LoanId, "LOAN");
define_id!(LoanScheduleId, "LSCH");
define_id!(LoanPaymentId, "LPAY");
define_id!(PrepaidExpenseId, "PPE");
define_id!(PrepaidRecognitionId, "PPR");

// Banking identifiers
define_id!(BankAccountId, "BNK");
define_id!(BankTransactionId, "BTX");
define_id!(BankEntryId, "BSE");
define_id!(ReconciliationId, "REC");
