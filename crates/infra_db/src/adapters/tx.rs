//! The shared database unit of work

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use core_kernel::PortError;
use crate::error::{decode_error, port_error};

/// One PostgreSQL transaction
///
/// Implements the ledger, lending and banking unit-of-work ports, so writes
/// from several domains can share a commit. Dropped without
/// `commit`, the transaction rolls back.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    /// Starts a transaction on a pooled connection
    pub async fn begin(pool: &PgPool) -> Result<Self, PortError> {
        let tx = pool.begin().await.map_err(port_error)?;
        Ok(Self { tx })
    }

    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    pub(crate) async fn commit_tx(self) -> Result<(), PortError> {
        self.tx.commit().await.map_err(port_error)
    }
}

/// Period numbers, terms and counters are `INTEGER` columns
pub(crate) fn to_db_int(column: &str, value: u32) -> Result<i32, PortError> {
    i32::try_from(value).map_err(|e| decode_error(column, e))
}

pub(crate) fn from_db_int(column: &str, value: i32) -> Result<u32, PortError> {
    u32::try_from(value).map_err(|e| decode_error(column, e))
}

/// Parses a `TEXT` column holding a wire enum
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, PortError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| decode_error(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::AccountType;

    #[test]
    fn test_int_columns_reject_out_of_range() {
        assert_eq!(to_db_int("term_months", 360).unwrap(), 360);
        assert!(to_db_int("term_months", u32::MAX).is_err());
        assert!(from_db_int("period_number", -1).is_err());
    }

    #[test]
    fn test_parse_column() {
        let parsed: AccountType = parse_column("account_type", "LIABILITY").unwrap();
        assert_eq!(parsed, AccountType::Liability);

        let error = parse_column::<AccountType>("account_type", "LIAB").unwrap_err();
        assert!(error.to_string().contains("account_type"));
    }
}
