//! Database errors
//!
//! SQLx failures are classified by SQLSTATE and handed to the domains as
//! [`PortError`] through [`port_error`]. Constraint failures keep the name of
//! the violated constraint so a rejected posting can be traced to the rule it
//! broke (`journal_lines_one_side`, `accounts_company_code_key`, ...).
//!
//! See <https://www.postgresql.org/docs/current/errcodes-appendix.html>

use thiserror::Error;

use core_kernel::PortError;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A unique key already holds the value, such as a second account with
    /// the same code or a second claim on one source document
    #[error("Duplicate key {constraint}: {message}")]
    UniqueViolation { constraint: String, message: String },

    /// A foreign key or CHECK constraint rejected the row
    #[error("Constraint {constraint} violated: {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// Serialization failure, deadlock or lock timeout; the whole
    /// transaction may be run again
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    #[error("Row not found")]
    RowNotFound,

    /// A stored value does not parse back into its domain type
    #[error("Undecodable column {column}: {message}")]
    Decode { column: String, message: String },

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

impl DatabaseError {
    /// Whether running the transaction again could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Aborted(_) | DatabaseError::PoolExhausted | DatabaseError::ConnectionFailed(_)
        )
    }
}

impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::RowNotFound,
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                let constraint = db_err.constraint().unwrap_or("unnamed").to_string();
                match db_err.code().as_deref() {
                    Some(UNIQUE_VIOLATION) => DatabaseError::UniqueViolation { constraint, message },
                    Some(FOREIGN_KEY_VIOLATION | CHECK_VIOLATION | NOT_NULL_VIOLATION) => {
                        DatabaseError::ConstraintViolation { constraint, message }
                    }
                    Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE) => {
                        DatabaseError::Aborted(message)
                    }
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            sqlx::Error::ColumnDecode { index, source } => DatabaseError::Decode {
                column: index.clone(),
                message: source.to_string(),
            },
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::RowNotFound => PortError::not_found("Row", "for query"),
            DatabaseError::UniqueViolation { .. } => PortError::conflict(error.to_string()),
            DatabaseError::ConstraintViolation { .. } | DatabaseError::Decode { .. } => {
                PortError::validation(error.to_string())
            }
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted => {
                PortError::connection(error.to_string())
            }
            DatabaseError::Aborted(_) => PortError::transaction(error.to_string()),
            DatabaseError::MigrationFailed(_) | DatabaseError::QueryFailed(_) => {
                PortError::internal(error.to_string())
            }
        }
    }
}

/// Classifies a SQLx error for the domain layer
pub fn port_error(error: sqlx::Error) -> PortError {
    DatabaseError::from(&error).into()
}

pub(crate) fn decode_error(column: &str, error: impl std::fmt::Display) -> PortError {
    DatabaseError::Decode {
        column: column.to_string(),
        message: error.to_string(),
    }
    .into()
}
