//! Storage ports
//!
//! Each domain crate declares its storage as traits extending [`DomainPort`].
//! The in-memory adapters shipped with each domain and the PostgreSQL ones in
//! `infra_db` implement them and report failures as [`PortError`].
//!
//! Write sequences go through a transaction object handed out by the port.
//! Its effects are applied on commit and discarded when it is dropped:
//!
//! ```rust,ignore
//! let mut tx = store.begin().await?;
//! tx.apply_balance_delta(account_id, delta).await?;
//! tx.commit().await?;
//! ```

use std::fmt;
use thiserror::Error;

/// Failure reported by a storage adapter
#[derive(Debug, Error)]
pub enum PortError {
    /// No row for the key
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// The write collides with existing data, such as a duplicate account
    /// code or a source claimed by another posting
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Data breaks a stored constraint or a column does not decode
    #[error("Invalid data: {0}")]
    Validation(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    /// Begin or commit failed, or the database aborted the transaction
    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl PortError {
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection(message.into())
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        PortError::Transaction(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal(message.into())
    }

    /// Whether running the whole operation again could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection(_) | PortError::Transaction(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Common bound of every storage port
pub trait DomainPort: Send + Sync + 'static {}
