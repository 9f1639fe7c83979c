//! Job runner errors

use thiserror::Error;

use domain_ledger::LedgerError;
use domain_lending::LendingError;
use infra_db::DatabaseError;

/// Errors surfaced by a job
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Lending(#[from] LendingError),
}
