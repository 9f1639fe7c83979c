//! PostgreSQL adapters for the domain ports

pub mod tx;
pub mod ledger;
pub mod lending;
pub mod banking;

pub use tx::PgTx;
pub use ledger::PostgresLedgerAdapter;
pub use lending::PostgresLendingAdapter;
pub use banking::PostgresBankingAdapter;
