//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the ledger, lending and banking domains using SQLx.
//!
//! # Architecture
//!
//! Each domain declares its storage as ports; this crate implements them.
//! All three adapters share [`PgTx`], a wrapper around one database
//! transaction, so a loan payment, its journal entry and every balance it
//! moves are written by a single `COMMIT`. Dropping a `PgTx` without
//! committing rolls the transaction back.
//!
//! Concurrency is left to the database: journal and payment counters are
//! incremented with `UPDATE ... RETURNING`, loan and prepaid rows are locked
//! with `FOR UPDATE`, and a source document is claimed by inserting into
//! `gl_postings`, whose primary key admits one claim.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/ledger")).await?;
//! run_migrations(&pool).await?;
//! let engine = PostingEngine::new(Arc::new(PostgresLedgerAdapter::new(pool)), policy);
//! ```

pub mod pool;
pub mod error;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, run_migrations};
pub use error::DatabaseError;
pub use adapters::{PgTx, PostgresLedgerAdapter, PostgresLendingAdapter, PostgresBankingAdapter};
