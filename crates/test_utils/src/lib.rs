//! Shared helpers for the ledger test suites
//!
//! In-memory tests use the fixtures, builders and assertions directly.
//! PostgreSQL tests start a container through [`create_isolated_test_database`]
//! and inspect tables with [`TestDatabase::row_count`].

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
