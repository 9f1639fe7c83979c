//! Adapters for the ledger ports
//!
//! The in-memory adapter backs the domain tests and is reused by the lending
//! and banking domains; PostgreSQL adapters live in `infra_db`.

pub mod memory;
