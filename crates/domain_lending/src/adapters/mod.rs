//! Adapters for the lending ports
//!
//! PostgreSQL adapters live in `infra_db`.

pub mod memory;
