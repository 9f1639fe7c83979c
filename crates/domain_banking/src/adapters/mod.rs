//! Adapters for the banking ports

pub mod memory;
