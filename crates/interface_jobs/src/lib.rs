//! Ledger Jobs
//!
//! Scheduled and operator-triggered work against the ledger: applying the
//! schema, seeding a company's chart of accounts, month-end prepaid
//! recognition and interest accrual, and upcoming loan payments.
//!
//! The `ledger-jobs` binary parses a [`cli::Cli`], loads a
//! [`config::JobsConfig`] and hands the command to a [`JobRunner`].

pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;

pub use cli::{Cli, Command, JobCommand};
pub use config::{DatabaseSettings, JobsConfig, LogFormat};
pub use error::JobError;
pub use jobs::{migrate, JobOutput, JobRunner};
