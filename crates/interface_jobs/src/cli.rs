//! Command line interface

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use core_kernel::CompanyId;

/// Ledger maintenance and month-end jobs
#[derive(Parser, Debug)]
#[command(name = "ledger-jobs", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Applies pending schema migrations
    Migrate,

    #[command(flatten)]
    Job(JobCommand),
}

/// Jobs that run against one company's books
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum JobCommand {
    /// Installs the standard chart of accounts and default account pointers
    SeedChart {
        #[arg(long)]
        company: CompanyId,
    },

    /// Recognizes every prepaid expense period due by the given date
    RecognizePrepaid {
        #[arg(long)]
        company: CompanyId,
        /// Defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Reports one month of interest on every active loan
    AccrueInterest {
        #[arg(long)]
        company: CompanyId,
        /// Defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Lists unpaid loan installments falling due soon
    UpcomingPayments {
        #[arg(long)]
        company: CompanyId,
        /// Defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Window length in days
        #[arg(long)]
        days: Option<u32>,
    },
}

impl JobCommand {
    pub fn company(&self) -> CompanyId {
        match self {
            JobCommand::SeedChart { company }
            | JobCommand::RecognizePrepaid { company, .. }
            | JobCommand::AccrueInterest { company, .. }
            | JobCommand::UpcomingPayments { company, .. } => *company,
        }
    }
}
