//! Job execution

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument};

use core_kernel::CompanyId;
use domain_ledger::{ChartSeeder, LedgerStore, PostingPolicy, SeedReport};
use domain_lending::{AccrualReport, LendingService, LendingStore, RecognitionRun, UpcomingPayment};
use infra_db::{DatabasePool, PostgresLedgerAdapter, PostgresLendingAdapter};

use crate::cli::JobCommand;
use crate::error::JobError;

/// Applies the embedded schema migrations
pub async fn migrate(pool: &DatabasePool) -> Result<(), JobError> {
    info!("applying migrations");
    infra_db::run_migrations(pool).await?;
    info!("schema up to date");
    Ok(())
}

/// What a job produced, printed as JSON by the binary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobOutput {
    Seed(SeedReport),
    Recognition(RecognitionRun),
    Accrual(AccrualReport),
    Upcoming(Vec<UpcomingPayment>),
}

/// Runs company jobs against a pair of stores
pub struct JobRunner {
    seeder: ChartSeeder,
    lending: LendingService,
}

impl JobRunner {
    pub fn new(ledger: Arc<dyn LedgerStore>, lending: Arc<dyn LendingStore>, policy: PostingPolicy) -> Self {
        Self {
            seeder: ChartSeeder::new(ledger),
            lending: LendingService::new(lending, policy),
        }
    }

    /// A runner over PostgreSQL
    pub fn postgres(pool: DatabasePool, policy: PostingPolicy) -> Self {
        Self::new(
            Arc::new(PostgresLedgerAdapter::new(pool.clone())),
            Arc::new(PostgresLendingAdapter::new(pool)),
            policy,
        )
    }

    /// Runs a command; dates not given default to `today`
    pub async fn run(&self, command: JobCommand, today: NaiveDate) -> Result<JobOutput, JobError> {
        match command {
            JobCommand::SeedChart { company } => self.seed_chart(company).await.map(JobOutput::Seed),
            JobCommand::RecognizePrepaid { company, as_of } => self
                .recognize_prepaid(company, as_of.unwrap_or(today))
                .await
                .map(JobOutput::Recognition),
            JobCommand::AccrueInterest { company, as_of } => self
                .accrue_interest(company, as_of.unwrap_or(today))
                .await
                .map(JobOutput::Accrual),
            JobCommand::UpcomingPayments { company, as_of, days } => self
                .upcoming_payments(company, as_of.unwrap_or(today), days)
                .await
                .map(JobOutput::Upcoming),
        }
    }

    #[instrument(skip(self))]
    pub async fn seed_chart(&self, company: CompanyId) -> Result<SeedReport, JobError> {
        let report = self.seeder.seed(company).await?;
        info!(
            created = report.accounts_created,
            existing = report.accounts_existing,
            roles = report.roles_assigned.len(),
            "chart of accounts seeded"
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn recognize_prepaid(&self, company: CompanyId, as_of: NaiveDate) -> Result<RecognitionRun, JobError> {
        let run = self.lending.process_pending_prepaids(company, as_of).await?;
        info!(
            examined = run.assets_examined,
            periods = run.periods_recognized(),
            total = %run.total_recognized,
            "prepaid recognition finished"
        );
        Ok(run)
    }

    #[instrument(skip(self))]
    pub async fn accrue_interest(&self, company: CompanyId, as_of: NaiveDate) -> Result<AccrualReport, JobError> {
        let report = self.lending.interest_accrual(company, as_of).await?;
        info!(loans = report.details.len(), total = %report.total_accrual, "interest accrual calculated");
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn upcoming_payments(
        &self,
        company: CompanyId,
        as_of: NaiveDate,
        days: Option<u32>,
    ) -> Result<Vec<UpcomingPayment>, JobError> {
        Ok(self.lending.upcoming_payments(company, as_of, days).await?)
    }
}
