//! Job runner tests over the in-memory stores

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::CompanyId;
use domain_ledger::{PostingPolicy, STANDARD_CHART};
use domain_lending::{InMemoryLendingStore, LendingService};
use interface_jobs::{JobCommand, JobOutput, JobRunner};
use test_utils::{DateFixtures, TestLoanBuilder, TestPrepaidBuilder};

fn runner(store: &InMemoryLendingStore) -> JobRunner {
    JobRunner::new(Arc::new(store.clone()), Arc::new(store.clone()), PostingPolicy::default())
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

// ============================================================================
// Chart seeding
// ============================================================================

mod seed_tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_chart_twice_creates_once() {
        let store = InMemoryLendingStore::new();
        let runner = runner(&store);
        let company = CompanyId::new();

        let first = runner.seed_chart(company).await.unwrap();
        let second = runner.seed_chart(company).await.unwrap();

        assert_eq!(first.accounts_created, STANDARD_CHART.len());
        assert_eq!(first.roles_assigned.len(), 7);
        assert_eq!(second.accounts_created, 0);
        assert_eq!(second.accounts_existing, STANDARD_CHART.len());
        assert!(second.roles_assigned.is_empty());
    }
}

// ============================================================================
// Month-end jobs
// ============================================================================

mod month_end_tests {
    use super::*;
    use domain_ledger::HasLedgerState;

    #[tokio::test]
    async fn test_recognize_prepaid_defaults_to_today() {
        let store = InMemoryLendingStore::new();
        let runner = runner(&store);
        let company = CompanyId::new();
        LendingService::new(Arc::new(store.clone()), PostingPolicy::default())
            .create_prepaid_expense(company, TestPrepaidBuilder::new().build())
            .await
            .unwrap();

        let output = runner
            .run(JobCommand::RecognizePrepaid { company, as_of: None }, DateFixtures::statement_date())
            .await
            .unwrap();

        let JobOutput::Recognition(run) = output else {
            panic!("unexpected output: {:?}", output);
        };
        assert_eq!(run.as_of, DateFixtures::statement_date());
        assert_eq!(run.total_recognized, dec!(3000.00));

        let repeat = runner.recognize_prepaid(company, DateFixtures::statement_date()).await.unwrap();
        assert_eq!(repeat.periods_recognized(), 0);
    }

    #[tokio::test]
    async fn test_accrue_interest_is_read_only() {
        let store = InMemoryLendingStore::new();
        let runner = runner(&store);
        let company = CompanyId::new();
        LendingService::new(Arc::new(store.clone()), PostingPolicy::default())
            .create_loan(company, TestLoanBuilder::new().build())
            .await
            .unwrap();

        let report = runner.accrue_interest(company, date(2024, 1, 31)).await.unwrap();
        let again = runner.accrue_interest(company, date(2024, 1, 31)).await.unwrap();

        assert_eq!(report.total_accrual, dec!(1200.00));
        assert_eq!(report.details.len(), 1);
        assert_eq!(report, again);
        assert!(store.snapshot().await.ledger().journal_entries(company).is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_payments_window() {
        let store = InMemoryLendingStore::new();
        let runner = runner(&store);
        let company = CompanyId::new();
        LendingService::new(Arc::new(store.clone()), PostingPolicy::default())
            .create_loan(company, TestLoanBuilder::new().build())
            .await
            .unwrap();

        let default_window = runner.upcoming_payments(company, date(2024, 1, 15), None).await.unwrap();
        let quarter = runner.upcoming_payments(company, date(2024, 1, 15), Some(90)).await.unwrap();

        assert_eq!(default_window.len(), 1);
        assert_eq!(default_window[0].due_date, date(2024, 2, 1));
        assert_eq!(quarter.len(), 3);
    }

    #[tokio::test]
    async fn test_output_serializes_as_report() {
        let store = InMemoryLendingStore::new();
        let runner = runner(&store);
        let company = CompanyId::new();

        let output = runner
            .run(JobCommand::AccrueInterest { company, as_of: Some(date(2024, 1, 31)) }, date(2024, 6, 30))
            .await
            .unwrap();

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["as_of_date"], "2024-01-31");
        assert!(json["details"].as_array().unwrap().is_empty());
    }
}
