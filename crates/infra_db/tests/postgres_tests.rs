//! PostgreSQL adapter tests
//!
//! Each test starts its own container, so they are ignored by default.
//! Run with `cargo test -p infra_db -- --ignored` where Docker is available.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AccountId, CompanyId};
use domain_banking::{BankAccount, CompleteReconciliation, MatchPair, ReconciliationService};
use domain_ledger::{
    BusinessEvent, ChartSeeder, LedgerStore, PostingEngine, PostingOutcome, PostingPolicy, PostingRequest,
    SourceType,
};
use domain_lending::{LendingService, LoanGlAccounts, PrepaidGlAccounts};
use infra_db::{PostgresBankingAdapter, PostgresLedgerAdapter, PostgresLendingAdapter};
use test_utils::{
    assert_entry_balanced, assert_schedule_repays, assert_trial_balance, create_isolated_test_database,
    ChartCodes, DateFixtures, TestDatabase, TestDocumentBuilder, TestLoanBuilder, TestPrepaidBuilder,
    TestStatementBuilder,
};

async fn seeded_ledger(db: &TestDatabase) -> (PostgresLedgerAdapter, PostingEngine, CompanyId) {
    let store = PostgresLedgerAdapter::new(db.pool().clone());
    let company = CompanyId::new();
    ChartSeeder::new(Arc::new(store.clone())).seed(company).await.unwrap();
    let engine = PostingEngine::new(Arc::new(store.clone()), PostingPolicy::default());
    (store, engine, company)
}

async fn balance(store: &dyn LedgerStore, company: CompanyId, code: &str) -> Decimal {
    store
        .list_accounts(company)
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.code == code)
        .map(|a| a.current_balance)
        .unwrap()
}

async fn account_id(store: &dyn LedgerStore, company: CompanyId, code: &str) -> AccountId {
    store
        .list_accounts(company)
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.code == code)
        .map(|a| a.id)
        .unwrap()
}

// ============================================================================
// Ledger
// ============================================================================

mod ledger_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_seeded_chart_round_trips() {
        let db = create_isolated_test_database().await.unwrap();
        let (store, _, company) = seeded_ledger(&db).await;

        let accounts = store.list_accounts(company).await.unwrap();

        assert_eq!(accounts.len(), domain_ledger::STANDARD_CHART.len());
        assert_eq!(accounts[0].code, ChartCodes::CASH);
        assert!(accounts.iter().all(|a| a.current_balance.is_zero()));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_invoice_posts_once() {
        let db = create_isolated_test_database().await.unwrap();
        let (store, engine, company) = seeded_ledger(&db).await;
        let event = BusinessEvent::Invoice(
            TestDocumentBuilder::new()
                .item(dec!(1), dec!(1000))
                .with_tax_percent(dec!(10))
                .invoice(),
        );

        let first = engine.post_event(company, &event).await.unwrap();
        let second = engine.post_event(company, &event).await.unwrap();

        let entry = first.entry().unwrap();
        assert_eq!(entry.journal_number, "JE-000001");
        assert_entry_balanced(entry);
        assert!(matches!(second, PostingOutcome::AlreadyPosted { journal_entry_id } if journal_entry_id == entry.id));

        assert_eq!(balance(&store, company, ChartCodes::ACCOUNTS_RECEIVABLE).await, dec!(1100));
        assert_eq!(balance(&store, company, ChartCodes::SALES).await, dec!(1000));
        assert_eq!(balance(&store, company, ChartCodes::SALES_TAX).await, dec!(100));

        let entries = store.list_journal_entries(company).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lines.len(), 3);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_concurrent_postings_get_distinct_numbers() {
        let db = create_isolated_test_database().await.unwrap();
        let (store, engine, company) = seeded_ledger(&db).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                let event = BusinessEvent::PosSale(TestDocumentBuilder::new().item(dec!(1), dec!(25)).pos_sale());
                engine.post_event(company, &event).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut numbers: Vec<String> = store
            .list_journal_entries(company)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.journal_number)
            .collect();
        numbers.sort();
        let expected: Vec<String> = (1..=8).map(|n| format!("JE-{:06}", n)).collect();
        assert_eq!(numbers, expected);

        assert_eq!(balance(&store, company, ChartCodes::CASH).await, dec!(200));
        assert_trial_balance(&store.list_accounts(company).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_reversal_restores_balances() {
        let db = create_isolated_test_database().await.unwrap();
        let (store, engine, company) = seeded_ledger(&db).await;
        let event = BusinessEvent::Invoice(TestDocumentBuilder::new().item(dec!(2), dec!(150)).invoice());
        let posted = engine.post_event(company, &event).await.unwrap();

        let reversal = engine
            .reverse_entry(company, posted.journal_entry_id(), DateFixtures::statement_date())
            .await
            .unwrap();

        assert_eq!(reversal.entry().unwrap().source_type, SourceType::Reversal);
        assert!(balance(&store, company, ChartCodes::ACCOUNTS_RECEIVABLE).await.is_zero());
        assert!(balance(&store, company, ChartCodes::SALES).await.is_zero());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_failed_posting_leaves_no_trace() {
        let db = create_isolated_test_database().await.unwrap();
        let (store, engine, company) = seeded_ledger(&db).await;
        let receivable = account_id(&store, company, ChartCodes::ACCOUNTS_RECEIVABLE).await;

        let request = PostingRequest::new(SourceType::Invoice, "Invoice to a missing account", DateFixtures::posting_date())
            .with_source_id(uuid::Uuid::new_v4())
            .debit(receivable, dec!(500))
            .credit(AccountId::new(), dec!(500));

        let result = engine.post_entry(company, &request).await;

        assert!(result.is_err());
        for table in ["journal_entries", "journal_lines", "journal_counters", "gl_postings"] {
            assert_eq!(db.row_count(table).await.unwrap(), 0, "{} not rolled back", table);
        }
        assert!(balance(&store, company, ChartCodes::ACCOUNTS_RECEIVABLE).await.is_zero());
    }
}

// ============================================================================
// Lending
// ============================================================================

mod lending_tests {
    use super::*;
    use domain_lending::LendingStore;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_loan_payment_commits_with_entry() {
        let db = create_isolated_test_database().await.unwrap();
        let store = PostgresLendingAdapter::new(db.pool().clone());
        let company = CompanyId::new();
        ChartSeeder::new(Arc::new(store.clone())).seed(company).await.unwrap();
        let service = LendingService::new(Arc::new(store.clone()), PostingPolicy::default());

        let gl = LoanGlAccounts {
            liability: account_id(&store, company, ChartCodes::LONG_TERM_DEBT).await,
            interest_expense: account_id(&store, company, ChartCodes::INTEREST_EXPENSE).await,
        };
        let loan = service
            .create_loan(company, TestLoanBuilder::new().with_gl_accounts(gl).build())
            .await
            .unwrap();
        assert_schedule_repays(&service.loan_schedule(loan.id).await.unwrap(), dec!(120000));

        let receipt = service
            .record_payment(company, loan.id, dec!(10661.85), DateFixtures::posting_date())
            .await
            .unwrap();

        assert_eq!(receipt.payment.payment_number, 1);
        assert_eq!(receipt.allocation.interest_part, dec!(1200.00));
        assert_eq!(receipt.allocation.principal_part, dec!(9461.85));
        assert_eq!(receipt.schedule_period, Some(1));
        assert_eq!(balance(&store, company, ChartCodes::LONG_TERM_DEBT).await, dec!(-9461.85));
        assert_eq!(balance(&store, company, ChartCodes::INTEREST_EXPENSE).await, dec!(1200.00));
        assert_eq!(balance(&store, company, ChartCodes::CASH).await, dec!(-10661.85));

        let payments = service.loan_payments(loan.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert!(payments[0].journal_entry_id.is_some());

        let schedule = service.loan_schedule(loan.id).await.unwrap();
        assert!(schedule[0].is_paid);
        assert!(!schedule[1].is_paid);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_prepaid_run_is_not_repeated() {
        let db = create_isolated_test_database().await.unwrap();
        let store = PostgresLendingAdapter::new(db.pool().clone());
        let company = CompanyId::new();
        ChartSeeder::new(Arc::new(store.clone())).seed(company).await.unwrap();
        let service = LendingService::new(Arc::new(store.clone()), PostingPolicy::default());

        let gl = PrepaidGlAccounts {
            expense: account_id(&store, company, ChartCodes::OTHER_EXPENSES).await,
            prepaid_asset: account_id(&store, company, ChartCodes::PREPAID).await,
        };
        let prepaid = service
            .create_prepaid_expense(company, TestPrepaidBuilder::new().with_gl_accounts(gl).build())
            .await
            .unwrap();
        let as_of = DateFixtures::statement_date();

        let first = service.process_pending_prepaids(company, as_of).await.unwrap();
        let second = service.process_pending_prepaids(company, as_of).await.unwrap();

        assert_eq!(first.total_recognized, dec!(3000.00));
        assert!(second.total_recognized.is_zero());
        assert_eq!(store.prepaid_recognitions(prepaid.id).await.unwrap().len(), 3);
        assert_eq!(balance(&store, company, ChartCodes::OTHER_EXPENSES).await, dec!(3000.00));
    }

}

// ============================================================================
// Banking
// ============================================================================

mod banking_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_reconciliation_marks_both_sides() {
        let db = create_isolated_test_database().await.unwrap();
        let service = ReconciliationService::new(Arc::new(PostgresBankingAdapter::new(db.pool().clone())));
        let company = CompanyId::new();
        let account = service
            .open_bank_account(BankAccount::new(company, "Operating account"))
            .await
            .unwrap();

        let statement = TestStatementBuilder::new().deposit(dec!(10000)).withdrawal(dec!(50));
        let mut transactions = Vec::new();
        for request in statement.system_transactions() {
            transactions.push(service.record_transaction(company, account.id, request).await.unwrap());
        }
        let entries = service
            .import_statement(company, account.id, statement.bank_entries())
            .await
            .unwrap();

        let reconciliation = service
            .complete(
                company,
                CompleteReconciliation {
                    bank_account_id: account.id,
                    statement_date: DateFixtures::statement_date(),
                    statement_balance: dec!(9950),
                    matches: vec![
                        MatchPair::new(transactions[0].id, entries[0].id),
                        MatchPair::new(transactions[1].id, entries[1].id),
                    ],
                },
            )
            .await
            .unwrap();

        assert!(reconciliation.is_reconciled);
        assert!(service.unmatched_entries(account.id).await.unwrap().is_empty());

        let stored = service.reconciliations(account.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].matches.len(), 2);
    }
}
