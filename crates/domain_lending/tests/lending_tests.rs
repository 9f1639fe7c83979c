//! Tests for loans, payments, accrual and prepaid recognition
//!
//! Service tests run against the in-memory lending store, which shares the
//! ledger's commit semantics, so journal entries and loan updates can be
//! checked together.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{CompanyId, Rate};
use domain_ledger::{
    AccountRole, ChartSeeder, HasLedgerState, LedgerError, PostingPolicy, SourceType,
};
use domain_lending::{
    generate_amortization_schedule, InMemoryLendingStore, LendingError, LendingService, LoanGlAccounts,
    NewLoan, NewPrepaidExpense, PaymentFrequency, PrepaidGlAccounts,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seeded() -> (InMemoryLendingStore, LendingService, CompanyId) {
    let store = InMemoryLendingStore::new();
    let company = CompanyId::new();
    ChartSeeder::new(Arc::new(store.clone())).seed(company).await.unwrap();
    let service = LendingService::new(Arc::new(store.clone()), PostingPolicy::default());
    (store, service, company)
}

async fn account_id(store: &InMemoryLendingStore, company: CompanyId, code: &str) -> core_kernel::AccountId {
    store.snapshot().await.ledger().account_by_code(company, code).map(|a| a.id).unwrap()
}

async fn balance(store: &InMemoryLendingStore, company: CompanyId, code: &str) -> Decimal {
    store
        .snapshot()
        .await
        .ledger()
        .account_by_code(company, code)
        .map(|a| a.current_balance)
        .unwrap()
}

async fn loan_accounts(store: &InMemoryLendingStore, company: CompanyId) -> LoanGlAccounts {
    LoanGlAccounts {
        liability: account_id(store, company, "2500").await,
        interest_expense: account_id(store, company, "6800").await,
    }
}

fn business_loan(principal: Decimal) -> NewLoan {
    NewLoan::new("Equipment loan", "First Bank", principal, Rate::new(dec!(0.12)), 12, date(2024, 1, 15))
}

// ============================================================================
// Amortization
// ============================================================================

mod amortization_tests {
    use super::*;

    #[test]
    fn test_twelve_month_loan_schedule() {
        let rows = generate_amortization_schedule(
            dec!(120000),
            Rate::new(dec!(0.12)),
            12,
            date(2024, 1, 1),
            PaymentFrequency::Monthly,
        )
        .unwrap();

        assert_eq!(rows.len(), 12);
        assert!(rows[..11].iter().all(|r| r.total_due == dec!(10661.85)));

        let last = rows.last().unwrap();
        assert_eq!(last.interest_due, dec!(105.56));
        assert_eq!(last.principal_due, dec!(10556.35));
        assert_eq!(last.total_due, dec!(10661.91));
        assert_eq!(last.balance_after, Decimal::ZERO);

        let principal: Decimal = rows.iter().map(|r| r.principal_due).sum();
        assert_eq!(principal, dec!(120000));
    }

    #[test]
    fn test_annual_schedule_covers_partial_year() {
        let rows = generate_amortization_schedule(
            dec!(10000),
            Rate::new(dec!(0.06)),
            18,
            date(2024, 6, 30),
            PaymentFrequency::Annually,
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].due_date, date(2025, 6, 30));
        assert_eq!(rows[1].due_date, date(2026, 6, 30));
        assert_eq!(rows[1].balance_after, Decimal::ZERO);
    }
}

// ============================================================================
// Loans and payments
// ============================================================================

mod loan_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_loan_stores_schedule() {
        let (store, service, company) = seeded().await;

        let loan = service.create_loan(company, business_loan(dec!(120000))).await.unwrap();

        assert_eq!(loan.monthly_payment, dec!(10661.85));
        let schedule = service.loan_schedule(loan.id).await.unwrap();
        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule[0].due_date, date(2024, 2, 15));
        assert!(store.snapshot().await.loan(loan.id).is_some());
    }

    #[tokio::test]
    async fn test_invalid_loan_is_rejected() {
        let (_, service, company) = seeded().await;

        let result = service.create_loan(company, business_loan(dec!(0))).await;

        assert!(matches!(result, Err(LendingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_payment_settles_interest_first() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(50000))).await.unwrap();

        let receipt = service
            .record_payment(company, loan.id, dec!(1000), date(2024, 2, 15))
            .await
            .unwrap();

        assert_eq!(receipt.allocation.interest_due, dec!(500.00));
        assert_eq!(receipt.payment.interest_part, dec!(500.00));
        assert_eq!(receipt.payment.principal_part, dec!(500.00));
        assert_eq!(receipt.payment.balance_after, dec!(49500.00));
        assert_eq!(receipt.payment.payment_number, 1);
        assert_eq!(receipt.schedule_period, Some(1));
        assert!(receipt.payment.journal_entry_id.is_none());

        assert_eq!(receipt.loan.principal_paid, dec!(500.00));
        assert_eq!(receipt.loan.interest_paid, dec!(500.00));
        assert_eq!(receipt.loan.total_paid, dec!(1000.00));
        assert!(receipt.loan.is_active);
    }

    #[tokio::test]
    async fn test_payment_posts_journal_entry() {
        let (store, service, company) = seeded().await;
        let accounts = loan_accounts(&store, company).await;
        let loan = service
            .create_loan(company, business_loan(dec!(50000)).with_gl_accounts(accounts))
            .await
            .unwrap();

        let receipt = service
            .record_payment(company, loan.id, dec!(1000), date(2024, 2, 15))
            .await
            .unwrap();

        let entries = store.snapshot().await.ledger().journal_entries(company);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(Some(entry.id), receipt.payment.journal_entry_id);
        assert_eq!(entry.source_type, SourceType::LoanPayment);
        assert_eq!(entry.source_id, Some(receipt.payment.id.into_uuid()));
        assert_eq!(entry.lines.len(), 3);
        assert_eq!(entry.total_debit, dec!(1000.00));

        assert_eq!(balance(&store, company, "2500").await, dec!(-500.00));
        assert_eq!(balance(&store, company, "6800").await, dec!(500.00));
        assert_eq!(balance(&store, company, "1000").await, dec!(-1000.00));
    }

    #[tokio::test]
    async fn test_interest_only_payment_omits_principal_line() {
        let (store, service, company) = seeded().await;
        let accounts = loan_accounts(&store, company).await;
        let loan = service
            .create_loan(company, business_loan(dec!(50000)).with_gl_accounts(accounts))
            .await
            .unwrap();

        service
            .record_payment(company, loan.id, dec!(300), date(2024, 2, 15))
            .await
            .unwrap();

        let entries = store.snapshot().await.ledger().journal_entries(company);
        assert_eq!(entries[0].lines.len(), 2);
        assert_eq!(balance(&store, company, "2500").await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_final_payment_closes_loan() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(1000))).await.unwrap();

        let receipt = service
            .record_payment(company, loan.id, dec!(2000), date(2024, 2, 15))
            .await
            .unwrap();
        assert_eq!(receipt.loan.remaining_balance, Decimal::ZERO);
        assert!(!receipt.loan.is_active);

        let again = service.record_payment(company, loan.id, dec!(10), date(2024, 3, 15)).await;
        assert!(matches!(again, Err(LendingError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_non_positive_payment_is_rejected() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(1000))).await.unwrap();

        let result = service.record_payment(company, loan.id, dec!(0), date(2024, 2, 15)).await;

        assert!(matches!(result, Err(LendingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_sub_cent_payment_is_rejected() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(12000))).await.unwrap();

        let result = service.record_payment(company, loan.id, dec!(0.004), date(2024, 2, 10)).await;

        assert!(matches!(result, Err(LendingError::InvalidInput(_))));
        assert!(service.loan_payments(loan.id).await.unwrap().is_empty());
        assert!(service.loan_schedule(loan.id).await.unwrap().iter().all(|e| !e.is_paid));

        let receipt = service
            .record_payment(company, loan.id, dec!(0.005), date(2024, 2, 10))
            .await
            .unwrap();
        assert_eq!(receipt.payment.payment_number, 1);
        assert_eq!(receipt.payment.total_payment, dec!(0.01));
    }

    #[tokio::test]
    async fn test_term_over_cap_is_rejected() {
        let (_, service, company) = seeded().await;
        let mut loan = business_loan(dec!(12000));
        loan.term_months = domain_lending::MAX_TERM_MONTHS + 1;

        let result = service.create_loan(company, loan).await;

        assert!(matches!(result, Err(LendingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_loan_is_not_found() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(1000))).await.unwrap();

        let result = service
            .record_payment(CompanyId::new(), loan.id, dec!(100), date(2024, 2, 15))
            .await;

        assert!(matches!(result, Err(LendingError::LoanNotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_posting_leaves_loan_untouched() {
        let (store, service, company) = seeded().await;
        let accounts = loan_accounts(&store, company).await;
        let loan = service
            .create_loan(company, business_loan(dec!(50000)).with_gl_accounts(accounts))
            .await
            .unwrap();

        // Point cash at nothing: the pointer is unset and code 1000 is renamed away
        store
            .setup(|state| {
                let ledger = state.ledger_mut();
                let mut defaults = ledger.default_accounts(company);
                defaults.cash = None;
                ledger.set_default_accounts(company, defaults);
                let mut cash = ledger.account_by_code(company, "1000").cloned().unwrap();
                cash.code = "1001".into();
                ledger.insert_account(cash);
            })
            .await;

        let result = service
            .record_payment(company, loan.id, dec!(1000), date(2024, 2, 15))
            .await;

        assert!(matches!(
            result,
            Err(LendingError::Ledger(LedgerError::MissingDefaultAccount { role: AccountRole::Cash }))
        ));

        let state = store.snapshot().await;
        let stored = state.loan(loan.id).unwrap();
        assert_eq!(stored.remaining_balance, dec!(50000));
        assert_eq!(stored.total_paid, Decimal::ZERO);
        assert!(state.payments(loan.id).is_empty());
        assert!(state.schedule(loan.id).iter().all(|e| !e.is_paid));
        assert!(state.ledger().journal_entries(company).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_get_consecutive_numbers() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(120000))).await.unwrap();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .record_payment(company, loan.id, dec!(10661.85), date(2024, 2, 15))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut numbers: Vec<u32> = service
            .loan_payments(loan.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.payment_number)
            .collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

        let paid = service.loan_schedule(loan.id).await.unwrap().iter().filter(|e| e.is_paid).count();
        assert_eq!(paid, 5);
    }
}

// ============================================================================
// Upcoming payments and accrual
// ============================================================================

mod reporting_tests {
    use super::*;

    #[tokio::test]
    async fn test_upcoming_payments_window() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(12000))).await.unwrap();

        let upcoming = service.upcoming_payments(company, date(2024, 2, 1), None).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].loan_id, loan.id);
        assert_eq!(upcoming[0].due_date, date(2024, 2, 15));

        let wider = service.upcoming_payments(company, date(2024, 2, 1), Some(90)).await.unwrap();
        assert_eq!(wider.len(), 3);

        service
            .record_payment(company, loan.id, dec!(1066.19), date(2024, 2, 10))
            .await
            .unwrap();
        let after = service.upcoming_payments(company, date(2024, 2, 1), None).await.unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_payments_include_overdue() {
        let (_, service, company) = seeded().await;
        let loan = service.create_loan(company, business_loan(dec!(12000))).await.unwrap();

        let upcoming = service.upcoming_payments(company, date(2024, 3, 20), Some(30)).await.unwrap();
        let due: Vec<NaiveDate> = upcoming.iter().map(|u| u.due_date).collect();
        assert_eq!(due, vec![date(2024, 2, 15), date(2024, 3, 15), date(2024, 4, 15)]);

        service
            .record_payment(company, loan.id, dec!(1066.19), date(2024, 3, 20))
            .await
            .unwrap();
        let after = service.upcoming_payments(company, date(2024, 3, 20), Some(30)).await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].period_number, 2);
        assert_eq!(after[0].due_date, date(2024, 3, 15));
    }

    #[tokio::test]
    async fn test_accrual_covers_active_loans_only() {
        let (_, service, company) = seeded().await;
        service.create_loan(company, business_loan(dec!(50000))).await.unwrap();
        let small = service.create_loan(company, business_loan(dec!(100))).await.unwrap();
        service
            .record_payment(company, small.id, dec!(200), date(2024, 2, 15))
            .await
            .unwrap();

        let report = service.interest_accrual(company, date(2024, 2, 29)).await.unwrap();

        assert_eq!(report.as_of_date, date(2024, 2, 29));
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.total_accrual, dec!(500.00));
    }
}

// ============================================================================
// Prepaid recognition
// ============================================================================

mod prepaid_tests {
    use super::*;

    fn insurance() -> NewPrepaidExpense {
        NewPrepaidExpense::new("Annual insurance", dec!(1200), date(2024, 1, 1), date(2024, 12, 31))
    }

    #[tokio::test]
    async fn test_three_monthly_runs() {
        let (store, service, company) = seeded().await;
        let prepaid = service.create_prepaid_expense(company, insurance()).await.unwrap();
        assert_eq!(prepaid.monthly_amount, dec!(100.00));

        for as_of in [date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)] {
            let run = service.process_pending_prepaids(company, as_of).await.unwrap();
            assert_eq!(run.periods_recognized(), 1);
            assert_eq!(run.total_recognized, dec!(100.00));
        }

        let state = store.snapshot().await;
        let stored = state.prepaid(prepaid.id).unwrap();
        assert_eq!(stored.recognized_amount, dec!(300.00));
        assert_eq!(stored.remaining_amount, dec!(900.00));
        assert_eq!(stored.periods_recognized, 3);
        assert_eq!(stored.last_recognized_at, Some(date(2024, 3, 1)));
        assert_eq!(state.recognitions(prepaid.id).len(), 3);
    }

    #[tokio::test]
    async fn test_rerun_for_same_date_recognizes_nothing() {
        let (store, service, company) = seeded().await;
        let prepaid = service.create_prepaid_expense(company, insurance()).await.unwrap();

        let first = service.process_pending_prepaids(company, date(2024, 3, 1)).await.unwrap();
        let second = service.process_pending_prepaids(company, date(2024, 3, 1)).await.unwrap();
        let earlier = service.process_pending_prepaids(company, date(2024, 2, 1)).await.unwrap();

        assert_eq!(first.total_recognized, dec!(300.00));
        assert_eq!(second.periods_recognized(), 0);
        assert_eq!(earlier.periods_recognized(), 0);
        assert_eq!(
            store.snapshot().await.prepaid(prepaid.id).unwrap().remaining_amount,
            dec!(900.00)
        );
    }

    #[tokio::test]
    async fn test_recognition_posts_amortization_entry() {
        let (store, service, company) = seeded().await;
        let accounts = PrepaidGlAccounts {
            expense: account_id(&store, company, "5900").await,
            prepaid_asset: account_id(&store, company, "1300").await,
        };
        service
            .create_prepaid_expense(company, insurance().with_gl_accounts(accounts))
            .await
            .unwrap();

        let run = service.process_pending_prepaids(company, date(2024, 3, 1)).await.unwrap();

        let entries = store.snapshot().await.ledger().journal_entries(company);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_type, SourceType::ExpenseAmortization);
        assert_eq!(entries[0].total_debit, dec!(300.00));
        assert_eq!(run.recognized[0].journal_entry_id, Some(entries[0].id));
        assert!(run.recognized[0]
            .recognitions
            .iter()
            .all(|r| r.journal_entry_id == Some(entries[0].id)));

        assert_eq!(balance(&store, company, "5900").await, dec!(300.00));
        assert_eq!(balance(&store, company, "1300").await, dec!(-300.00));
    }

    #[tokio::test]
    async fn test_final_period_absorbs_rounding() {
        let (store, service, company) = seeded().await;
        let prepaid = service
            .create_prepaid_expense(
                company,
                NewPrepaidExpense::new("Software licence", dec!(1000), date(2024, 1, 1), date(2024, 3, 31)),
            )
            .await
            .unwrap();

        service.process_pending_prepaids(company, date(2024, 12, 31)).await.unwrap();

        let state = store.snapshot().await;
        let amounts: Vec<_> = state.recognitions(prepaid.id).iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![dec!(333.33), dec!(333.33), dec!(333.34)]);
        let stored = state.prepaid(prepaid.id).unwrap();
        assert_eq!(stored.remaining_amount, Decimal::ZERO);
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_schedule_tracks_recognition_runs() {
        let (_, service, company) = seeded().await;
        let prepaid = service.create_prepaid_expense(company, insurance()).await.unwrap();
        service.process_pending_prepaids(company, date(2024, 4, 1)).await.unwrap();

        let schedule = service.prepaid_schedule(company, prepaid.id).await.unwrap();

        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule.iter().filter(|e| e.is_recognized).count(), 4);
        assert_eq!(schedule[3].cumulative_recognized, dec!(400.00));
        assert_eq!(schedule[3].remaining_balance, dec!(800.00));
        assert_eq!(schedule[11].period_date, date(2024, 12, 1));
        assert_eq!(schedule[11].remaining_balance, Decimal::ZERO);

        let other = service.prepaid_schedule(CompanyId::new(), prepaid.id).await;
        assert!(matches!(other, Err(LendingError::PrepaidNotFound(_))));
    }

    #[tokio::test]
    async fn test_backwards_dates_are_rejected() {
        let (_, service, company) = seeded().await;

        let result = service
            .create_prepaid_expense(
                company,
                NewPrepaidExpense::new("Bad", dec!(100), date(2024, 5, 1), date(2024, 4, 1)),
            )
            .await;

        assert!(matches!(result, Err(LendingError::Core(_))));
    }
}

// ============================================================================
// Properties
// ============================================================================

mod property_tests {
    use super::*;
    use core_kernel::{add_months, elapsed_periods};
    use domain_lending::allocate_payment;
    use proptest::prelude::*;

    fn frequency(index: usize) -> PaymentFrequency {
        PaymentFrequency::ALL[index % PaymentFrequency::ALL.len()]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn schedule_repays_principal_exactly(
            cents in 100_000i64..100_000_000,
            basis_points in 0i64..3000,
            term in 1u32..121,
            freq in 0usize..4,
        ) {
            let principal = Decimal::new(cents, 2);
            let rows = generate_amortization_schedule(
                principal,
                Rate::new(Decimal::new(basis_points, 4)),
                term,
                date(2024, 1, 31),
                frequency(freq),
            )
            .unwrap();

            let repaid: Decimal = rows.iter().map(|r| r.principal_due).sum();
            prop_assert_eq!(repaid, principal);
            prop_assert_eq!(rows.last().unwrap().balance_after, Decimal::ZERO);
            prop_assert!(rows.iter().all(|r| r.principal_due >= Decimal::ZERO));
            prop_assert!(rows.windows(2).all(|w| w[0].due_date < w[1].due_date));
        }

        #[test]
        fn allocation_splits_whole_payment(
            remaining_cents in 1i64..100_000_000,
            payment_cents in 1i64..10_000_000,
            basis_points in 0i64..3000,
        ) {
            let remaining = Decimal::new(remaining_cents, 2);
            let payment = Decimal::new(payment_cents, 2);
            let rate = Rate::new(Decimal::new(basis_points, 4));
            let allocation = allocate_payment(remaining, rate, payment);

            prop_assert_eq!(allocation.interest_part + allocation.principal_part, payment);
            prop_assert!(allocation.interest_part <= allocation.interest_due);
            // Interest is charged in whole cents: at most half a cent over the exact figure.
            prop_assert!(allocation.interest_part <= remaining * rate.monthly() + dec!(0.005));
            prop_assert!(allocation.principal_part >= Decimal::ZERO);
            prop_assert!(allocation.balance_after >= Decimal::ZERO);
            prop_assert!(allocation.balance_after <= remaining);
        }

        #[test]
        fn prepaid_runs_never_lose_or_repeat_periods(
            total_cents in 10_000i64..10_000_000,
            months in 1u32..25,
            offsets in proptest::collection::vec(-60i64..900, 1..10),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let (store, service, company) = seeded().await;
                let start = date(2024, 1, 15);
                let end = add_months(start, months - 1).unwrap();
                let prepaid = service
                    .create_prepaid_expense(
                        company,
                        NewPrepaidExpense::new("Cover", Decimal::new(total_cents, 2), start, end),
                    )
                    .await
                    .unwrap();
                prop_assert_eq!(prepaid.period_months, months);

                let mut latest = start - chrono::Duration::days(1);
                for offset in offsets {
                    let as_of = start + chrono::Duration::days(offset);
                    latest = latest.max(as_of);
                    service.process_pending_prepaids(company, as_of).await.unwrap();

                    let state = store.snapshot().await;
                    let stored = state.prepaid(prepaid.id).unwrap();
                    let recognitions = state.recognitions(prepaid.id);
                    let recognized: Decimal = recognitions.iter().map(|r| r.amount).sum();

                    prop_assert_eq!(stored.recognized_amount + stored.remaining_amount, stored.total_amount);
                    prop_assert_eq!(recognized, stored.recognized_amount);
                    prop_assert!(stored.remaining_amount >= Decimal::ZERO);
                    prop_assert!(stored.periods_recognized <= months);
                    prop_assert_eq!(stored.periods_recognized, elapsed_periods(start, latest, 1, months));
                    prop_assert_eq!(recognitions.len(), stored.periods_recognized as usize);
                    if stored.periods_recognized == months {
                        prop_assert_eq!(stored.remaining_amount, Decimal::ZERO);
                    }
                }
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
