//! Custom Test Assertions
//!
//! Assertion helpers for ledger types that report the figures involved when
//! they fail.

use rust_decimal::Decimal;

use core_kernel::MONEY_TOLERANCE;
use domain_ledger::{Account, JournalEntry, NormalBalance};
use domain_lending::ScheduleEntry;

/// Asserts that two amounts are equal within a tolerance
pub fn assert_amount_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that an entry's lines and totals balance
///
/// Each line must carry exactly one positive side, the lines must sum to
/// the stored totals, and debits must equal credits.
pub fn assert_entry_balanced(entry: &JournalEntry) {
    for line in &entry.lines {
        let one_sided = (line.debit > Decimal::ZERO && line.credit.is_zero())
            || (line.credit > Decimal::ZERO && line.debit.is_zero());
        assert!(
            one_sided,
            "{}: line on account {} has debit={} credit={}",
            entry.journal_number,
            line.account_id,
            line.debit,
            line.credit
        );
    }

    let debits: Decimal = entry.lines.iter().map(|l| l.debit).sum();
    let credits: Decimal = entry.lines.iter().map(|l| l.credit).sum();
    assert_eq!(debits, entry.total_debit, "{}: debit lines do not sum to total", entry.journal_number);
    assert_eq!(credits, entry.total_credit, "{}: credit lines do not sum to total", entry.journal_number);
    assert!(
        (debits - credits).abs() < MONEY_TOLERANCE,
        "{}: debits {} do not equal credits {}",
        entry.journal_number,
        debits,
        credits
    );
}

/// Asserts that a chart's balances net to zero
///
/// With balances kept on each account's normal side, debit-normal balances
/// must equal credit-normal balances after any sequence of postings.
pub fn assert_trial_balance(accounts: &[Account]) {
    let (debit_side, credit_side) = accounts.iter().fold((Decimal::ZERO, Decimal::ZERO), |(d, c), a| {
        match a.normal_balance {
            NormalBalance::Debit => (d + a.current_balance, c),
            NormalBalance::Credit => (d, c + a.current_balance),
        }
    });
    assert_eq!(
        debit_side, credit_side,
        "Trial balance is off: debit-normal={}, credit-normal={}",
        debit_side, credit_side
    );
}

/// Asserts that a schedule repays exactly `principal` and ends at zero
pub fn assert_schedule_repays(schedule: &[ScheduleEntry], principal: Decimal) {
    let repaid: Decimal = schedule.iter().map(|e| e.principal_due).sum();
    assert_eq!(repaid, principal, "Schedule repays {} of {}", repaid, principal);

    let last = schedule.last().expect("Schedule is empty");
    assert!(
        last.balance_after.is_zero(),
        "Schedule ends with balance {}",
        last.balance_after
    );

    for (i, entry) in schedule.iter().enumerate() {
        assert_eq!(entry.period_number as usize, i + 1, "Period numbers are not contiguous");
        assert_eq!(
            entry.total_due,
            entry.principal_due + entry.interest_due,
            "Period {} total does not equal principal plus interest",
            entry.period_number
        );
    }
}
