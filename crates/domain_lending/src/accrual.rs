//! Month-end interest accrual
//!
//! Reports one month of interest on every active loan's remaining balance.
//! Nothing is persisted; [`AccrualReport::to_manual_entry`] turns the total
//! into an entry a caller can post.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{round2, AccountId, LoanId};
use domain_ledger::PostingRequest;
use crate::loan::Loan;

/// Accrued interest for one loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualDetail {
    pub loan_id: LoanId,
    pub loan_name: String,
    pub lender_name: String,
    pub balance: Decimal,
    pub monthly_interest: Decimal,
}

/// Accrued interest across a company's loans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualReport {
    pub as_of_date: NaiveDate,
    /// Rounded sum of the unrounded per-loan interest
    pub total_accrual: Decimal,
    pub details: Vec<AccrualDetail>,
}

/// Calculates one month of interest for every active loan
pub fn calculate_interest_accrual(loans: &[Loan], as_of: NaiveDate) -> AccrualReport {
    let mut total = Decimal::ZERO;
    let mut details = Vec::new();

    for loan in loans.iter().filter(|l| l.is_active && l.remaining_balance > Decimal::ZERO) {
        let interest = loan.remaining_balance * loan.interest_rate.monthly();
        total += interest;
        details.push(AccrualDetail {
            loan_id: loan.id,
            loan_name: loan.loan_name.clone(),
            lender_name: loan.lender_name.clone(),
            balance: loan.remaining_balance,
            monthly_interest: round2(interest),
        });
    }

    AccrualReport {
        as_of_date: as_of,
        total_accrual: round2(total),
        details,
    }
}

impl AccrualReport {
    /// A manual entry booking the accrual: Dr interest expense, Cr accrued
    /// interest
    ///
    /// Returns `None` when there is nothing to accrue.
    pub fn to_manual_entry(&self, expense: AccountId, accrued_liability: AccountId) -> Option<PostingRequest> {
        if self.total_accrual <= Decimal::ZERO {
            return None;
        }

        Some(
            PostingRequest::manual(format!("Interest accrual as of {}", self.as_of_date), self.as_of_date)
                .debit(expense, self.total_accrual)
                .credit(accrued_liability, self.total_accrual),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::NewLoan;
    use core_kernel::{CompanyId, Rate};
    use rust_decimal_macros::dec;

    fn loan(principal: Decimal, rate: Decimal) -> Loan {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let terms = NewLoan::new("Loan", "Bank", principal, Rate::new(rate), 12, start);
        Loan::create(CompanyId::new(), terms).unwrap().0
    }

    #[test]
    fn test_accrual_over_active_loans() {
        let mut paid_off = loan(dec!(1000), dec!(0.12));
        paid_off.remaining_balance = Decimal::ZERO;
        paid_off.is_active = false;

        let loans = vec![loan(dec!(50000), dec!(0.12)), loan(dec!(10000), dec!(0.06)), paid_off];
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        let report = calculate_interest_accrual(&loans, as_of);

        assert_eq!(report.details.len(), 2);
        assert_eq!(report.details[0].monthly_interest, dec!(500.00));
        assert_eq!(report.details[1].monthly_interest, dec!(50.00));
        assert_eq!(report.total_accrual, dec!(550.00));
    }

    #[test]
    fn test_total_rounds_unrounded_sum() {
        // 1000 * 0.05 / 12 = 4.1666.. each; three of them sum to 12.50
        let loans = vec![
            loan(dec!(1000), dec!(0.05)),
            loan(dec!(1000), dec!(0.05)),
            loan(dec!(1000), dec!(0.05)),
        ];
        let report = calculate_interest_accrual(&loans, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

        assert!(report.details.iter().all(|d| d.monthly_interest == dec!(4.17)));
        assert_eq!(report.total_accrual, dec!(12.50));
    }

    #[test]
    fn test_manual_entry_is_balanced() {
        let report = calculate_interest_accrual(&[loan(dec!(50000), dec!(0.12))], NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let (expense, accrued) = (AccountId::new(), AccountId::new());

        let request = report.to_manual_entry(expense, accrued).unwrap();
        assert_eq!(request.validate().unwrap(), (dec!(500.00), dec!(500.00)));

        let empty = calculate_interest_accrual(&[], NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert!(empty.to_manual_entry(expense, accrued).is_none());
    }
}
