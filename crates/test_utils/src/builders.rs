//! Test Data Builders
//!
//! Builder patterns for loans, prepaid expenses, sales documents and bank
//! statements. Tests set only the fields they care about; everything else
//! comes from the fixtures, or from `fake` where the value is incidental.

use chrono::NaiveDate;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Word;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{InvoiceId, PosSaleId, ProductId, Rate};
use domain_banking::{NewBankEntry, NewSystemTransaction, TransactionDirection};
use domain_ledger::{DocumentLine, InvoicePosting, PosSalePosting, SourceDocument};
use domain_lending::{InterestType, LoanGlAccounts, NewLoan, NewPrepaidExpense, PaymentFrequency, PrepaidGlAccounts};

use crate::fixtures::{AmountFixtures, DateFixtures};

/// Builder for loan requests
///
/// Defaults to the reference loan: 120,000 at 12% over 12 months,
/// compounded monthly from the start of the fiscal year.
pub struct TestLoanBuilder {
    loan_name: String,
    lender_name: String,
    principal: Decimal,
    rate: Rate,
    term_months: u32,
    start_date: NaiveDate,
    interest_type: InterestType,
    frequency: PaymentFrequency,
    gl_accounts: Option<LoanGlAccounts>,
}

impl Default for TestLoanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLoanBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            loan_name: "Equipment loan".to_string(),
            lender_name: CompanyName().fake(),
            principal: AmountFixtures::loan_principal(),
            rate: AmountFixtures::loan_rate(),
            term_months: AmountFixtures::loan_term(),
            start_date: DateFixtures::year_start(),
            interest_type: InterestType::Compound,
            frequency: PaymentFrequency::Monthly,
            gl_accounts: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.loan_name = name.into();
        self
    }

    pub fn with_lender(mut self, lender: impl Into<String>) -> Self {
        self.lender_name = lender.into();
        self
    }

    pub fn with_principal(mut self, principal: Decimal) -> Self {
        self.principal = principal;
        self
    }

    /// Sets the annual rate as a percentage
    pub fn with_rate_percent(mut self, percent: Decimal) -> Self {
        self.rate = Rate::from_percentage(percent);
        self
    }

    pub fn with_term(mut self, months: u32) -> Self {
        self.term_months = months;
        self
    }

    pub fn starting(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }

    pub fn simple(mut self) -> Self {
        self.interest_type = InterestType::Simple;
        self
    }

    pub fn with_frequency(mut self, frequency: PaymentFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_gl_accounts(mut self, gl_accounts: LoanGlAccounts) -> Self {
        self.gl_accounts = Some(gl_accounts);
        self
    }

    /// Builds the loan request
    pub fn build(self) -> NewLoan {
        let request = NewLoan::new(
            self.loan_name,
            self.lender_name,
            self.principal,
            self.rate,
            self.term_months,
            self.start_date,
        )
        .with_interest_type(self.interest_type)
        .with_frequency(self.frequency);

        match self.gl_accounts {
            Some(gl_accounts) => request.with_gl_accounts(gl_accounts),
            None => request,
        }
    }
}

/// Builder for prepaid expense requests
///
/// Defaults to a 12,000 annual insurance premium covering the fiscal year.
pub struct TestPrepaidBuilder {
    name: String,
    total: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    gl_accounts: Option<PrepaidGlAccounts>,
}

impl Default for TestPrepaidBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPrepaidBuilder {
    pub fn new() -> Self {
        Self {
            name: "Annual insurance".to_string(),
            total: AmountFixtures::annual_prepaid(),
            start_date: DateFixtures::year_start(),
            end_date: DateFixtures::year_end(),
            gl_accounts: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    /// Sets the covered period
    pub fn covering(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn with_gl_accounts(mut self, gl_accounts: PrepaidGlAccounts) -> Self {
        self.gl_accounts = Some(gl_accounts);
        self
    }

    pub fn build(self) -> NewPrepaidExpense {
        let request = NewPrepaidExpense::new(self.name, self.total, self.start_date, self.end_date);
        match self.gl_accounts {
            Some(gl_accounts) => request.with_gl_accounts(gl_accounts),
            None => request,
        }
    }
}

/// Builder for itemised sales documents
pub struct TestDocumentBuilder {
    number: String,
    date: NaiveDate,
    items: Vec<DocumentLine>,
    tax_rate: Rate,
}

impl Default for TestDocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDocumentBuilder {
    /// A document with no items and no tax
    pub fn new() -> Self {
        let suffix: u32 = (1..999_999).fake();
        Self {
            number: format!("DOC-{:06}", suffix),
            date: DateFixtures::posting_date(),
            items: Vec::new(),
            tax_rate: Rate::zero(),
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Adds a free-text item
    pub fn item(mut self, quantity: Decimal, unit_price: Decimal) -> Self {
        self.items.push(DocumentLine::new(quantity, unit_price));
        self
    }

    /// Adds an item for a catalogued product
    pub fn product(mut self, product_id: ProductId, quantity: Decimal, unit_price: Decimal) -> Self {
        self.items.push(DocumentLine::for_product(product_id, quantity, unit_price));
        self
    }

    /// Sets the tax rate as a percentage
    pub fn with_tax_percent(mut self, percent: Decimal) -> Self {
        self.tax_rate = Rate::from_percentage(percent);
        self
    }

    pub fn build(self) -> SourceDocument {
        self.items
            .into_iter()
            .fold(SourceDocument::new(self.number, self.date), SourceDocument::item)
            .tax_rate(self.tax_rate)
    }

    /// Builds the document as a new invoice
    pub fn invoice(self) -> InvoicePosting {
        InvoicePosting {
            invoice_id: InvoiceId::new(),
            document: self.build(),
        }
    }

    /// Builds the document as a new POS sale
    pub fn pos_sale(self) -> PosSalePosting {
        PosSalePosting {
            sale_id: PosSaleId::new(),
            document: self.build(),
        }
    }
}

/// Builder for the two sides of a bank reconciliation
pub struct TestStatementBuilder {
    date: NaiveDate,
    lines: Vec<(Decimal, TransactionDirection)>,
}

impl Default for TestStatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStatementBuilder {
    pub fn new() -> Self {
        Self {
            date: DateFixtures::posting_date(),
            lines: Vec::new(),
        }
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Money into the account
    pub fn deposit(mut self, amount: Decimal) -> Self {
        self.lines.push((amount, TransactionDirection::Credit));
        self
    }

    /// Money out of the account
    pub fn withdrawal(mut self, amount: Decimal) -> Self {
        self.lines.push((amount, TransactionDirection::Debit));
        self
    }

    /// The lines as book transactions
    pub fn system_transactions(&self) -> Vec<NewSystemTransaction> {
        self.lines
            .iter()
            .map(|(amount, direction)| NewSystemTransaction {
                date: self.date,
                description: Word().fake(),
                reference: None,
                amount: *amount,
                direction: *direction,
            })
            .collect()
    }

    /// The lines as statement entries
    pub fn bank_entries(&self) -> Vec<NewBankEntry> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, (amount, direction))| NewBankEntry {
                date: self.date,
                description: Word().fake(),
                reference: Some(format!("STMT-{:04}", i + 1)),
                amount: *amount,
                direction: *direction,
            })
            .collect()
    }

    /// Net movement of the lines
    pub fn net(&self) -> Decimal {
        self.lines
            .iter()
            .map(|(amount, direction)| direction.signed(*amount))
            .sum()
    }
}
