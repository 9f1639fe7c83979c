//! Business events and their journal lines
//!
//! Each event type is a payload struct implementing [`PostableEvent`]: it
//! names its source type, and turns itself into journal lines given the
//! company's resolved default accounts. Line building is pure; reading
//! accounts and products happens before, writing happens after.
//!
//! | Event | Debit | Credit |
//! |---|---|---|
//! | Invoice | AR (total) | Sales (subtotal), Sales tax (tax) |
//! | Payment received | Cash | AR |
//! | Bill | COGS (subtotal), Sales tax (tax) | AP (total) |
//! | POS sale | Cash (total), COGS (cost) | Sales (subtotal), Sales tax (tax), Inventory (cost) |
//! | Sales return | Sales (subtotal), Sales tax (tax) | AR (total) |
//! | Purchase return | AP (total) | Inventory (total) |
//! | Supplier payment | AP | Cash |
//! | Expense | Expense account | Cash or AP |
//!
//! Adding an event type means adding a payload, its impl, and a variant of
//! [`BusinessEvent`].

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{
    round2, AccountId, BillId, ExpenseId, InvoiceId, PaymentId, PosSaleId, ProductId, PurchaseReturnId, Rate,
    SalesReturnId, SupplierPaymentId,
};
use crate::defaults::{AccountRole, ResolvedAccounts};
use crate::error::LedgerError;
use crate::inventory::{MovementType, Product, StockEffect};
use crate::journal::{SourceRef, SourceType};
use crate::policy::PostingPolicy;
use crate::posting::LineDraft;

/// An item on a source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub product_id: Option<ProductId>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl DocumentLine {
    /// A free-text item
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product_id: None,
            description: None,
            quantity,
            unit_price,
        }
    }

    /// An item for a catalogued product
    pub fn for_product(product_id: ProductId, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::new(quantity, unit_price)
        }
    }

    /// Line amount, rounded
    pub fn amount(&self) -> Decimal {
        round2(self.quantity * self.unit_price)
    }
}

/// Subtotal, tax and total of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Number, date, items and tax rate shared by all itemised documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub number: String,
    pub date: NaiveDate,
    pub items: Vec<DocumentLine>,
    pub tax_rate: Rate,
}

impl SourceDocument {
    pub fn new(number: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            number: number.into(),
            date,
            items: Vec::new(),
            tax_rate: Rate::zero(),
        }
    }

    /// Adds an item
    pub fn item(mut self, item: DocumentLine) -> Self {
        self.items.push(item);
        self
    }

    /// Sets the tax rate
    pub fn tax_rate(mut self, tax_rate: Rate) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Computes totals; tax is charged on the subtotal and rounded once
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` for an empty document, a non-positive
    /// quantity, a negative price or a negative tax rate.
    pub fn totals(&self) -> Result<DocumentTotals, LedgerError> {
        if self.items.is_empty() {
            return Err(LedgerError::InvalidDocument(format!("{} has no items", self.number)));
        }
        if self.tax_rate.as_decimal().is_sign_negative() {
            return Err(LedgerError::InvalidDocument(format!("{} has a negative tax rate", self.number)));
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.quantity <= Decimal::ZERO {
                return Err(LedgerError::InvalidDocument(format!(
                    "{} item {} has non-positive quantity {}",
                    self.number, index, item.quantity
                )));
            }
            if item.unit_price.is_sign_negative() {
                return Err(LedgerError::InvalidDocument(format!(
                    "{} item {} has negative price {}",
                    self.number, index, item.unit_price
                )));
            }
        }

        let subtotal: Decimal = self.items.iter().map(DocumentLine::amount).sum();
        let tax = round2(self.tax_rate.apply(subtotal));
        Ok(DocumentTotals {
            subtotal,
            tax,
            total: subtotal + tax,
        })
    }

    fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().filter_map(|item| item.product_id).collect()
    }

    fn stock_effects(
        &self,
        products: &HashMap<ProductId, Product>,
        sign: Decimal,
        movement_type: MovementType,
    ) -> Vec<StockEffect> {
        self.items
            .iter()
            .filter_map(|item| {
                let product = products.get(&item.product_id?)?;
                product.track_inventory.then(|| StockEffect {
                    product_id: product.id,
                    quantity: item.quantity * sign,
                    movement_type,
                })
            })
            .collect()
    }
}

/// What line building may read
pub struct LineContext<'a> {
    pub accounts: &'a ResolvedAccounts,
    pub policy: &'a PostingPolicy,
    pub products: &'a HashMap<ProductId, Product>,
}

/// A business event that posts one journal entry
pub trait PostableEvent: Send + Sync {
    /// Source type recorded on the entry
    fn source_type(&self) -> SourceType;

    /// Id of the originating record
    fn source_id(&self) -> Uuid;

    /// Date of the entry
    fn entry_date(&self) -> NaiveDate;

    /// Entry description
    fn description(&self) -> String;

    /// Builds the entry's lines
    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError>;

    /// Products whose data line building or stock effects need
    fn product_ids(&self) -> Vec<ProductId> {
        Vec::new()
    }

    /// Stock changes applied alongside the entry
    fn stock_effects(&self, _products: &HashMap<ProductId, Product>) -> Vec<StockEffect> {
        Vec::new()
    }
}

fn positive_amount(amount: Decimal, what: &str) -> Result<Decimal, LedgerError> {
    let amount = round2(amount);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidDocument(format!("{} has non-positive amount {}", what, amount)));
    }
    Ok(amount)
}

fn push_tax_line(
    lines: &mut Vec<LineDraft>,
    accounts: &ResolvedAccounts,
    tax: Decimal,
    debit: bool,
) -> Result<(), LedgerError> {
    if tax > Decimal::ZERO {
        let account = accounts.require(AccountRole::SalesTax)?;
        let line = if debit {
            LineDraft::debit(account, tax)
        } else {
            LineDraft::credit(account, tax)
        };
        lines.push(line.with_description("Sales tax"));
    }
    Ok(())
}

/// An invoice being issued to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePosting {
    pub invoice_id: InvoiceId,
    pub document: SourceDocument,
}

impl PostableEvent for InvoicePosting {
    fn source_type(&self) -> SourceType {
        SourceType::Invoice
    }

    fn source_id(&self) -> Uuid {
        self.invoice_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.document.date
    }

    fn description(&self) -> String {
        format!("Invoice {}", self.document.number)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let totals = self.document.totals()?;
        let mut lines = vec![
            LineDraft::debit(ctx.accounts.require(AccountRole::AccountsReceivable)?, totals.total)
                .with_description("Accounts receivable"),
            LineDraft::credit(ctx.accounts.require(AccountRole::Sales)?, totals.subtotal)
                .with_description("Sales revenue"),
        ];
        push_tax_line(&mut lines, ctx.accounts, totals.tax, false)?;
        Ok(lines)
    }
}

/// A customer payment received against receivables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPosting {
    pub payment_id: PaymentId,
    pub reference: String,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
}

impl PostableEvent for PaymentPosting {
    fn source_type(&self) -> SourceType {
        SourceType::PaymentReceived
    }

    fn source_id(&self) -> Uuid {
        self.payment_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.payment_date
    }

    fn description(&self) -> String {
        format!("Payment received {}", self.reference)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let amount = positive_amount(self.amount, &format!("payment {}", self.reference))?;
        Ok(vec![
            LineDraft::debit(ctx.accounts.require(AccountRole::Cash)?, amount).with_description("Cash"),
            LineDraft::credit(ctx.accounts.require(AccountRole::AccountsReceivable)?, amount)
                .with_description("Accounts receivable"),
        ])
    }
}

/// A supplier bill being received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPosting {
    pub bill_id: BillId,
    pub document: SourceDocument,
}

impl PostableEvent for BillPosting {
    fn source_type(&self) -> SourceType {
        SourceType::Bill
    }

    fn source_id(&self) -> Uuid {
        self.bill_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.document.date
    }

    fn description(&self) -> String {
        format!("Bill {}", self.document.number)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let totals = self.document.totals()?;
        let mut lines = vec![
            LineDraft::debit(ctx.accounts.require(AccountRole::Cogs)?, totals.subtotal)
                .with_description("Purchases"),
        ];
        push_tax_line(&mut lines, ctx.accounts, totals.tax, true)?;
        lines.push(
            LineDraft::credit(ctx.accounts.require(AccountRole::AccountsPayable)?, totals.total)
                .with_description("Accounts payable"),
        );
        Ok(lines)
    }
}

/// A point-of-sale sale settled in cash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosSalePosting {
    pub sale_id: PosSaleId,
    pub document: SourceDocument,
}

impl PosSalePosting {
    /// Cost of the goods sold on this sale
    ///
    /// Products with a cost price contribute `quantity * cost_price`; any
    /// other item is estimated as its revenue times the policy's
    /// `estimated_cogs_ratio`.
    pub fn cost_of_goods(
        &self,
        products: &HashMap<ProductId, Product>,
        policy: &PostingPolicy,
    ) -> Decimal {
        let cost: Decimal = self
            .document
            .items
            .iter()
            .map(|item| {
                let actual = item
                    .product_id
                    .and_then(|id| products.get(&id))
                    .and_then(|product| product.cost_price);
                match actual {
                    Some(cost_price) => item.quantity * cost_price,
                    None => item.amount() * policy.estimated_cogs_ratio,
                }
            })
            .sum();
        round2(cost)
    }
}

impl PostableEvent for PosSalePosting {
    fn source_type(&self) -> SourceType {
        SourceType::PosSale
    }

    fn source_id(&self) -> Uuid {
        self.sale_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.document.date
    }

    fn description(&self) -> String {
        format!("POS sale {}", self.document.number)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let totals = self.document.totals()?;
        let mut lines = vec![
            LineDraft::debit(ctx.accounts.require(AccountRole::Cash)?, totals.total).with_description("Cash"),
            LineDraft::credit(ctx.accounts.require(AccountRole::Sales)?, totals.subtotal)
                .with_description("Sales revenue"),
        ];
        push_tax_line(&mut lines, ctx.accounts, totals.tax, false)?;

        // Cost of goods is only booked when both sides are configured.
        if let (Some(cogs), Some(inventory)) = (
            ctx.accounts.get(AccountRole::Cogs),
            ctx.accounts.get(AccountRole::Inventory),
        ) {
            let cost = self.cost_of_goods(ctx.products, ctx.policy);
            if cost > Decimal::ZERO {
                lines.push(LineDraft::debit(cogs, cost).with_description("Cost of goods sold"));
                lines.push(LineDraft::credit(inventory, cost).with_description("Inventory"));
            }
        }
        Ok(lines)
    }

    fn product_ids(&self) -> Vec<ProductId> {
        self.document.product_ids()
    }
}

/// A credit note for goods returned by a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReturnPosting {
    pub return_id: SalesReturnId,
    pub document: SourceDocument,
}

impl PostableEvent for SalesReturnPosting {
    fn source_type(&self) -> SourceType {
        SourceType::SalesReturn
    }

    fn source_id(&self) -> Uuid {
        self.return_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.document.date
    }

    fn description(&self) -> String {
        format!("Sales return {}", self.document.number)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let totals = self.document.totals()?;
        let mut lines = vec![
            LineDraft::debit(ctx.accounts.require(AccountRole::Sales)?, totals.subtotal)
                .with_description("Sales returns"),
        ];
        push_tax_line(&mut lines, ctx.accounts, totals.tax, true)?;
        lines.push(
            LineDraft::credit(ctx.accounts.require(AccountRole::AccountsReceivable)?, totals.total)
                .with_description("Accounts receivable"),
        );
        Ok(lines)
    }

    fn product_ids(&self) -> Vec<ProductId> {
        self.document.product_ids()
    }

    fn stock_effects(&self, products: &HashMap<ProductId, Product>) -> Vec<StockEffect> {
        self.document.stock_effects(products, Decimal::ONE, MovementType::Return)
    }
}

/// A debit note for goods sent back to a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReturnPosting {
    pub return_id: PurchaseReturnId,
    pub document: SourceDocument,
}

impl PostableEvent for PurchaseReturnPosting {
    fn source_type(&self) -> SourceType {
        SourceType::PurchaseReturn
    }

    fn source_id(&self) -> Uuid {
        self.return_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.document.date
    }

    fn description(&self) -> String {
        format!("Purchase return {}", self.document.number)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let totals = self.document.totals()?;
        Ok(vec![
            LineDraft::debit(ctx.accounts.require(AccountRole::AccountsPayable)?, totals.total)
                .with_description("Accounts payable"),
            LineDraft::credit(ctx.accounts.require(AccountRole::Inventory)?, totals.total)
                .with_description("Inventory"),
        ])
    }

    fn product_ids(&self) -> Vec<ProductId> {
        self.document.product_ids()
    }

    fn stock_effects(&self, products: &HashMap<ProductId, Product>) -> Vec<StockEffect> {
        self.document
            .stock_effects(products, Decimal::NEGATIVE_ONE, MovementType::PurchaseReturn)
    }
}

/// A payment made to a supplier against payables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPaymentPosting {
    pub payment_id: SupplierPaymentId,
    pub reference: String,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
}

impl PostableEvent for SupplierPaymentPosting {
    fn source_type(&self) -> SourceType {
        SourceType::PaymentMade
    }

    fn source_id(&self) -> Uuid {
        self.payment_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.payment_date
    }

    fn description(&self) -> String {
        format!("Payment made {}", self.reference)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let amount = positive_amount(self.amount, &format!("supplier payment {}", self.reference))?;
        Ok(vec![
            LineDraft::debit(ctx.accounts.require(AccountRole::AccountsPayable)?, amount)
                .with_description("Accounts payable"),
            LineDraft::credit(ctx.accounts.require(AccountRole::Cash)?, amount).with_description("Cash"),
        ])
    }
}

/// How a direct expense was settled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseSettlement {
    /// Paid on the spot
    #[default]
    Cash,
    /// Owed to the supplier
    Payable,
}

impl ExpenseSettlement {
    fn role(self) -> AccountRole {
        match self {
            ExpenseSettlement::Cash => AccountRole::Cash,
            ExpenseSettlement::Payable => AccountRole::AccountsPayable,
        }
    }
}

/// An expense booked straight to an expense account
///
/// The expense account is chosen per expense rather than resolved from the
/// company defaults; it must belong to the posting company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpensePosting {
    pub expense_id: ExpenseId,
    pub expense_account: AccountId,
    pub description: String,
    pub expense_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub settlement: ExpenseSettlement,
}

impl PostableEvent for ExpensePosting {
    fn source_type(&self) -> SourceType {
        SourceType::Expense
    }

    fn source_id(&self) -> Uuid {
        self.expense_id.into_uuid()
    }

    fn entry_date(&self) -> NaiveDate {
        self.expense_date
    }

    fn description(&self) -> String {
        format!("Expense - {}", self.description)
    }

    fn build_lines(&self, ctx: &LineContext<'_>) -> Result<Vec<LineDraft>, LedgerError> {
        let amount = positive_amount(self.amount, &format!("expense {}", self.description))?;
        let settlement = self.settlement.role();
        let settlement_label = match self.settlement {
            ExpenseSettlement::Cash => "Cash",
            ExpenseSettlement::Payable => "Accounts payable",
        };
        Ok(vec![
            LineDraft::debit(self.expense_account, amount).with_description(self.description.clone()),
            LineDraft::credit(ctx.accounts.require(settlement)?, amount).with_description(settlement_label),
        ])
    }
}

/// Every event the engine knows how to post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessEvent {
    Invoice(InvoicePosting),
    PaymentReceived(PaymentPosting),
    Bill(BillPosting),
    PosSale(PosSalePosting),
    SalesReturn(SalesReturnPosting),
    PurchaseReturn(PurchaseReturnPosting),
    PaymentMade(SupplierPaymentPosting),
    Expense(ExpensePosting),
}

impl BusinessEvent {
    /// The event's posting behaviour
    pub fn as_postable(&self) -> &dyn PostableEvent {
        match self {
            BusinessEvent::Invoice(event) => event,
            BusinessEvent::PaymentReceived(event) => event,
            BusinessEvent::Bill(event) => event,
            BusinessEvent::PosSale(event) => event,
            BusinessEvent::SalesReturn(event) => event,
            BusinessEvent::PurchaseReturn(event) => event,
            BusinessEvent::PaymentMade(event) => event,
            BusinessEvent::Expense(event) => event,
        }
    }

    /// The source record this event posts
    pub fn source(&self) -> SourceRef {
        let event = self.as_postable();
        SourceRef::new(event.source_type(), event.source_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn all_roles() -> ResolvedAccounts {
        ResolvedAccounts::from_pairs(AccountRole::ALL.iter().map(|role| (*role, AccountId::new())))
    }

    fn build(event: &dyn PostableEvent, accounts: &ResolvedAccounts) -> Result<Vec<LineDraft>, LedgerError> {
        let policy = PostingPolicy::default();
        let products = HashMap::new();
        event.build_lines(&LineContext { accounts, policy: &policy, products: &products })
    }

    #[test]
    fn test_invoice_totals_with_tax() {
        let document = SourceDocument::new("INV-1", date())
            .item(DocumentLine::new(dec!(4), dec!(250)))
            .tax_rate(Rate::from_percentage(dec!(14)));
        let totals = document.totals().unwrap();

        assert_eq!(totals.subtotal, dec!(1000.00));
        assert_eq!(totals.tax, dec!(140.00));
        assert_eq!(totals.total, dec!(1140.00));
    }

    #[test]
    fn test_invoice_without_tax_has_two_lines() {
        let accounts = all_roles();
        let event = InvoicePosting {
            invoice_id: InvoiceId::new(),
            document: SourceDocument::new("INV-2", date()).item(DocumentLine::new(dec!(1), dec!(80))),
        };
        let lines = build(&event, &accounts).unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_taxed_invoice_requires_sales_tax_account() {
        let accounts = ResolvedAccounts::from_pairs([
            (AccountRole::AccountsReceivable, AccountId::new()),
            (AccountRole::Sales, AccountId::new()),
        ]);
        let event = InvoicePosting {
            invoice_id: InvoiceId::new(),
            document: SourceDocument::new("INV-3", date())
                .item(DocumentLine::new(dec!(1), dec!(100)))
                .tax_rate(Rate::from_percentage(dec!(5))),
        };

        let err = build(&event, &accounts).unwrap_err();
        assert!(matches!(err, LedgerError::MissingDefaultAccount { role: AccountRole::SalesTax }));
    }

    #[test]
    fn test_bill_folds_tax_into_debits() {
        let accounts = all_roles();
        let event = BillPosting {
            bill_id: BillId::new(),
            document: SourceDocument::new("BILL-1", date())
                .item(DocumentLine::new(dec!(2), dec!(50)))
                .tax_rate(Rate::from_percentage(dec!(10))),
        };
        let lines = build(&event, &accounts).unwrap();

        let debits: Decimal = lines.iter().map(|l| l.debit).sum();
        let credits: Decimal = lines.iter().map(|l| l.credit).sum();
        assert_eq!(debits, dec!(110.00));
        assert_eq!(credits, dec!(110.00));
    }

    #[test]
    fn test_pos_cost_prefers_product_cost() {
        let company = core_kernel::CompanyId::new();
        let costed = Product::new(company, "Widget").with_cost_price(dec!(3));
        let uncosted = Product::new(company, "Gadget");
        let products: HashMap<_, _> = [(costed.id, costed.clone()), (uncosted.id, uncosted.clone())].into();

        let sale = PosSalePosting {
            sale_id: PosSaleId::new(),
            document: SourceDocument::new("R-1", date())
                .item(DocumentLine::for_product(costed.id, dec!(2), dec!(10)))
                .item(DocumentLine::for_product(uncosted.id, dec!(1), dec!(50))),
        };

        // 2 * 3 from cost price, 50 * 0.6 estimated
        assert_eq!(sale.cost_of_goods(&products, &PostingPolicy::default()), dec!(36.00));
    }

    #[test]
    fn test_pos_without_inventory_accounts_skips_cost_pair() {
        let accounts = ResolvedAccounts::from_pairs([
            (AccountRole::Cash, AccountId::new()),
            (AccountRole::Sales, AccountId::new()),
        ]);
        let sale = PosSalePosting {
            sale_id: PosSaleId::new(),
            document: SourceDocument::new("R-2", date()).item(DocumentLine::new(dec!(1), dec!(20))),
        };
        assert_eq!(build(&sale, &accounts).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let document = SourceDocument::new("INV-4", date());
        assert!(matches!(document.totals(), Err(LedgerError::InvalidDocument(_))));
    }

    #[test]
    fn test_supplier_payment_clears_payables() {
        let accounts = all_roles();
        let event = SupplierPaymentPosting {
            payment_id: SupplierPaymentId::new(),
            reference: "TRF-7".into(),
            payment_date: date(),
            amount: dec!(250),
        };
        let lines = build(&event, &accounts).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].account_id, accounts.get(AccountRole::AccountsPayable).unwrap());
        assert_eq!(lines[0].debit, dec!(250));
        assert_eq!(lines[1].account_id, accounts.get(AccountRole::Cash).unwrap());
        assert_eq!(lines[1].credit, dec!(250));
    }

    #[test]
    fn test_expense_settles_against_cash_or_payables() {
        let accounts = all_roles();
        let rent = AccountId::new();
        let mut event = ExpensePosting {
            expense_id: ExpenseId::new(),
            expense_account: rent,
            description: "Office rent".into(),
            expense_date: date(),
            amount: dec!(1500),
            settlement: ExpenseSettlement::Cash,
        };

        let paid = build(&event, &accounts).unwrap();
        assert_eq!(paid[0].account_id, rent);
        assert_eq!(paid[0].debit, dec!(1500));
        assert_eq!(paid[1].account_id, accounts.get(AccountRole::Cash).unwrap());

        event.settlement = ExpenseSettlement::Payable;
        let owed = build(&event, &accounts).unwrap();
        assert_eq!(owed[1].account_id, accounts.get(AccountRole::AccountsPayable).unwrap());
        assert_eq!(owed[1].credit, dec!(1500));
    }

    #[test]
    fn test_zero_expense_is_rejected() {
        let event = ExpensePosting {
            expense_id: ExpenseId::new(),
            expense_account: AccountId::new(),
            description: "Nothing".into(),
            expense_date: date(),
            amount: dec!(0.001),
            settlement: ExpenseSettlement::default(),
        };
        assert!(matches!(build(&event, &all_roles()), Err(LedgerError::InvalidDocument(_))));
    }

    #[test]
    fn test_business_event_source() {
        let payment_id = PaymentId::new();
        let event = BusinessEvent::PaymentReceived(PaymentPosting {
            payment_id,
            reference: "CHQ-1".into(),
            payment_date: date(),
            amount: dec!(10),
        });
        assert_eq!(event.source(), SourceRef::new(SourceType::PaymentReceived, payment_id));
    }
}
