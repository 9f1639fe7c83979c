//! Ledger Domain - Double-entry General Ledger
//!
//! This crate owns the posting engine and everything it touches:
//!
//! - Chart of accounts with normal-balance sign conventions
//! - Journal entries and lines, numbered per company
//! - Business events (invoices, payments, bills, POS sales, returns) and the
//!   pure functions that turn each into balanced lines
//! - Default account roles and the standard chart seeder
//! - Ports for the transactional store, plus an in-memory adapter
//!
//! # Posting
//!
//! Every posting runs as one unit of work: the source document is claimed,
//! a journal number is allocated, the entry and its lines are written, and
//! each line's signed delta is applied to its account. Either all of it
//! commits or none of it does.

pub mod account;
pub mod journal;
pub mod policy;
pub mod defaults;
pub mod inventory;
pub mod events;
pub mod posting;
pub mod chart;
pub mod ports;
pub mod adapters;
pub mod error;

pub use account::{Account, AccountType, AccountCategory, NormalBalance};
pub use journal::{JournalEntry, JournalLine, EntryStatus, SourceType, SourceRef};
pub use policy::PostingPolicy;
pub use defaults::{AccountRole, DefaultAccounts, ResolvedAccounts, resolve_accounts};
pub use inventory::{Product, StockMovement, StockEffect, MovementType};
pub use events::{
    BusinessEvent, PostableEvent, LineContext, SourceDocument, DocumentLine, DocumentTotals,
    InvoicePosting, PaymentPosting, BillPosting, PosSalePosting, SalesReturnPosting,
    PurchaseReturnPosting, SupplierPaymentPosting, ExpensePosting, ExpenseSettlement,
};
pub use posting::{LineDraft, PostingRequest, PostingOutcome, PostingEngine, post_in_tx};
pub use chart::{ChartSeeder, SeedReport, StandardAccount, STANDARD_CHART};
pub use ports::{LedgerStore, LedgerTx, SourceClaim};
pub use adapters::memory::{InMemoryLedgerStore, LedgerState, MemoryTx, HasLedgerState};
pub use error::LedgerError;
