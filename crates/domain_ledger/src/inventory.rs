//! Products and stock movements
//!
//! Only what the posting engine needs: a product's cost price for cost of
//! goods on POS sales, and stock adjustments with an audit trail when goods
//! come back on a sales return or go back on a purchase return.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{wire_enum, CompanyId, ProductId, StockMovementId};
use crate::journal::SourceType;

/// A stocked or non-stocked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub company_id: CompanyId,
    pub name: String,
    /// Unit cost, when known
    pub cost_price: Option<Decimal>,
    /// Whether stock quantity is tracked
    pub track_inventory: bool,
    pub stock_quantity: Decimal,
}

impl Product {
    /// Creates an untracked product with no cost price
    pub fn new(company_id: CompanyId, name: impl Into<String>) -> Self {
        Self {
            id: ProductId::new_v7(),
            company_id,
            name: name.into(),
            cost_price: None,
            track_inventory: false,
            stock_quantity: Decimal::ZERO,
        }
    }

    /// Sets the unit cost
    pub fn with_cost_price(mut self, cost_price: Decimal) -> Self {
        self.cost_price = Some(cost_price);
        self
    }

    /// Tracks stock starting from the given quantity
    pub fn tracked(mut self, stock_quantity: Decimal) -> Self {
        self.track_inventory = true;
        self.stock_quantity = stock_quantity;
        self
    }
}

wire_enum! {
    /// Why stock moved
    pub enum MovementType {
        /// Goods returned by a customer
        Return => "RETURN",
        /// Goods sent back to a supplier
        PurchaseReturn => "PURCHASE_RETURN",
    }
}

/// An audited change to a product's stock quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    /// Signed quantity applied to stock
    pub quantity: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_type: SourceType,
    pub reference_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A stock change an event asks for once its entry is posted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockEffect {
    pub product_id: ProductId,
    /// Signed quantity
    pub quantity: Decimal,
    pub movement_type: MovementType,
}
