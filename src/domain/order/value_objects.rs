use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Order Value Objects
// ============================================================================

/// One requested line as it arrives from the caller. Not validated yet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItemSpec {
    pub item_code: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Inbound placement request. Two identical requests are still two orders.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub line_items: Vec<LineItemSpec>,
}

impl OrderRequest {
    pub fn new(line_items: Vec<LineItemSpec>) -> Self {
        Self { line_items }
    }
}

/// A line item of an accepted order. `quantity > 0` always holds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub item_code: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLineItem {
    /// `None` when the product does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
