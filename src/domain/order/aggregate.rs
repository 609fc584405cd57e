use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::events::OrderPlacedEvent;
use super::value_objects::{OrderLineItem, OrderRequest};

// ============================================================================
// Order - the accepted, immutable order value
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub line_items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Validate a request and build an order with a freshly generated id.
    pub fn from_request(request: &OrderRequest) -> Result<Self, OrderError> {
        validate(request)?;

        let line_items = request
            .line_items
            .iter()
            .map(|spec| OrderLineItem {
                item_code: spec.item_code.trim().to_string(),
                quantity: spec.quantity,
                unit_price: spec.unit_price,
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            line_items,
            created_at: Utc::now(),
        })
    }

    /// Rebuild a stored order. Used by store implementations.
    pub fn restore(id: Uuid, line_items: Vec<OrderLineItem>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            line_items,
            created_at,
        }
    }

    /// Sum of the line totals. `None` on overflow, which `from_request`
    /// already rules out for accepted orders.
    pub fn total(&self) -> Option<Decimal> {
        checked_total(&self.line_items)
    }

    pub fn item_codes(&self) -> impl Iterator<Item = &str> {
        self.line_items.iter().map(|item| item.item_code.as_str())
    }

    pub fn placed_event(&self) -> OrderPlacedEvent {
        OrderPlacedEvent::new(self.id)
    }
}

fn validate(request: &OrderRequest) -> Result<(), OrderError> {
    if request.line_items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    for (position, spec) in request.line_items.iter().enumerate() {
        if spec.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                position,
                quantity: spec.quantity,
            });
        }
        if spec.unit_price < Decimal::ZERO {
            return Err(OrderError::InvalidPrice {
                position,
                unit_price: spec.unit_price,
            });
        }
        if spec.item_code.trim().is_empty() {
            return Err(OrderError::BlankItemCode { position });
        }
    }

    let total = request.line_items.iter().try_fold(Decimal::ZERO, |sum, spec| {
        spec.unit_price
            .checked_mul(Decimal::from(spec.quantity))
            .and_then(|line| sum.checked_add(line))
    });
    if total.is_none() {
        return Err(OrderError::TotalOutOfRange);
    }

    Ok(())
}

fn checked_total(line_items: &[OrderLineItem]) -> Option<Decimal> {
    line_items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
}

// ============================================================================
// Unit Tests
// ============================================================================
