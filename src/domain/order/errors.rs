use rust_decimal::Decimal;

// ============================================================================
// Order Validation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid quantity {quantity} for item at position {position}")]
    InvalidQuantity { position: usize, quantity: i32 },

    #[error("Invalid unit price {unit_price} for item at position {position}")]
    InvalidPrice { position: usize, unit_price: Decimal },

    #[error("Item code is blank at position {position}")]
    BlankItemCode { position: usize },

    #[error("Order total exceeds the supported amount range")]
    TotalOutOfRange,
}
