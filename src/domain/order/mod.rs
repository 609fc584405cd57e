// ============================================================================
// Order Domain
// ============================================================================
//
// Everything the placement workflow knows about an order:
// - Value objects (OrderRequest, LineItemSpec, OrderLineItem)
// - Order (validated, immutable, id assigned at acceptance)
// - Events (OrderPlacedEvent)
// - Errors (OrderError)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod aggregate;

pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use aggregate::*;
