// ============================================================================
// Domain Layer
// ============================================================================
//
// Plain values for the placement workflow. No I/O lives here; collaborators
// (inventory, store, publisher) consume these types.
//
// ============================================================================

pub mod order;
pub mod stock;
