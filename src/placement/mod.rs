pub mod coordinator;
pub mod outcome;

pub use coordinator::{OrderPlacementCoordinator, PlacementSettings, INVENTORY_DEPENDENCY};
pub use outcome::{
    FallbackReason, PlacementError, PlacementOutcome, ACCEPTED_MESSAGE, FALLBACK_MESSAGE,
};
