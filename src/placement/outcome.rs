use uuid::Uuid;

use crate::domain::order::OrderError;
use crate::store::StoreError;
use crate::utils::GateError;

pub const ACCEPTED_MESSAGE: &str = "Order was placed!";
pub const FALLBACK_MESSAGE: &str = "Please order later!";

/// Why the stock check produced no usable answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    CircuitOpen,
    TimedOut,
    DependencyFailed,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::CircuitOpen => "circuit_open",
            FallbackReason::TimedOut => "timed_out",
            FallbackReason::DependencyFailed => "dependency_failed",
        }
    }
}

impl<E> From<&GateError<E>> for FallbackReason {
    fn from(error: &GateError<E>) -> Self {
        match error {
            GateError::CircuitOpen { .. } => FallbackReason::CircuitOpen,
            GateError::TimedOut { .. } => FallbackReason::TimedOut,
            GateError::Operation(_) => FallbackReason::DependencyFailed,
        }
    }
}

/// Terminal result of a placement that ran to a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    /// Stored, event attempted
    Accepted { order_id: Uuid },
    /// Business rejection: nothing stored, nothing published
    OutOfStock { item_code: String },
    /// Stock check denied or abandoned; the caller should try again later
    Degraded { reason: FallbackReason },
}

impl PlacementOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PlacementOutcome::Accepted { .. } => "accepted",
            PlacementOutcome::OutOfStock { .. } => "out_of_stock",
            PlacementOutcome::Degraded { .. } => "degraded",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("invalid order request: {0}")]
    InvalidRequest(#[from] OrderError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("placement task interrupted: {0}")]
    Interrupted(String),
}

impl PlacementError {
    pub fn label(&self) -> &'static str {
        match self {
            PlacementError::InvalidRequest(_) => "invalid_request",
            PlacementError::Storage(_) => "storage_unavailable",
            PlacementError::Interrupted(_) => "interrupted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_gate_errors_map_to_fallback_reasons() {
        let open: GateError<String> = GateError::CircuitOpen {
            dependency: "inventory".to_string(),
        };
        let timed_out: GateError<String> = GateError::TimedOut {
            dependency: "inventory".to_string(),
            after: Duration::from_secs(3),
        };
        let failed: GateError<String> = GateError::Operation("refused".to_string());

        assert_eq!(FallbackReason::from(&open), FallbackReason::CircuitOpen);
        assert_eq!(FallbackReason::from(&timed_out), FallbackReason::TimedOut);
        assert_eq!(FallbackReason::from(&failed), FallbackReason::DependencyFailed);
    }

    #[test]
    fn test_labels() {
        let outcome = PlacementOutcome::OutOfStock {
            item_code: "SKU1".to_string(),
        };
        assert_eq!(outcome.label(), "out_of_stock");
        assert_eq!(
            PlacementError::from(OrderError::EmptyItems).label(),
            "invalid_request"
        );
    }
}
