// ============================================================================
// Inventory - remote stock availability
// ============================================================================
//
// The inventory service is the authority on stock. We ask it once per
// placement with the whole set of codes and never hold anything open on
// its side: the answer is a snapshot, not a reservation.
//
// ============================================================================

mod http_client;

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::stock::{StockQuery, StockResult};
use crate::utils::IsTimeout;

pub use http_client::HttpStockClient;

#[derive(Debug, thiserror::Error)]
pub enum StockCheckError {
    #[error("inventory did not answer within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("inventory unreachable: {0}")]
    Unreachable(String),

    #[error("inventory protocol error: {0}")]
    Protocol(String),
}

impl IsTimeout for StockCheckError {
    fn is_timeout(&self) -> bool {
        matches!(self, StockCheckError::Timeout(_))
    }
}

/// Batched availability lookup. Implementations issue exactly one remote
/// call per query and must give up at `deadline`.
#[async_trait]
pub trait StockAvailabilityClient: Send + Sync {
    async fn check_availability(
        &self,
        query: &StockQuery,
        deadline: Duration,
    ) -> Result<StockResult, StockCheckError>;
}
