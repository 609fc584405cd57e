// ============================================================================
// Order Store - durable keyed storage for accepted orders
// ============================================================================
//
// `save` is all-or-nothing per order: readers never observe an order with
// only some of its line items.
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::Order;

pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("order storage unavailable: {0}")]
    Unavailable(String),

    #[error("order {0} already exists")]
    DuplicateId(Uuid),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn save(&self, order: &Order) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
}
