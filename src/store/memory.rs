use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::Order;
use super::{OrderStore, StoreError};

/// Process-local store. Used when no database is configured.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateId(order.id));
        }
        orders.insert(order.id, order.clone());

        tracing::debug!(order_id = %order.id, "Order stored in memory");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{LineItemSpec, OrderRequest};
    use rust_decimal::Decimal;

    fn order() -> Order {
        let request = OrderRequest::new(vec![LineItemSpec {
            item_code: "SKU1".to_string(),
            quantity: 2,
            unit_price: Decimal::new(1000, 2),
        }]);
        Order::from_request(&request).unwrap()
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let store = InMemoryOrderStore::new();
        let order = order();

        store.save(&order).await.unwrap();

        assert_eq!(store.get(order.id).await.unwrap(), Some(order));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryOrderStore::new();
        let order = order();

        store.save(&order).await.unwrap();
        let result = store.save(&order).await;

        assert_eq!(result, Err(StoreError::DuplicateId(order.id)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let store = InMemoryOrderStore::new();
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }
}
