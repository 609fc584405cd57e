use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Events
// ============================================================================

/// Base trait for events that leave the service
pub trait DomainEvent {
    fn event_type(&self) -> &'static str;
    fn aggregate_id(&self) -> Uuid;
}

/// Emitted once an order has been durably accepted. Consumers only get the id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedEvent {
    pub order_id: Uuid,
}

impl OrderPlacedEvent {
    pub fn new(order_id: Uuid) -> Self {
        Self { order_id }
    }
}

impl DomainEvent for OrderPlacedEvent {
    fn event_type(&self) -> &'static str {
        "OrderPlaced"
    }

    fn aggregate_id(&self) -> Uuid {
        self.order_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_placed_payload_shape() {
        let order_id = Uuid::new_v4();
        let event = OrderPlacedEvent::new(order_id);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "orderId": order_id.to_string() }));
        assert_eq!(event.event_type(), "OrderPlaced");
        assert_eq!(event.aggregate_id(), order_id);
    }
}
