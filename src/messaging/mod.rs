// ============================================================================
// Messaging - order placed notifications
// ============================================================================
//
// Publishing happens after the order is stored. A failure here is reported
// back to the caller of `publish` but never undoes the stored order.
//
// ============================================================================

mod redpanda;

use async_trait::async_trait;

use crate::domain::order::OrderPlacedEvent;

pub use redpanda::{KafkaEventPublisher, PublisherSettings, NOTIFICATION_DEPENDENCY};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("broker unavailable: {reason}")]
    BrokerUnavailable { reason: String },

    #[error("failed to encode event: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// At-least-once emission of order events. Implementations own their retry
/// policy; callers treat `publish` as fire-and-forget apart from logging.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OrderPlacedEvent) -> Result<(), PublishError>;
}
