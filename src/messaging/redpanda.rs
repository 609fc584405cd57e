use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    error::KafkaError,
    producer::{FutureProducer, FutureRecord},
    types::RDKafkaErrorCode,
    util::Timeout,
};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::{DomainEvent, OrderPlacedEvent};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, IsTimeout, ResilienceGate, RetryConfig, RetryResult};
use super::{EventPublisher, PublishError};

/// Breaker name used for the broker in the shared registry
pub const NOTIFICATION_DEPENDENCY: &str = "notification";

const RETRY_OPERATION: &str = "publish_order_placed";

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub brokers: String,
    pub topic: String,
    pub message_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            brokers: "127.0.0.1:9092".to_string(),
            topic: "notificationTopic".to_string(),
            message_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

/// Kafka/Redpanda producer for `OrderPlacedEvent`s.
///
/// Every send attempt goes through the resilience gate, so a dead broker
/// trips the `notification` breaker instead of stalling each placement for
/// the full retry budget.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    gate: Arc<ResilienceGate>,
    settings: PublisherSettings,
    metrics: Option<Arc<Metrics>>,
}

impl KafkaEventPublisher {
    pub fn new(settings: PublisherSettings, gate: Arc<ResilienceGate>) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("message.timeout.ms", settings.message_timeout.as_millis().to_string())
            .create()?;

        tracing::info!(
            brokers = %settings.brokers,
            topic = %settings.topic,
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            gate,
            settings,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn send_once(&self, key: &str, payload: &str) -> Result<(), KafkaError> {
        let record = FutureRecord::to(&self.settings.topic)
            .key(key)
            .payload(payload);

        self.producer
            .send(record, Timeout::After(self.settings.message_timeout))
            .await
            .map_err(|(e, _)| e)?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: &OrderPlacedEvent) -> Result<(), PublishError> {
        let key = event.aggregate_id().to_string();
        let payload = serde_json::to_string(event)?;

        let this = self;
        let key_ref = key.as_str();
        let payload_ref = payload.as_str();

        let result = retry_on_transient(RETRY_OPERATION, &self.settings.retry, move |attempt| {
            if let Some(metrics) = &this.metrics {
                metrics.record_retry_attempt(RETRY_OPERATION, attempt);
            }
            async move {
                this.gate
                    .execute(
                        NOTIFICATION_DEPENDENCY,
                        || this.send_once(key_ref, payload_ref),
                        this.settings.message_timeout,
                    )
                    .await
            }
        })
        .await;

        let succeeded = matches!(result, RetryResult::Success(_));
        if let Some(metrics) = &self.metrics {
            metrics.record_retry_outcome(RETRY_OPERATION, succeeded);
        }

        match result {
            RetryResult::Success(()) => {
                tracing::info!(
                    topic = %self.settings.topic,
                    order_id = %key,
                    event_type = event.event_type(),
                    "Published to Redpanda"
                );
                Ok(())
            }
            RetryResult::Failed { error, attempts } => {
                tracing::error!(
                    error = %error,
                    attempts = attempts,
                    topic = %self.settings.topic,
                    "Failed to publish to Redpanda"
                );
                Err(PublishError::BrokerUnavailable {
                    reason: error.to_string(),
                })
            }
            RetryResult::PermanentFailure(error) => {
                tracing::error!(
                    error = %error,
                    topic = %self.settings.topic,
                    "Circuit breaker open - Redpanda unavailable"
                );
                Err(PublishError::BrokerUnavailable {
                    reason: error.to_string(),
                })
            }
        }
    }
}

/// librdkafka reports an expired `message.timeout.ms` as a produce error
impl IsTimeout for KafkaError {
    fn is_timeout(&self) -> bool {
        matches!(
            self,
            KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut)
        )
    }
}
