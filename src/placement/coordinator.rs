use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::order::{Order, OrderRequest};
use crate::domain::stock::StockQuery;
use crate::inventory::StockAvailabilityClient;
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;
use crate::store::{OrderStore, StoreError};
use crate::utils::ResilienceGate;
use super::outcome::{FallbackReason, PlacementError, PlacementOutcome};

// ============================================================================
// Order Placement Coordinator
// ============================================================================
//
// validate -> stock check (gated) -> decide -> persist -> publish
//
// Only the stock check can end in the degraded fallback. Nothing is written
// before the decision, and nothing is published unless the save committed.
// The publish runs detached once the save commits: a failed publish is
// logged and counted but the order stays accepted.
//
// ============================================================================

/// Breaker name for the inventory service
pub const INVENTORY_DEPENDENCY: &str = "inventory";

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementSettings {
    /// Deadline handed to the stock client for its own request
    pub op_timeout: Duration,
    /// Deadline the gate enforces on the whole stock check
    pub gate_timeout: Duration,
    /// Upper bound on a single `OrderStore::save`
    pub save_timeout: Duration,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_millis(2500),
            gate_timeout: Duration::from_secs(3),
            save_timeout: Duration::from_secs(2),
        }
    }
}

pub struct OrderPlacementCoordinator {
    gate: Arc<ResilienceGate>,
    stock_client: Arc<dyn StockAvailabilityClient>,
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
    settings: PlacementSettings,
    metrics: Option<Arc<Metrics>>,
}

impl OrderPlacementCoordinator {
    pub fn new(
        gate: Arc<ResilienceGate>,
        stock_client: Arc<dyn StockAvailabilityClient>,
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn EventPublisher>,
        settings: PlacementSettings,
    ) -> Self {
        Self {
            gate,
            stock_client,
            store,
            publisher,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn gate(&self) -> &Arc<ResilienceGate> {
        &self.gate
    }

    /// Run the placement on its own task so the caller's worker is free
    /// while the stock check is in flight.
    pub async fn dispatch(
        self: &Arc<Self>,
        request: OrderRequest,
    ) -> Result<PlacementOutcome, PlacementError> {
        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move { coordinator.place_order(&request).await });

        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                tracing::error!(error = %join_error, "Placement task did not complete");
                let error = PlacementError::Interrupted(join_error.to_string());
                self.record(error.label(), None);
                Err(error)
            }
        }
    }

    pub async fn place_order(
        &self,
        request: &OrderRequest,
    ) -> Result<PlacementOutcome, PlacementError> {
        let started = Instant::now();
        let result = self.run(request).await;

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(error) => error.label(),
        };
        self.record(label, Some(started.elapsed()));

        result
    }

    async fn run(&self, request: &OrderRequest) -> Result<PlacementOutcome, PlacementError> {
        let order = Order::from_request(request).map_err(|e| {
            tracing::warn!(error = %e, "Rejecting invalid order request");
            e
        })?;
        let query = StockQuery::from_order(&order);

        tracing::debug!(
            order_id = %order.id,
            item_codes = query.len(),
            "Checking stock availability"
        );

        let op_timeout = self.settings.op_timeout;
        let checked = self
            .gate
            .execute(
                INVENTORY_DEPENDENCY,
                || self.stock_client.check_availability(&query, op_timeout),
                self.settings.gate_timeout,
            )
            .await;

        let stock = match checked {
            Ok(stock) => stock,
            Err(error) => {
                let reason = FallbackReason::from(&error);
                tracing::warn!(
                    order_id = %order.id,
                    reason = reason.as_str(),
                    error = %error,
                    "Stock check unavailable - returning fallback"
                );
                return Ok(PlacementOutcome::Degraded { reason });
            }
        };

        if let Some(item_code) = stock.first_unavailable(&query) {
            tracing::info!(
                order_id = %order.id,
                item_code = %item_code,
                "Order rejected - item out of stock"
            );
            return Ok(PlacementOutcome::OutOfStock {
                item_code: item_code.to_string(),
            });
        }

        self.persist(&order).await?;
        self.publish_in_background(&order);

        tracing::info!(
            order_id = %order.id,
            line_items = order.line_items.len(),
            total = order.total().map(tracing::field::display),
            "Order placed"
        );

        Ok(PlacementOutcome::Accepted { order_id: order.id })
    }

    async fn persist(&self, order: &Order) -> Result<(), StoreError> {
        let saved = tokio::time::timeout(self.settings.save_timeout, self.store.save(order)).await;

        let result = match saved {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "save did not finish within {}ms",
                self.settings.save_timeout.as_millis()
            ))),
        };

        if let Err(e) = &result {
            tracing::error!(order_id = %order.id, error = %e, "Failed to persist order");
        }
        result
    }

    /// Hand the event to the publisher on its own task. The response does
    /// not wait for broker acknowledgement or the publisher's retries.
    fn publish_in_background(&self, order: &Order) {
        let event = order.placed_event();
        let publisher = Arc::clone(&self.publisher);
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            match publisher.publish(&event).await {
                Ok(()) => {
                    tracing::debug!(order_id = %event.order_id, "OrderPlaced event published");
                    if let Some(metrics) = &metrics {
                        metrics.record_event_published(true);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        order_id = %event.order_id,
                        error = %e,
                        "Failed to publish OrderPlaced event - order remains accepted"
                    );
                    if let Some(metrics) = &metrics {
                        metrics.record_event_published(false);
                    }
                }
            }
        });
    }

    fn record(&self, outcome: &str, elapsed: Option<Duration>) {
        if let Some(metrics) = &self.metrics {
            let secs = elapsed.map(|d| d.as_secs_f64()).unwrap_or_default();
            metrics.record_placement(outcome, secs);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
