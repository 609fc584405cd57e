use actix_web::web;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod domain;
mod health;
mod inventory;
mod messaging;
mod metrics;
mod placement;
mod settings;
mod store;
mod utils;

#[cfg(test)]
mod testing;

use inventory::HttpStockClient;
use messaging::{KafkaEventPublisher, NOTIFICATION_DEPENDENCY};
use placement::{OrderPlacementCoordinator, INVENTORY_DEPENDENCY};
use settings::AppConfig;
use store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use utils::{BreakerRegistry, CircuitBreakerConfig, ResilienceGate};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_service=debug"))
        )
        .init();

    tracing::info!("🚀 Starting order service");

    // === 1. Configuration ===
    let config = AppConfig::load()?;
    tracing::info!(
        inventory = %config.inventory.base_url,
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        "Configuration loaded"
    );

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Resilience gate shared by every outbound dependency ===
    let registry = BreakerRegistry::new(CircuitBreakerConfig::default())
        .with_override(INVENTORY_DEPENDENCY, config.inventory.breaker.to_breaker_config())
        .with_override(NOTIFICATION_DEPENDENCY, config.kafka.breaker.to_breaker_config())
        .with_metrics(metrics.clone());
    let gate = Arc::new(ResilienceGate::new(Arc::new(registry)).with_metrics(metrics.clone()));

    // === 4. Collaborators ===
    let stock_client = Arc::new(HttpStockClient::new(&config.inventory.base_url)?);
    let store = connect_store(&config).await?;
    let publisher = Arc::new(
        KafkaEventPublisher::new(config.publisher_settings(), gate.clone())?
            .with_metrics(metrics.clone()),
    );

    // === 5. Placement workflow ===
    let coordinator = OrderPlacementCoordinator::new(
        gate,
        stock_client,
        store,
        publisher,
        config.placement_settings(),
    )
    .with_metrics(metrics.clone());
    let state = web::Data::new(api::AppState::new(Arc::new(coordinator)));

    // === 6. Serve ===
    let api_server = api::start_api_server(state, &config.server)?;
    let metrics_server = metrics::start_metrics_server(metrics.registry().clone(), config.metrics.port)?;

    futures_util::future::try_join(api_server, metrics_server).await?;

    tracing::info!("Order service stopped");
    Ok(())
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn OrderStore>> {
    match &config.store.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let store = PostgresOrderStore::connect(
                url,
                config.store.max_connections,
                Duration::from_millis(config.store.save_timeout_ms),
            )
            .await?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No store.database_url configured - orders are kept in memory");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
    }
}
