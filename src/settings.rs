use serde::Deserialize;
use std::time::Duration;

use crate::messaging::PublisherSettings;
use crate::placement::PlacementSettings;
use crate::utils::{CircuitBreakerConfig, RetryConfig, SlidingWindow};

// ============================================================================
// Application Configuration
// ============================================================================
//
// Sources, later wins:
// 1. Built-in defaults
// 2. order-service.toml (optional) or the file named by ORDER_SERVICE_CONFIG
// 3. ORDER_SERVICE_<SECTION>__<KEY> environment variables
//
// Example: ORDER_SERVICE_INVENTORY__BREAKER__MINIMUM_CALLS=20
//
// ============================================================================

pub const CONFIG_PATH_ENV: &str = "ORDER_SERVICE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "order-service";
const ENV_PREFIX: &str = "ORDER_SERVICE";

/// Upper bound for breaker durations (one day)
const MAX_BREAKER_DURATION_MS: u64 = 86_400_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub inventory: InventoryConfig,
    pub store: StoreConfig,
    pub kafka: KafkaConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub base_url: String,
    /// Deadline for the HTTP request itself
    pub op_timeout_ms: u64,
    /// Deadline the gate enforces around the whole check
    pub gate_timeout_ms: u64,
    pub breaker: BreakerSettings,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8082".to_string(),
            op_timeout_ms: 2500,
            gate_timeout_ms: 3000,
            breaker: BreakerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// PostgreSQL URL. Orders are kept in memory when unset.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub save_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            save_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub message_timeout_ms: u64,
    pub retry: RetrySettings,
    pub breaker: BreakerSettings,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "127.0.0.1:9092".to_string(),
            topic: "notificationTopic".to_string(),
            message_timeout_ms: 5000,
            retry: RetrySettings::default(),
            breaker: BreakerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Count,
    Time,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Failure rate (0, 1] at or above which the breaker opens
    pub failure_rate_threshold: f64,
    pub sliding_window_type: WindowType,
    /// Number of calls kept for a count window
    pub sliding_window_size: u32,
    /// Age limit for a time window
    pub sliding_window_duration_ms: u64,
    pub minimum_calls: u32,
    pub open_duration_ms: u64,
    pub permitted_calls_in_half_open: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_type: WindowType::Count,
            sliding_window_size: 10,
            sliding_window_duration_ms: 60_000,
            minimum_calls: 5,
            open_duration_ms: 5000,
            permitted_calls_in_half_open: 3,
        }
    }
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        let sliding_window = match self.sliding_window_type {
            WindowType::Count => SlidingWindow::Count(self.sliding_window_size),
            WindowType::Time => {
                SlidingWindow::Time(Duration::from_millis(self.sliding_window_duration_ms))
            }
        };

        CircuitBreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window,
            minimum_calls: self.minimum_calls,
            open_duration: Duration::from_millis(self.open_duration_ms),
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 1.0) {
            return Err(invalid(format!(
                "{section}.failure_rate_threshold must be in (0, 1], got {}",
                self.failure_rate_threshold
            )));
        }
        if self.minimum_calls == 0 {
            return Err(invalid(format!("{section}.minimum_calls must be at least 1")));
        }
        if self.permitted_calls_in_half_open == 0 {
            return Err(invalid(format!(
                "{section}.permitted_calls_in_half_open must be at least 1"
            )));
        }
        if self.open_duration_ms == 0 || self.open_duration_ms > MAX_BREAKER_DURATION_MS {
            return Err(invalid(format!(
                "{section}.open_duration_ms must be in 1..={MAX_BREAKER_DURATION_MS}, got {}",
                self.open_duration_ms
            )));
        }
        match self.sliding_window_type {
            WindowType::Count if self.sliding_window_size == 0 => {
                Err(invalid(format!("{section}.sliding_window_size must be at least 1")))
            }
            WindowType::Count if self.minimum_calls > self.sliding_window_size => Err(invalid(
                format!(
                    "{section}.minimum_calls ({}) exceeds sliding_window_size ({})",
                    self.minimum_calls, self.sliding_window_size
                ),
            )),
            WindowType::Time
                if self.sliding_window_duration_ms == 0
                    || self.sliding_window_duration_ms > MAX_BREAKER_DURATION_MS =>
            {
                Err(invalid(format!(
                    "{section}.sliding_window_duration_ms must be in 1..={MAX_BREAKER_DURATION_MS}, got {}",
                    self.sliding_window_duration_ms
                )))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

impl AppConfig {
    /// Load from the default file and environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => config::File::with_name(&path).required(true),
            Err(_) => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(environment())
            .build()?;

        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.inventory.breaker.validate("inventory.breaker")?;
        self.kafka.breaker.validate("kafka.breaker")?;

        if self.inventory.base_url.trim().is_empty() {
            return Err(invalid("inventory.base_url must be set"));
        }
        if self.inventory.op_timeout_ms == 0 || self.inventory.gate_timeout_ms == 0 {
            return Err(invalid("inventory timeouts must be positive"));
        }
        if self.inventory.op_timeout_ms > self.inventory.gate_timeout_ms {
            return Err(invalid(format!(
                "inventory.op_timeout_ms ({}) exceeds inventory.gate_timeout_ms ({})",
                self.inventory.op_timeout_ms, self.inventory.gate_timeout_ms
            )));
        }
        if self.store.save_timeout_ms == 0 {
            return Err(invalid("store.save_timeout_ms must be positive"));
        }
        if self.store.max_connections == 0 {
            return Err(invalid("store.max_connections must be at least 1"));
        }
        if self.kafka.topic.trim().is_empty() {
            return Err(invalid("kafka.topic must be set"));
        }
        if self.kafka.message_timeout_ms == 0 {
            return Err(invalid("kafka.message_timeout_ms must be positive"));
        }
        if self.kafka.retry.max_attempts == 0 {
            return Err(invalid("kafka.retry.max_attempts must be at least 1"));
        }
        if self.kafka.retry.multiplier < 1.0 {
            return Err(invalid("kafka.retry.multiplier must be at least 1.0"));
        }
        if self.server.port == self.metrics.port {
            return Err(invalid(format!(
                "server.port and metrics.port are both {}",
                self.server.port
            )));
        }

        Ok(())
    }

    pub fn placement_settings(&self) -> PlacementSettings {
        PlacementSettings {
            op_timeout: Duration::from_millis(self.inventory.op_timeout_ms),
            gate_timeout: Duration::from_millis(self.inventory.gate_timeout_ms),
            save_timeout: Duration::from_millis(self.store.save_timeout_ms),
        }
    }

    pub fn publisher_settings(&self) -> PublisherSettings {
        PublisherSettings {
            brokers: self.kafka.brokers.clone(),
            topic: self.kafka.topic.clone(),
            message_timeout: Duration::from_millis(self.kafka.message_timeout_ms),
            retry: self.kafka.retry.to_retry_config(),
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
