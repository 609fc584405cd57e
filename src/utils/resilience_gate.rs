use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::metrics::Metrics;
use super::circuit_breaker::{
    BreakerSnapshot, CallOutcome, CircuitBreaker, CircuitBreakerConfig,
};
use super::retry::IsTransient;

// ============================================================================
// Resilience Gate - circuit breaker + time limiter around one call
// ============================================================================
//
// execute(dependency, operation, timeout):
// 1. Ask the dependency's breaker for a permit (reject fast when Open)
// 2. Run the operation under a deadline; on expiry the future is dropped
// 3. Report success / failure / timeout back to the breaker
//
// Breakers are looked up in a process-wide registry keyed by dependency name.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GateError<E> {
    #[error("circuit breaker for '{dependency}' is open")]
    CircuitOpen { dependency: String },

    #[error("call to '{dependency}' timed out after {}ms", .after.as_millis())]
    TimedOut { dependency: String, after: Duration },

    #[error(transparent)]
    Operation(E),
}

/// Distinguishes a dependency client that hit its own deadline from any
/// other failure.
pub trait IsTimeout {
    fn is_timeout(&self) -> bool;
}

/// Timeouts and dependency errors are retried; an open circuit is not.
impl<E> IsTransient for GateError<E> {
    fn is_transient(&self) -> bool {
        !matches!(self, GateError::CircuitOpen { .. })
    }
}

/// Concurrency-safe map from dependency name to its breaker. Breakers are
/// created on first use and live until shutdown.
pub struct BreakerRegistry {
    default_config: CircuitBreakerConfig,
    overrides: HashMap<String, CircuitBreakerConfig>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    metrics: Option<Arc<Metrics>>,
}

impl BreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            default_config,
            overrides: HashMap::new(),
            breakers: RwLock::new(HashMap::new()),
            metrics: None,
        }
    }

    pub fn with_override(mut self, dependency: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.overrides.insert(dependency.into(), config);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub(crate) fn breaker(&self, dependency: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dependency)
        {
            return breaker.clone();
        }

        let mut breakers = self.breakers.write().unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                let config = self
                    .overrides
                    .get(dependency)
                    .cloned()
                    .unwrap_or_else(|| self.default_config.clone());

                tracing::debug!(
                    dependency = %dependency,
                    failure_rate_threshold = config.failure_rate_threshold,
                    "Registering circuit breaker"
                );

                let breaker = CircuitBreaker::new(dependency, config);
                let breaker = match &self.metrics {
                    Some(metrics) => breaker.with_metrics(metrics.clone()),
                    None => breaker,
                };
                Arc::new(breaker)
            })
            .clone()
    }

    /// Snapshots of every breaker created so far, sorted by name
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers = self.breakers.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshots: Vec<_> = breakers.values().map(|b| b.snapshot()).collect();
        drop(breakers);
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn snapshot(&self, dependency: &str) -> Option<BreakerSnapshot> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dependency)
            .map(|b| b.snapshot())
    }
}

pub struct ResilienceGate {
    registry: Arc<BreakerRegistry>,
    metrics: Option<Arc<Metrics>>,
}

impl ResilienceGate {
    pub fn new(registry: Arc<BreakerRegistry>) -> Self {
        Self {
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<BreakerRegistry> {
        &self.registry
    }

    /// Execute an operation with circuit breaker and time limiter protection.
    ///
    /// The operation is only constructed once a permit is granted, so a
    /// rejected call never touches the dependency. An operation error that
    /// reports `is_timeout` (a client that gave up at its own deadline) is
    /// recorded as a timeout and surfaces as `GateError::TimedOut`.
    pub async fn execute<F, Fut, T, E>(
        &self,
        dependency: &str,
        operation: F,
        timeout: Duration,
    ) -> Result<T, GateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display + IsTimeout,
    {
        let breaker = self.registry.breaker(dependency);

        let Some(permit) = breaker.try_acquire() else {
            tracing::warn!(dependency = %dependency, "Circuit breaker open - call rejected");
            self.record(dependency, "rejected", None);
            return Err(GateError::CircuitOpen {
                dependency: dependency.to_string(),
            });
        };

        let started = Instant::now();
        let result = tokio::time::timeout(timeout, operation()).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(value)) => {
                permit.record(CallOutcome::Success);
                self.record(dependency, CallOutcome::Success.as_str(), Some(elapsed));
                Ok(value)
            }
            Ok(Err(err)) if err.is_timeout() => {
                tracing::warn!(
                    dependency = %dependency,
                    error = %err,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Protected call gave up at the client deadline"
                );
                permit.record(CallOutcome::Timeout);
                self.record(dependency, CallOutcome::Timeout.as_str(), Some(elapsed));
                Err(GateError::TimedOut {
                    dependency: dependency.to_string(),
                    after: elapsed,
                })
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    dependency = %dependency,
                    error = %err,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Protected call failed"
                );
                permit.record(CallOutcome::Failure);
                self.record(dependency, CallOutcome::Failure.as_str(), Some(elapsed));
                Err(GateError::Operation(err))
            }
            Err(_) => {
                tracing::warn!(
                    dependency = %dependency,
                    timeout_ms = timeout.as_millis() as u64,
                    "Protected call abandoned at deadline"
                );
                permit.record(CallOutcome::Timeout);
                self.record(dependency, CallOutcome::Timeout.as_str(), Some(elapsed));
                Err(GateError::TimedOut {
                    dependency: dependency.to_string(),
                    after: timeout,
                })
            }
        }
    }

    fn record(&self, dependency: &str, result: &str, elapsed: Option<Duration>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_gate_call(dependency, result);
            if let Some(elapsed) = elapsed {
                metrics.observe_gate_duration(dependency, elapsed.as_secs_f64());
            }
        }
    }
}
