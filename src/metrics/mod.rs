// Private module declaration
mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order placements (outcome, latency)
// - Resilience gate calls per dependency (result, latency)
// - Circuit breaker state and transitions per dependency
// - Publisher retry attempts and outcomes
// - Order placed events (published / failed)
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the service
pub struct Metrics {
    registry: Registry,

    // Placement Metrics
    pub placements_total: IntCounterVec,
    pub placement_duration: HistogramVec,

    // Gate Metrics
    pub gate_calls_total: IntCounterVec,
    pub gate_call_duration: HistogramVec,

    // Circuit Breaker Metrics
    pub circuit_breaker_state: IntGaugeVec,
    pub circuit_breaker_transitions: IntCounterVec,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,
    pub retry_success: IntCounterVec,
    pub retry_failure: IntCounterVec,

    // Event Metrics
    pub events_published_total: IntCounter,
    pub events_publish_failures_total: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Placement Metrics
        let placements_total = IntCounterVec::new(
            Opts::new("order_placements_total", "Order placements by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(placements_total.clone()))?;

        let placement_duration = HistogramVec::new(
            HistogramOpts::new("order_placement_duration_seconds", "Order placement duration")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(placement_duration.clone()))?;

        // Gate Metrics
        let gate_calls_total = IntCounterVec::new(
            Opts::new("gate_calls_total", "Calls through the resilience gate"),
            &["dependency", "result"],
        )?;
        registry.register(Box::new(gate_calls_total.clone()))?;

        let gate_call_duration = HistogramVec::new(
            HistogramOpts::new("gate_call_duration_seconds", "Duration of permitted gate calls")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["dependency"],
        )?;
        registry.register(Box::new(gate_call_duration.clone()))?;

        // Circuit Breaker Metrics
        let circuit_breaker_state = IntGaugeVec::new(
            Opts::new(
                "circuit_breaker_state",
                "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
            ),
            &["dependency"],
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let circuit_breaker_transitions = IntCounterVec::new(
            Opts::new("circuit_breaker_transitions_total", "Circuit breaker state transitions"),
            &["dependency", "from_state", "to_state"],
        )?;
        registry.register(Box::new(circuit_breaker_transitions.clone()))?;

        // Retry Metrics
        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let retry_success = IntCounterVec::new(
            Opts::new("retry_success_total", "Total successful retried operations"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_success.clone()))?;

        let retry_failure = IntCounterVec::new(
            Opts::new("retry_failure_total", "Total operations that failed after all attempts"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_failure.clone()))?;

        // Event Metrics
        let events_published_total = IntCounter::new(
            "events_published_total",
            "Order placed events handed to the broker",
        )?;
        registry.register(Box::new(events_published_total.clone()))?;

        let events_publish_failures_total = IntCounter::new(
            "events_publish_failures_total",
            "Order placed events that could not be published",
        )?;
        registry.register(Box::new(events_publish_failures_total.clone()))?;

        Ok(Self {
            registry,
            placements_total,
            placement_duration,
            gate_calls_total,
            gate_call_duration,
            circuit_breaker_state,
            circuit_breaker_transitions,
            retry_attempts_total,
            retry_success,
            retry_failure,
            events_published_total,
            events_publish_failures_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_placement(&self, outcome: &str, duration_secs: f64) {
        self.placements_total.with_label_values(&[outcome]).inc();
        self.placement_duration.with_label_values(&[outcome]).observe(duration_secs);
    }

    /// `result` is one of success / failure / timeout / rejected
    pub fn record_gate_call(&self, dependency: &str, result: &str) {
        self.gate_calls_total.with_label_values(&[dependency, result]).inc();
    }

    pub fn observe_gate_duration(&self, dependency: &str, duration_secs: f64) {
        self.gate_call_duration.with_label_values(&[dependency]).observe(duration_secs);
    }

    /// Helper to update circuit breaker state
    pub fn update_circuit_breaker_state(&self, dependency: &str, state: u8) {
        self.circuit_breaker_state
            .with_label_values(&[dependency])
            .set(i64::from(state));
    }

    /// Helper to record circuit breaker transition
    pub fn record_circuit_breaker_transition(&self, dependency: &str, from_state: &str, to_state: &str) {
        self.circuit_breaker_transitions
            .with_label_values(&[dependency, from_state, to_state])
            .inc();
    }

    /// Helper to record retry attempt
    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        self.retry_attempts_total.with_label_values(&[operation, &attempt.to_string()]).inc();
    }

    /// Helper to record retry outcome
    pub fn record_retry_outcome(&self, operation: &str, success: bool) {
        if success {
            self.retry_success.with_label_values(&[operation]).inc();
        } else {
            self.retry_failure.with_label_values(&[operation]).inc();
        }
    }

    pub fn record_event_published(&self, success: bool) {
        if success {
            self.events_published_total.inc();
        } else {
            self.events_publish_failures_total.inc();
        }
    }
}
