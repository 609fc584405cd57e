use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::metrics::Metrics;

// ============================================================================
// Circuit Breaker Pattern Implementation
// ============================================================================
//
// Prevents cascading failures by tracking call outcomes per dependency and
// temporarily blocking calls when the dependency looks unhealthy.
//
// States:
// - Closed: calls pass through, outcomes feed a rolling window
// - Open: failure rate reached the threshold, calls rejected until open_until
// - HalfOpen: a bounded number of trial calls decide Closed vs Open
//
// All state lives behind one mutex. Critical sections are short and never
// span an await, so the breaker is never locked while a call is in flight.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,     // Normal operation
    Open,       // Blocking requests
    HalfOpen,   // Testing recovery
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }

    /// Value exported on the `circuit_breaker_state` gauge
    pub fn gauge_value(self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much history the failure rate is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidingWindow {
    /// The last N recorded calls
    Count(u32),
    /// Calls recorded within the trailing duration
    Time(Duration),
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Open once failures / calls reaches this rate (0.0, 1.0]
    pub failure_rate_threshold: f64,
    pub sliding_window: SlidingWindow,
    /// Calls the window must hold before the rate is evaluated
    pub minimum_calls: u32,
    /// Cool-down spent in Open before trial calls are admitted
    pub open_duration: Duration,
    /// Trial calls allowed in flight while HalfOpen
    pub permitted_calls_in_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window: SlidingWindow::Count(10),
            minimum_calls: 5,
            open_duration: Duration::from_secs(5),
            permitted_calls_in_half_open: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    Timeout,
}

impl CallOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Timeout => "timeout",
        }
    }

    fn counts_as_failure(self) -> bool {
        !matches!(self, CallOutcome::Success)
    }
}

struct CircuitBreakerState {
    state: CircuitState,
    window: VecDeque<(Instant, CallOutcome)>,
    open_until: Option<Instant>,
    half_open_in_flight: u32,
    // Bumped on every transition; outcomes from an older generation are dropped
    generation: u64,
}

/// Point-in-time view used by health reporting
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_rate: f64,
    pub buffered_calls: usize,
    pub half_open_in_flight: u32,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<CircuitBreakerState>,
    metrics: Option<Arc<Metrics>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                window: VecDeque::new(),
                open_until: None,
                half_open_in_flight: 0,
                generation: 0,
            }),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        metrics.update_circuit_breaker_state(&self.name, CircuitState::Closed.gauge_value());
        self.metrics = Some(metrics);
        self
    }

    pub fn get_state(&self) -> CircuitState {
        self.lock().state
    }

    /// Ask for permission to make one call.
    ///
    /// Returns `None` while Open (or when every half-open trial slot is taken).
    /// An expired Open moves to HalfOpen here, on the first call after the
    /// cool-down.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut state = self.lock();
        let now = Instant::now();

        if state.state == CircuitState::Open {
            let open_until = state.open_until;
            match open_until {
                Some(until) if now >= until => {
                    self.transition(&mut state, CircuitState::HalfOpen, now);
                }
                _ => return None,
            }
        }

        let current = state.state;
        match current {
            CircuitState::Closed => Some(CallPermit::new(self, state.generation, false)),
            CircuitState::HalfOpen => {
                if state.half_open_in_flight < self.config.permitted_calls_in_half_open {
                    state.half_open_in_flight += 1;
                    Some(CallPermit::new(self, state.generation, true))
                } else {
                    None
                }
            }
            CircuitState::Open => None,
        }
    }

    fn on_outcome(&self, generation: u64, outcome: CallOutcome) {
        let mut state = self.lock();

        if state.generation != generation {
            tracing::debug!(
                dependency = %self.name,
                outcome = outcome.as_str(),
                "Discarding outcome admitted before the last transition"
            );
            return;
        }

        let now = Instant::now();
        let current = state.state;

        match current {
            CircuitState::Closed => {
                state.window.push_back((now, outcome));
                self.trim_window(&mut state.window, now);

                let calls = state.window.len();
                if calls == 0 || calls < self.config.minimum_calls as usize {
                    return;
                }

                let failure_rate = failure_rate(&state.window);
                if failure_rate >= self.config.failure_rate_threshold {
                    tracing::warn!(
                        dependency = %self.name,
                        failure_rate = failure_rate,
                        calls = calls,
                        "Failure rate threshold reached"
                    );
                    self.transition(&mut state, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
                if outcome == CallOutcome::Success {
                    self.transition(&mut state, CircuitState::Closed, now);
                } else {
                    tracing::warn!(
                        dependency = %self.name,
                        outcome = outcome.as_str(),
                        "Trial call failed during half-open, reopening circuit"
                    );
                    self.transition(&mut state, CircuitState::Open, now);
                }
            }
            CircuitState::Open => {
                tracing::warn!(dependency = %self.name, "Outcome recorded while circuit is open");
            }
        }
    }

    fn release_trial(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation && state.state == CircuitState::HalfOpen {
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
            tracing::debug!(dependency = %self.name, "Abandoned trial call released its slot");
        }
    }

    fn trim_window(&self, window: &mut VecDeque<(Instant, CallOutcome)>, now: Instant) {
        match self.config.sliding_window {
            SlidingWindow::Count(size) => {
                while window.len() > size as usize {
                    window.pop_front();
                }
            }
            SlidingWindow::Time(span) => {
                while let Some((recorded_at, _)) = window.front() {
                    if now.duration_since(*recorded_at) > span {
                        window.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: CircuitState, now: Instant) {
        let from = state.state;
        if from == to {
            return;
        }

        state.state = to;
        state.generation += 1;
        state.half_open_in_flight = 0;
        state.window.clear();
        state.open_until = match to {
            // An open duration past the clock's range keeps the circuit open until reset
            CircuitState::Open => now.checked_add(self.config.open_duration),
            CircuitState::Closed | CircuitState::HalfOpen => None,
        };

        match to {
            CircuitState::Open => tracing::warn!(
                dependency = %self.name,
                from = %from,
                to = %to,
                open_for_ms = self.config.open_duration.as_millis() as u64,
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                dependency = %self.name,
                from = %from,
                to = %to,
                "Circuit breaker admitting trial calls"
            ),
            CircuitState::Closed => tracing::info!(
                dependency = %self.name,
                from = %from,
                to = %to,
                "Circuit breaker closed"
            ),
        }

        if let Some(metrics) = &self.metrics {
            metrics.update_circuit_breaker_state(&self.name, to.gauge_value());
            metrics.record_circuit_breaker_transition(&self.name, from.as_str(), to.as_str());
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut state = self.lock();
        let now = Instant::now();
        self.trim_window(&mut state.window, now);

        BreakerSnapshot {
            name: self.name.clone(),
            state: state.state,
            failure_rate: failure_rate(&state.window),
            buffered_calls: state.window.len(),
            half_open_in_flight: state.half_open_in_flight,
        }
    }

    /// Force the circuit open (operator action or tests)
    pub fn force_open(&self) {
        let mut state = self.lock();
        self.transition(&mut state, CircuitState::Open, Instant::now());
    }

    /// Manually reset the circuit breaker
    pub fn reset(&self) {
        let mut state = self.lock();
        tracing::info!(dependency = %self.name, "Circuit breaker manually reset");
        self.transition(&mut state, CircuitState::Closed, Instant::now());
    }

    fn lock(&self) -> MutexGuard<'_, CircuitBreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn failure_rate(window: &VecDeque<(Instant, CallOutcome)>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let failures = window
        .iter()
        .filter(|(_, outcome)| outcome.counts_as_failure())
        .count();
    failures as f64 / window.len() as f64
}

// ============================================================================
// Call Permit
// ============================================================================

/// Permission for exactly one call. Record its outcome with [`CallPermit::record`];
/// dropping it unrecorded abandons the call (a half-open slot is freed, nothing
/// is counted).
#[must_use = "a permit must be recorded or it counts as an abandoned call"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64, trial: bool) -> Self {
        Self {
            breaker,
            generation,
            trial,
            settled: false,
        }
    }

    pub fn record(mut self, outcome: CallOutcome) {
        self.settled = true;
        self.breaker.on_outcome(self.generation, outcome);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial(self.generation);
        }
    }
}
