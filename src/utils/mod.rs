pub mod circuit_breaker;
pub mod resilience_gate;
pub mod retry;

pub use circuit_breaker::{
    BreakerSnapshot, CallOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitState, SlidingWindow,
};
pub use resilience_gate::{BreakerRegistry, GateError, IsTimeout, ResilienceGate};
pub use retry::{retry_on_transient, IsTransient, RetryConfig, RetryResult};
