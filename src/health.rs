use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::{BreakerRegistry, BreakerSnapshot, CircuitState};

// ============================================================================
// Health - aggregate view over the dependency breakers
// ============================================================================
//
// Each breaker is one component. An open or half-open breaker degrades the
// service: placements still answer, but with the fallback.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            HealthStatus::Healthy => None,
            HealthStatus::Degraded(reason) => Some(reason),
        }
    }
}

impl From<&BreakerSnapshot> for HealthStatus {
    fn from(snapshot: &BreakerSnapshot) -> Self {
        match snapshot.state {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => {
                HealthStatus::Degraded("Circuit breaker half-open".to_string())
            }
            CircuitState::Open => HealthStatus::Degraded("Circuit breaker open".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub breaker_state: &'static str,
    pub failure_rate: f64,
    pub buffered_calls: usize,
    pub trial_calls_in_flight: u32,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    fn from_snapshot(snapshot: &BreakerSnapshot, checked_at: DateTime<Utc>) -> (Self, HealthStatus) {
        let status = HealthStatus::from(snapshot);
        let component = Self {
            name: snapshot.name.clone(),
            status: status.as_str(),
            reason: status.reason().map(str::to_string),
            breaker_state: snapshot.state.as_str(),
            failure_rate: snapshot.failure_rate,
            buffered_calls: snapshot.buffered_calls,
            trial_calls_in_flight: snapshot.half_open_in_flight,
            last_check: checked_at,
        };
        (component, status)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub components: Vec<ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

impl SystemHealth {
    pub fn from_registry(registry: &BreakerRegistry) -> Self {
        let check_time = Utc::now();
        let (components, statuses): (Vec<_>, Vec<_>) = registry
            .snapshots()
            .iter()
            .map(|snapshot| ComponentHealth::from_snapshot(snapshot, check_time))
            .unzip();

        let overall = compute_overall_status(&components, &statuses);

        Self {
            status: overall.as_str(),
            reason: overall.reason().map(str::to_string),
            components,
            check_time,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy.as_str()
    }
}

fn compute_overall_status(components: &[ComponentHealth], statuses: &[HealthStatus]) -> HealthStatus {
    let degraded: Vec<String> = components
        .iter()
        .zip(statuses)
        .filter_map(|(component, status)| match status {
            HealthStatus::Degraded(msg) => Some(format!("{}: {}", component.name, msg)),
            HealthStatus::Healthy => None,
        })
        .collect();

    if degraded.is_empty() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded(degraded.join(", "))
    }
}
