//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_transitions_total` (counter): transitions by component, state
//! - `lifecycle_work_duration_seconds` (histogram): start/stop work latency
//! - `lifecycle_running_components` (gauge): components currently `Running`
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; a no-op until a recorder is installed
//! - Prometheus exposition is opt-in from the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::state::LifecycleState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a state transition of a named component.
pub fn record_transition(component: &str, from: LifecycleState, to: LifecycleState) {
    counter!(
        "lifecycle_transitions_total",
        "component" => component.to_string(),
        "state" => to.as_str()
    )
    .increment(1);

    if to == LifecycleState::Running {
        gauge!("lifecycle_running_components").increment(1.0);
    } else if from == LifecycleState::Running {
        gauge!("lifecycle_running_components").decrement(1.0);
    }
}

/// Record how long a start or stop work closure took.
pub fn record_work_duration(component: &str, phase: &'static str, elapsed: Duration) {
    histogram!(
        "lifecycle_work_duration_seconds",
        "component" => component.to_string(),
        "phase" => phase
    )
    .record(elapsed.as_secs_f64());
}
