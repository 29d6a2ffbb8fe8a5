//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Component names are present and unique
//! - Value ranges (timeouts and periods > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DemoConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::DemoConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("dispatcher name must not be empty")]
    EmptyDispatcherName,

    #[error("dispatcher ready_timeout_ms must be greater than zero")]
    ZeroReadyTimeout,

    #[error("component #{0} has an empty name")]
    EmptyComponentName(usize),

    #[error("component name {0:?} is used more than once")]
    DuplicateComponentName(String),

    #[error("component {0:?} has heartbeat_ms = 0")]
    ZeroHeartbeat(String),

    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &DemoConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.dispatcher.name.trim().is_empty() {
        errors.push(ValidationError::EmptyDispatcherName);
    }
    if config.dispatcher.ready_timeout_ms == 0 {
        errors.push(ValidationError::ZeroReadyTimeout);
    }

    let mut seen = HashSet::new();
    for (index, component) in config.components.iter().enumerate() {
        if component.name.trim().is_empty() {
            errors.push(ValidationError::EmptyComponentName(index));
            continue;
        }
        if !seen.insert(component.name.as_str()) {
            errors.push(ValidationError::DuplicateComponentName(component.name.clone()));
        }
        if component.heartbeat_ms == 0 {
            errors.push(ValidationError::ZeroHeartbeat(component.name.clone()));
        }
    }

    let observability = &config.observability;
    if EnvFilter::try_new(&observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
