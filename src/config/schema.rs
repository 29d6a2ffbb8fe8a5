//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the demo dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Dispatcher identity and readiness settings.
    pub dispatcher: DispatcherConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Components the dispatcher manages.
    pub components: Vec<ComponentConfig>,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Name used in logs and metric labels.
    pub name: String,

    /// How long to wait for the dispatcher to report running, in milliseconds.
    pub ready_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "dispatcher".to_string(),
            ready_timeout_ms: 5_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (e.g. "info", "transport_lifecycle=debug").
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A simulated component.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComponentConfig {
    /// Unique component name.
    pub name: String,

    /// Role, which decides the start phase.
    pub kind: ComponentKind,

    /// Time spent in start work, in milliseconds.
    #[serde(default)]
    pub start_delay_ms: u64,

    /// Time spent in stop work, in milliseconds.
    #[serde(default)]
    pub stop_delay_ms: u64,

    /// Make start work fail.
    #[serde(default)]
    pub fail_start: bool,

    /// Make stop work fail.
    #[serde(default)]
    pub fail_stop: bool,

    /// Heartbeat period of the background loop, in milliseconds.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

fn default_heartbeat_ms() -> u64 {
    1_000
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ComponentKind::Transport,
            start_delay_ms: 0,
            stop_delay_ms: 0,
            fail_start: false,
            fail_stop: false,
            heartbeat_ms: default_heartbeat_ms(),
        }
    }
}
