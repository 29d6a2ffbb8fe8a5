//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Controllers and the dispatcher produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (transition counters, work latency, running gauge)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Component name flows through every log line and metric label
//! - Metrics are cheap (no recorder installed means no work)

pub mod logging;
pub mod metrics;
