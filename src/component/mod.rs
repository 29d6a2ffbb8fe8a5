//! Managed components.
//!
//! # Responsibilities
//! - Define the uniform `Lifecycle` surface every transport, inbound and
//!   outbound exposes
//! - Classify components so the dispatcher can order them
//!
//! # Design Decisions
//! - Components compose a `LifecycleController`; nothing inherits behavior
//! - Boxed futures keep the trait object-safe so dispatchers can hold
//!   `Arc<dyn Lifecycle>`

pub mod simulated;

use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{LifecycleResult, LifecycleState};

pub use simulated::{SimulatedComponent, SimulatedError};

/// Role of a component; also its start phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Transport,
    Outbound,
    Inbound,
}

impl ComponentKind {
    /// Start order: transports first, inbounds last.
    pub const START_ORDER: [ComponentKind; 3] = [
        ComponentKind::Transport,
        ComponentKind::Outbound,
        ComponentKind::Inbound,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Transport => "transport",
            ComponentKind::Outbound => "outbound",
            ComponentKind::Inbound => "inbound",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start/stop surface shared by everything the dispatcher manages.
pub trait Lifecycle: Send + Sync {
    fn name(&self) -> &str;

    fn start(&self) -> BoxFuture<'_, LifecycleResult>;

    fn stop(&self) -> BoxFuture<'_, LifecycleResult>;

    fn state(&self) -> LifecycleState;

    fn is_running(&self) -> bool {
        self.state().is_live()
    }
}
