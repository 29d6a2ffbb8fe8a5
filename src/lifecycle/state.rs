//! Lifecycle state machine.
//!
//! # States
//! - Idle: constructed, nothing requested yet
//! - Starting: start work in flight
//! - Running: start work completed successfully
//! - Stopping: stop work in flight
//! - Stopped: stop work completed successfully
//! - Errored: start or stop work failed (absorbing)
//!
//! # State Transitions
//! ```text
//! Idle → Starting → Running → Stopping → Stopped
//! Idle → Stopping (stop pre-empts a start that never began)
//! Starting → Errored, Stopping → Errored
//! ```
//!
//! # Design Decisions
//! - Declaration order is progress order, so `Ord` doubles as the
//!   monotonicity check
//! - Terminal states are never left

use serde::Serialize;
use std::fmt;

/// Coarse, observable state of a lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Errored,
}

impl LifecycleState {
    /// All states in progress order.
    pub const ALL: [LifecycleState; 6] = [
        LifecycleState::Idle,
        LifecycleState::Starting,
        LifecycleState::Running,
        LifecycleState::Stopping,
        LifecycleState::Stopped,
        LifecycleState::Errored,
    ];

    /// Stable label used in log fields and metric labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Errored => "errored",
        }
    }

    /// True once no further transition can happen.
    pub const fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Errored)
    }

    /// True while the object has been asked to be live and has not finished dying.
    pub const fn is_live(self) -> bool {
        matches!(
            self,
            LifecycleState::Starting | LifecycleState::Running | LifecycleState::Stopping
        )
    }

    /// True once the start path can no longer change: start work has
    /// finished, was pre-empted, or stopping has begun.
    pub const fn start_resolved(self) -> bool {
        !matches!(self, LifecycleState::Idle | LifecycleState::Starting)
    }

    /// Whether moving from `self` to `next` respects the progress order.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        self <= next
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_order() {
        assert!(LifecycleState::Idle < LifecycleState::Starting);
        assert!(LifecycleState::Starting < LifecycleState::Running);
        assert!(LifecycleState::Running < LifecycleState::Stopping);
        assert!(LifecycleState::Stopping < LifecycleState::Stopped);
        assert!(LifecycleState::Stopping < LifecycleState::Errored);
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        assert!(LifecycleState::Stopped.can_advance_to(LifecycleState::Stopped));
        assert!(!LifecycleState::Stopped.can_advance_to(LifecycleState::Errored));
        assert!(!LifecycleState::Errored.can_advance_to(LifecycleState::Stopped));
        assert!(LifecycleState::Starting.can_advance_to(LifecycleState::Errored));
        assert!(!LifecycleState::Running.can_advance_to(LifecycleState::Starting));
    }

    #[test]
    fn test_liveness() {
        let live: Vec<_> = LifecycleState::ALL
            .into_iter()
            .filter(|s| s.is_live())
            .collect();
        assert_eq!(
            live,
            vec![
                LifecycleState::Starting,
                LifecycleState::Running,
                LifecycleState::Stopping
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecycleState::Stopping.to_string(), "stopping");
    }
}
