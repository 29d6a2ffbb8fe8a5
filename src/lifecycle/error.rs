//! Lifecycle error definitions.

use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::state::LifecycleState;

/// Error type accepted from work closures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A work error shared by every caller that observes the same transition.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by a lifecycle controller.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// Start or stop work returned an error. Every caller resolving the
    /// transition receives a clone of the same `Arc`.
    #[error(transparent)]
    Work(SharedError),

    /// Start requested after stopping had begun.
    #[error("lifecycle already stopped")]
    AlreadyStopped,

    /// A bounded wait was requested without a deadline.
    #[error("deadline required to wait for running state")]
    DeadlineRequired,

    /// The deadline elapsed before the running state was reached.
    #[error("timed out waiting for running state, current state is {0}")]
    Timeout(LifecycleState),

    /// The task running the work was dropped before the work finished.
    #[error("lifecycle work interrupted before completion")]
    Interrupted,
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T = ()> = Result<T, LifecycleError>;

impl LifecycleError {
    /// Wrap a work failure.
    pub fn work(err: impl Into<BoxError>) -> Self {
        LifecycleError::Work(Arc::from(err.into()))
    }

    /// The underlying work error, if this is a work failure.
    pub fn work_error(&self) -> Option<&SharedError> {
        match self {
            LifecycleError::Work(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_already_stopped(&self) -> bool {
        matches!(self, LifecycleError::AlreadyStopped)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::Timeout(_))
    }
}

/// Work errors compare by identity: two values are equal when they came from
/// the same work invocation.
impl PartialEq for LifecycleError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LifecycleError::Work(a), LifecycleError::Work(b)) => Arc::ptr_eq(a, b),
            (LifecycleError::AlreadyStopped, LifecycleError::AlreadyStopped) => true,
            (LifecycleError::DeadlineRequired, LifecycleError::DeadlineRequired) => true,
            (LifecycleError::Timeout(a), LifecycleError::Timeout(b)) => a == b,
            (LifecycleError::Interrupted, LifecycleError::Interrupted) => true,
            _ => false,
        }
    }
}
