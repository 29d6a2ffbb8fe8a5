//! Dispatcher error aggregation.

use thiserror::Error;

use crate::component::ComponentKind;
use crate::lifecycle::LifecycleError;

/// Lifecycle action a component failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Start => f.write_str("start"),
            Action::Stop => f.write_str("stop"),
        }
    }
}

/// Errors raised while starting or stopping a set of components.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A single component failed; its error is kept untouched as the source.
    #[error("{kind} {name:?} failed to {action}: {source}")]
    Component {
        kind: ComponentKind,
        name: String,
        action: Action,
        source: LifecycleError,
    },

    /// Several components failed in the same operation.
    #[error("{}", join_errors(.0))]
    Multiple(Vec<DispatcherError>),
}

fn join_errors(errors: &[DispatcherError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DispatcherError {
    /// Fold a list of errors into one: `None` when empty, the error itself
    /// when alone, otherwise a flattened `Multiple`.
    pub fn combine(errors: Vec<DispatcherError>) -> Option<DispatcherError> {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                DispatcherError::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(DispatcherError::Multiple(flat)),
        }
    }

    /// Find the dispatcher error carried by a lifecycle work failure.
    pub fn from_lifecycle(err: &LifecycleError) -> Option<&DispatcherError> {
        err.work_error()?.downcast_ref::<DispatcherError>()
    }

    /// Every component-level failure, in the order it was recorded.
    pub fn failures(&self) -> Vec<(&str, Action, &LifecycleError)> {
        match self {
            DispatcherError::Component {
                name,
                action,
                source,
                ..
            } => vec![(name.as_str(), *action, source)],
            DispatcherError::Multiple(errors) => {
                errors.iter().flat_map(DispatcherError::failures).collect()
            }
        }
    }
}
