//! Once-only lifecycle controller for transports, inbounds and outbounds.

pub mod component;
pub mod config;
pub mod dispatcher;
pub mod lifecycle;
pub mod observability;

pub use component::{ComponentKind, Lifecycle};
pub use config::schema::DemoConfig;
pub use dispatcher::{Dispatcher, DispatcherError};
pub use lifecycle::{noop, BoxError, LifecycleController, LifecycleError, LifecycleState};
