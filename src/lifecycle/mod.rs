//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Component::start()
//!     → controller.rs (pick winner, run start work once)
//!     → state.rs (Idle → Starting → Running | Errored)
//!     → losers wake and observe the winner's result
//!
//! Component::stop()
//!     → controller.rs (pre-empt idle start or wait for in-flight start)
//!     → run stop work once (Running → Stopping → Stopped | Errored)
//!
//! Background tasks (shutdown.rs):
//!     stop work triggers Shutdown → subscribed loops exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ask the dispatcher to stop
//! ```
//!
//! # Design Decisions
//! - One controller per component, held by composition
//! - Work runs on the caller's task; the controller never spawns it
//! - Errors are recorded once and never retried

pub mod controller;
pub mod error;
pub mod shutdown;
pub mod signals;
pub mod state;

use std::future::{ready, Ready};

pub use controller::LifecycleController;
pub use error::{BoxError, LifecycleError, LifecycleResult, SharedError};
pub use shutdown::Shutdown;
pub use state::LifecycleState;

/// Work closure that always succeeds.
pub fn noop() -> Ready<Result<(), BoxError>> {
    ready(Ok(()))
}
