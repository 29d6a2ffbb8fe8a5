//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::task::JoinHandle;

use transport_lifecycle::lifecycle::LifecycleResult;
use transport_lifecycle::{BoxError, Lifecycle, LifecycleController, LifecycleState};

/// Build a work error from a message.
pub fn fail(msg: &'static str) -> BoxError {
    BoxError::from(msg)
}

/// Record every state a controller publishes until it reaches a terminal state.
pub fn record_states(controller: &LifecycleController) -> JoinHandle<Vec<LifecycleState>> {
    let mut rx = controller.subscribe();
    let initial = *rx.borrow_and_update();
    tokio::spawn(async move {
        let mut seen = vec![initial];
        if initial.is_terminal() {
            return seen;
        }
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            seen.push(state);
            if state.is_terminal() {
                break;
            }
        }
        seen
    })
}

/// Assert a sequence of observed states never goes backwards.
pub fn assert_monotonic(states: &[LifecycleState]) {
    for pair in states.windows(2) {
        assert!(
            pair[0].can_advance_to(pair[1]),
            "state went backwards: {:?} -> {:?} in {:?}",
            pair[0],
            pair[1],
            states
        );
    }
}

/// Shared, ordered log of lifecycle events.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of the first event equal to `event`.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// Component that writes `start:<name>` / `stop:<name>` into an `EventLog`.
pub struct RecordingComponent {
    name: String,
    lifecycle: LifecycleController,
    log: EventLog,
    delay: Duration,
    fail_start: bool,
    fail_stop: bool,
    start_runs: AtomicUsize,
}

impl RecordingComponent {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            lifecycle: LifecycleController::named(name),
            log: log.clone(),
            delay: Duration::ZERO,
            fail_start: false,
            fail_stop: false,
            start_runs: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn start_runs(&self) -> usize {
        self.start_runs.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Lifecycle for RecordingComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> BoxFuture<'_, LifecycleResult> {
        self.lifecycle
            .start(move || async move {
                self.start_runs.fetch_add(1, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.log.push(format!("start:{}", self.name));
                if self.fail_start {
                    return Err(fail("start refused"));
                }
                Ok(())
            })
            .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, LifecycleResult> {
        self.lifecycle
            .stop(move || async move {
                self.log.push(format!("stop:{}", self.name));
                if self.fail_stop {
                    return Err(fail("stop refused"));
                }
                Ok(())
            })
            .boxed()
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }
}
