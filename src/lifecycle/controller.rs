//! Once-only start/stop controller.
//!
//! # Responsibilities
//! - Pick exactly one winner per transition and run its work once
//! - Park losing callers until the winner's work has completed
//! - Fan the winner's result out to every current and future caller
//! - Let `stop` pre-empt a `start` that has not begun
//!
//! # Design Decisions
//! - State lives in a `watch` channel: `send_if_modified` is the
//!   compare-and-swap, `wait_for` is the broadcast wake-up
//! - Errors are written once into `OnceLock`s before `Errored` is published
//! - A caller that starts after stopping has begun gets the recorded error,
//!   or `AlreadyStopped`
//! - A stop winner dropped before `Stopping` is published releases its claim
//!   and publishes nothing; the next stop caller takes over
//! - Dropping a winning caller mid-work resolves the controller as
//!   `Errored(Interrupted)` so nobody waits forever

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Instant as StdInstant;

use tokio::sync::watch;
use tokio::time::{self, Duration, Instant};

use crate::lifecycle::error::{BoxError, LifecycleError, LifecycleResult};
use crate::lifecycle::state::LifecycleState;
use crate::observability::metrics;

/// Which transition a piece of work belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Stop,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }
}

/// Embeddable once-only lifecycle.
///
/// Components hold one of these and delegate their own `start`/`stop`/
/// `is_running` to it, passing their setup and teardown as work closures.
///
/// ```ignore
/// let lifecycle = LifecycleController::named("http-inbound");
/// lifecycle.start(|| async { bind().await.map_err(Into::into) }).await?;
/// assert!(lifecycle.is_running());
/// lifecycle.stop(noop).await?;
/// ```
#[derive(Debug)]
pub struct LifecycleController {
    /// Name used in log fields and metric labels.
    name: String,
    /// Current state; also the broadcast channel losers wait on.
    state: watch::Sender<LifecycleState>,
    /// Set by the single stop winner before it touches the state.
    stop_requested: AtomicBool,
    start_error: OnceLock<LifecycleError>,
    stop_error: OnceLock<LifecycleError>,
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::named("unnamed")
    }
}

impl LifecycleController {
    /// Create an idle, unnamed controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle controller that reports under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            name: name.into(),
            state,
            stop_requested: AtomicBool::new(false),
            start_error: OnceLock::new(),
            stop_error: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-blocking snapshot of the current state.
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// True while starting, running or stopping.
    pub fn is_running(&self) -> bool {
        self.state().is_live()
    }

    /// Receiver that observes every transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Run `work` once to bring the controller to `Running`.
    ///
    /// The first caller out of `Idle` runs `work`; everyone else waits for it
    /// and returns the same result. Once stopping has begun, `work` is never
    /// run and the call reports the stop resolution instead.
    pub async fn start<F, Fut>(&self, work: F) -> LifecycleResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), BoxError>>,
    {
        loop {
            let won = self
                .advance(LifecycleState::Starting, |current| {
                    current == LifecycleState::Idle && !self.stop_requested.load(Ordering::SeqCst)
                })
                .is_ok();
            if won {
                return self.run_start(work).await;
            }

            if !self.stop_requested.load(Ordering::SeqCst) {
                self.wait_until(|state| state.start_resolved()).await;
                return match self.start_error.get() {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                };
            }

            // A stop abandoned before its work began releases the claim;
            // re-evaluate as if it never happened.
            if self.wait_for_stop().await.is_terminal() {
                return Err(self
                    .recorded_error()
                    .unwrap_or(LifecycleError::AlreadyStopped));
            }
        }
    }

    /// Run `work` once to bring the controller to `Stopped`.
    ///
    /// The first caller wins. It first settles the start path: an idle
    /// controller is pre-empted, an in-flight start is waited for. A failed
    /// start resolves the stop with the same error without running `work`.
    ///
    /// Dropping the winning call while it waits for an in-flight start
    /// publishes nothing; the next `stop` caller takes over.
    pub async fn stop<F, Fut>(&self, work: F) -> LifecycleResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), BoxError>>,
    {
        if !self.claim_stop().await {
            return self.stop_outcome();
        }
        let claim = StopClaim::hold(self);

        if let Err(observed) =
            self.advance(LifecycleState::Stopping, |current| current == LifecycleState::Idle)
        {
            tracing::debug!(
                component = %self.name,
                state = %observed,
                "Stop waiting for start to resolve"
            );
            let resolved = self.wait_until(|state| state.start_resolved()).await;
            if resolved != LifecycleState::Running
                || self
                    .advance(LifecycleState::Stopping, |current| {
                        current == LifecycleState::Running
                    })
                    .is_err()
            {
                claim.commit();
                return self.stop_outcome();
            }
        } else {
            tracing::debug!(component = %self.name, "Stop pre-empted start");
        }
        claim.commit();

        let guard = InFlight::arm(self, Phase::Stop);
        let started = StdInstant::now();
        let result = work().await;
        metrics::record_work_duration(&self.name, Phase::Stop.as_str(), started.elapsed());
        guard.disarm();

        match result {
            Ok(()) => {
                self.settle(LifecycleState::Stopped);
                Ok(())
            }
            Err(err) => Err(self.fail(Phase::Stop, LifecycleError::work(err))),
        }
    }

    /// Wait until the controller is running.
    ///
    /// Returns immediately with the recorded error, or `AlreadyStopped`, if
    /// the controller resolved past `Running` without getting there. A
    /// deadline is mandatory; `None` fails with `DeadlineRequired`.
    ///
    /// Any state past `Running` counts as missed: a waiter that only wakes
    /// after the controller moved on to `Stopping` or `Stopped` gets
    /// `AlreadyStopped`, even though the controller did run in between.
    pub async fn when_running(&self, deadline: Option<Instant>) -> LifecycleResult {
        let Some(deadline) = deadline else {
            return Err(LifecycleError::DeadlineRequired);
        };

        match time::timeout_at(
            deadline,
            self.wait_until(|state| state >= LifecycleState::Running),
        )
        .await
        {
            Ok(LifecycleState::Running) => Ok(()),
            Ok(_) => Err(self
                .recorded_error()
                .unwrap_or(LifecycleError::AlreadyStopped)),
            Err(_) => Err(LifecycleError::Timeout(self.state())),
        }
    }

    /// `when_running` with a deadline `timeout` from now.
    pub async fn wait_for_running(&self, timeout: Duration) -> LifecycleResult {
        self.when_running(Some(Instant::now() + timeout)).await
    }

    async fn run_start<F, Fut>(&self, work: F) -> LifecycleResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), BoxError>>,
    {
        let guard = InFlight::arm(self, Phase::Start);
        let started = StdInstant::now();
        let result = work().await;
        metrics::record_work_duration(&self.name, Phase::Start.as_str(), started.elapsed());
        guard.disarm();

        match result {
            Ok(()) => {
                self.settle(LifecycleState::Running);
                Ok(())
            }
            Err(err) => Err(self.fail(Phase::Start, LifecycleError::work(err))),
        }
    }

    /// Become the stop winner. Returns `false` once another caller's stop
    /// has resolved; loops when a previous winner abandoned its claim.
    async fn claim_stop(&self) -> bool {
        loop {
            if self
                .stop_requested
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
            if self.wait_for_stop().await.is_terminal() {
                return false;
            }
        }
    }

    /// Wait until the current stop resolves or its claim is released.
    async fn wait_for_stop(&self) -> LifecycleState {
        self.wait_until(|state| {
            state.is_terminal() || !self.stop_requested.load(Ordering::SeqCst)
        })
        .await
    }

    /// Give up a stop claim that never reached `Stopping` and wake waiters so
    /// they re-evaluate.
    fn release_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.state.send_modify(|_| {});
        tracing::debug!(component = %self.name, "Stop abandoned before its work began");
    }

    fn stop_outcome(&self) -> LifecycleResult {
        match self.recorded_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn recorded_error(&self) -> Option<LifecycleError> {
        self.start_error
            .get()
            .or_else(|| self.stop_error.get())
            .cloned()
    }

    /// Record `err` for `phase` and move to `Errored`. Returns the error that
    /// ended up recorded.
    fn fail(&self, phase: Phase, err: LifecycleError) -> LifecycleError {
        let slot = match phase {
            Phase::Start => &self.start_error,
            Phase::Stop => &self.stop_error,
        };
        let recorded = slot.get_or_init(|| err).clone();
        tracing::warn!(
            component = %self.name,
            phase = phase.as_str(),
            error = %recorded,
            "Lifecycle work failed"
        );
        self.settle(LifecycleState::Errored);
        recorded
    }

    /// Compare-and-swap: move to `next` if `allowed` accepts the current
    /// state. On refusal returns the state that was observed.
    fn advance(
        &self,
        next: LifecycleState,
        allowed: impl FnOnce(LifecycleState) -> bool,
    ) -> Result<(), LifecycleState> {
        let mut observed = LifecycleState::Idle;
        let moved = self.state.send_if_modified(|current| {
            observed = *current;
            if allowed(*current) {
                *current = next;
                true
            } else {
                false
            }
        });
        if moved {
            self.on_transition(observed, next);
            Ok(())
        } else {
            Err(observed)
        }
    }

    /// Move forward to `next` unless that would go backwards or leave a
    /// terminal state.
    fn settle(&self, next: LifecycleState) -> bool {
        self.advance(next, |current| current != next && current.can_advance_to(next))
            .is_ok()
    }

    fn on_transition(&self, from: LifecycleState, to: LifecycleState) {
        tracing::debug!(
            component = %self.name,
            from = %from,
            to = %to,
            "Lifecycle transition"
        );
        metrics::record_transition(&self.name, from, to);
    }

    async fn wait_until(&self, mut ready: impl FnMut(LifecycleState) -> bool) -> LifecycleState {
        let mut rx = self.state.subscribe();
        if let Ok(state) = rx.wait_for(|state| ready(*state)).await {
            return *state;
        }
        // The sender lives in `self`, so this only happens during teardown.
        self.state()
    }
}

/// Releases the stop claim if the winning stop caller is dropped before it
/// publishes `Stopping`.
struct StopClaim<'a> {
    controller: &'a LifecycleController,
    held: bool,
}

impl<'a> StopClaim<'a> {
    fn hold(controller: &'a LifecycleController) -> Self {
        Self {
            controller,
            held: true,
        }
    }

    fn commit(mut self) {
        self.held = false;
    }
}

impl Drop for StopClaim<'_> {
    fn drop(&mut self) {
        if self.held {
            self.controller.release_stop();
        }
    }
}

/// Resolves a transition as interrupted if the winning caller is dropped
/// while its work is running.
struct InFlight<'a> {
    controller: &'a LifecycleController,
    phase: Phase,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn arm(controller: &'a LifecycleController, phase: Phase) -> Self {
        Self {
            controller,
            phase,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller
                .fail(self.phase, LifecycleError::Interrupted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::noop;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_start_then_stop() {
        let lifecycle = LifecycleController::named("test");
        assert_eq!(lifecycle.state(), LifecycleState::Idle);
        assert!(!lifecycle.is_running());

        lifecycle.start(noop).await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        assert!(lifecycle.is_running());

        lifecycle.stop(noop).await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert!(!lifecycle.is_running());
    }

    #[tokio::test]
    async fn test_start_failure_is_recorded() {
        let lifecycle = LifecycleController::new();
        let err = lifecycle
            .start(|| async { Err(BoxError::from("bind failed")) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bind failed");
        assert_eq!(lifecycle.state(), LifecycleState::Errored);

        // Later calls see the same error and never rerun work.
        let again = lifecycle
            .start(|| async { Err(BoxError::from("start work reran")) })
            .await
            .unwrap_err();
        assert_eq!(again, err);

        let stopped = lifecycle
            .stop(|| async { Err(BoxError::from("stop work ran")) })
            .await
            .unwrap_err();
        assert_eq!(stopped, err);
    }

    #[tokio::test]
    async fn test_stop_failure_is_recorded() {
        let lifecycle = LifecycleController::new();
        lifecycle.start(noop).await.unwrap();
        let err = lifecycle
            .stop(|| async { Err(BoxError::from("close failed")) })
            .await
            .unwrap_err();
        assert_eq!(lifecycle.state(), LifecycleState::Errored);
        assert_eq!(lifecycle.stop(noop).await.unwrap_err(), err);
        assert_eq!(lifecycle.start(noop).await.unwrap_err(), err);
    }

    #[tokio::test]
    async fn test_stop_preempts_idle() {
        let lifecycle = LifecycleController::new();
        let ran = Arc::new(AtomicUsize::new(0));

        lifecycle.stop(noop).await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);

        let counter = ran.clone();
        let err = lifecycle
            .start(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(BoxError::from("should not run"))
            })
            .await
            .unwrap_err();
        assert!(err.is_already_stopped());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preempting_stop_failure() {
        let lifecycle = LifecycleController::new();
        let err = lifecycle
            .stop(|| async { Err(BoxError::from("flush failed")) })
            .await
            .unwrap_err();
        assert_eq!(lifecycle.state(), LifecycleState::Errored);
        assert_eq!(lifecycle.start(noop).await.unwrap_err(), err);
    }

    #[tokio::test]
    async fn test_when_running_requires_deadline() {
        let lifecycle = LifecycleController::new();
        lifecycle.start(noop).await.unwrap();
        assert_eq!(
            lifecycle.when_running(None).await.unwrap_err(),
            LifecycleError::DeadlineRequired
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_when_running_times_out() {
        let lifecycle = LifecycleController::new();
        let err = lifecycle
            .wait_for_running(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, LifecycleError::Timeout(LifecycleState::Idle));
    }

    #[tokio::test]
    async fn test_when_running_after_stop() {
        let lifecycle = LifecycleController::new();
        lifecycle.start(noop).await.unwrap();
        lifecycle.stop(noop).await.unwrap();
        assert!(lifecycle
            .wait_for_running(Duration::from_secs(1))
            .await
            .unwrap_err()
            .is_already_stopped());
    }

    #[tokio::test]
    async fn test_dropped_start_is_interrupted() {
        let lifecycle = LifecycleController::new();
        {
            let pending = lifecycle.start(|| std::future::pending::<Result<(), BoxError>>());
            tokio::pin!(pending);
            // Poll once so the work is in flight, then drop the caller.
            assert!(futures_util::poll!(pending.as_mut()).is_pending());
            assert_eq!(lifecycle.state(), LifecycleState::Starting);
        }
        assert_eq!(lifecycle.state(), LifecycleState::Errored);
        assert_eq!(
            lifecycle.start(noop).await.unwrap_err(),
            LifecycleError::Interrupted
        );
    }
}
