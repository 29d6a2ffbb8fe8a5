//! Configurable stand-in for a real transport.
//!
//! # Responsibilities
//! - Delay start/stop work to mimic binding sockets or draining consumers
//! - Fail start or stop on demand
//! - Run a heartbeat loop while live, torn down through `Shutdown`

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time;

use crate::component::{ComponentKind, Lifecycle};
use crate::config::schema::ComponentConfig;
use crate::lifecycle::{BoxError, LifecycleController, LifecycleResult, LifecycleState, Shutdown};

/// Failures injected by configuration.
#[derive(Debug, Error)]
pub enum SimulatedError {
    #[error("{0}: start refused")]
    StartRefused(String),

    #[error("{0}: stop refused")]
    StopRefused(String),
}

/// A component whose setup and teardown are driven by `ComponentConfig`.
#[derive(Debug)]
pub struct SimulatedComponent {
    config: ComponentConfig,
    lifecycle: LifecycleController,
    shutdown: Shutdown,
    heartbeats: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
    start_runs: AtomicUsize,
    stop_runs: AtomicUsize,
}

impl SimulatedComponent {
    pub fn new(config: ComponentConfig) -> Self {
        let lifecycle = LifecycleController::named(config.name.clone());
        Self {
            config,
            lifecycle,
            shutdown: Shutdown::new(),
            heartbeats: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
            start_runs: AtomicUsize::new(0),
            stop_runs: AtomicUsize::new(0),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.config.kind
    }

    /// Heartbeats emitted by the background loop so far.
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    /// How many times start work has actually run.
    pub fn start_runs(&self) -> usize {
        self.start_runs.load(Ordering::SeqCst)
    }

    /// How many times stop work has actually run.
    pub fn stop_runs(&self) -> usize {
        self.stop_runs.load(Ordering::SeqCst)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn bring_up(&self) -> Result<(), BoxError> {
        self.start_runs.fetch_add(1, Ordering::SeqCst);
        if self.config.start_delay_ms > 0 {
            time::sleep(Duration::from_millis(self.config.start_delay_ms)).await;
        }
        if self.config.fail_start {
            return Err(SimulatedError::StartRefused(self.config.name.clone()).into());
        }

        let mut shutdown_rx = self.shutdown.subscribe();
        let beats = self.heartbeats.clone();
        let period = Duration::from_millis(self.config.heartbeat_ms.max(1));
        let name = self.config.name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        beats.fetch_add(1, Ordering::Relaxed);
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!(component = %name, "Heartbeat loop exiting");
                        break;
                    }
                }
            }
        });
        *self.lock_worker() = Some(handle);

        tracing::info!(
            component = %self.config.name,
            kind = %self.config.kind,
            "Component started"
        );
        Ok(())
    }

    async fn tear_down(&self) -> Result<(), BoxError> {
        self.stop_runs.fetch_add(1, Ordering::SeqCst);
        if self.config.stop_delay_ms > 0 {
            time::sleep(Duration::from_millis(self.config.stop_delay_ms)).await;
        }

        let notified = self.shutdown.trigger();
        let worker = self.lock_worker().take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                tracing::warn!(component = %self.config.name, error = %e, "Heartbeat loop ended abnormally");
            }
        }
        tracing::debug!(component = %self.config.name, notified, "Background tasks drained");

        if self.config.fail_stop {
            return Err(SimulatedError::StopRefused(self.config.name.clone()).into());
        }
        tracing::info!(component = %self.config.name, "Component stopped");
        Ok(())
    }
}

impl Lifecycle for SimulatedComponent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn start(&self) -> BoxFuture<'_, LifecycleResult> {
        self.lifecycle.start(|| self.bring_up()).boxed()
    }

    fn stop(&self) -> BoxFuture<'_, LifecycleResult> {
        self.lifecycle.stop(|| self.tear_down()).boxed()
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> ComponentConfig {
        ComponentConfig {
            name: name.to_string(),
            kind: ComponentKind::Transport,
            heartbeat_ms: 10,
            ..ComponentConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_runs_while_live() {
        let component = SimulatedComponent::new(config("tcp"));
        component.start().await.unwrap();
        assert!(component.is_running());

        time::sleep(Duration::from_millis(55)).await;
        let beats = component.heartbeats();
        assert!(beats >= 5, "expected heartbeats, got {beats}");

        component.stop().await.unwrap();
        let after_stop = component.heartbeats();
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(component.heartbeats(), after_stop);
        assert_eq!(component.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_start_refusal_surfaces_error() {
        let component = SimulatedComponent::new(ComponentConfig {
            fail_start: true,
            ..config("grpc")
        });
        let err = component.start().await.unwrap_err();
        assert_eq!(err.to_string(), "grpc: start refused");
        let source = err.work_error().unwrap();
        assert!(source.downcast_ref::<SimulatedError>().is_some());
        assert_eq!(component.state(), LifecycleState::Errored);
    }

    #[tokio::test]
    async fn test_stop_before_start_runs_only_stop_work() {
        let component = SimulatedComponent::new(config("kafka"));
        component.stop().await.unwrap();
        assert!(component.start().await.unwrap_err().is_already_stopped());
        assert_eq!(component.start_runs(), 0);
        assert_eq!(component.stop_runs(), 1);
    }
}
