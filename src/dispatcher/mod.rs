//! Ordered start/stop of many components.
//!
//! # Data Flow
//! ```text
//! Dispatcher::start()
//!     → transports (concurrently) → outbounds → inbounds
//!     → a failed phase rolls back: every component is stopped
//!
//! Dispatcher::stop()
//!     → inbounds (concurrently) → outbounds → transports
//!     → every phase runs; errors are combined
//! ```
//!
//! # Design Decisions
//! - The dispatcher is itself a component: it embeds a `LifecycleController`
//!   and implements `Lifecycle`, so dispatchers nest
//! - Components inside a phase start concurrently; phases never overlap
//! - Stopping a component that never started pre-empts it

pub mod error;

use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use serde::Serialize;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::component::{ComponentKind, Lifecycle, SimulatedComponent};
use crate::config::schema::DemoConfig;
use crate::lifecycle::{BoxError, LifecycleController, LifecycleResult, LifecycleState};

pub use error::{Action, DispatcherError};

struct Registration {
    kind: ComponentKind,
    component: Arc<dyn Lifecycle>,
}

/// Point-in-time view of a dispatcher and its components.
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatus {
    pub id: Uuid,
    pub name: String,
    pub state: LifecycleState,
    pub components: Vec<ComponentStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub kind: ComponentKind,
    pub state: LifecycleState,
}

/// Collects components before the dispatcher is sealed.
pub struct DispatcherBuilder {
    name: String,
    components: Vec<Registration>,
}

impl DispatcherBuilder {
    pub fn component(mut self, kind: ComponentKind, component: Arc<dyn Lifecycle>) -> Self {
        self.components.push(Registration { kind, component });
        self
    }

    pub fn transport(self, component: Arc<dyn Lifecycle>) -> Self {
        self.component(ComponentKind::Transport, component)
    }

    pub fn outbound(self, component: Arc<dyn Lifecycle>) -> Self {
        self.component(ComponentKind::Outbound, component)
    }

    pub fn inbound(self, component: Arc<dyn Lifecycle>) -> Self {
        self.component(ComponentKind::Inbound, component)
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            id: Uuid::new_v4(),
            lifecycle: LifecycleController::named(self.name.clone()),
            name: self.name,
            components: self.components,
        }
    }
}

/// Owns transports, outbounds and inbounds and drives them in order.
pub struct Dispatcher {
    id: Uuid,
    name: String,
    lifecycle: LifecycleController,
    components: Vec<Registration>,
}

impl Dispatcher {
    pub fn builder(name: impl Into<String>) -> DispatcherBuilder {
        DispatcherBuilder {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Build a dispatcher of simulated components described by `config`.
    pub fn from_config(config: &DemoConfig) -> Self {
        config
            .components
            .iter()
            .fold(Dispatcher::builder(config.dispatcher.name.clone()), |builder, component| {
                let component = SimulatedComponent::new(component.clone());
                builder.component(component.kind(), Arc::new(component))
            })
            .build()
    }

    /// Random per-instance id, attached to every log line of this dispatcher.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Start every component, phase by phase. Runs once; concurrent and
    /// later callers share the result.
    pub async fn start(&self) -> LifecycleResult {
        self.lifecycle
            .start(|| async move { self.start_components().await.map_err(BoxError::from) })
            .instrument(self.span())
            .await
    }

    /// Stop every component in reverse phase order.
    pub async fn stop(&self) -> LifecycleResult {
        self.lifecycle
            .stop(|| async move { self.stop_components().await.map_err(BoxError::from) })
            .instrument(self.span())
            .await
    }

    /// Wait for the dispatcher to reach `Running`, bounded by `deadline`.
    pub async fn when_running(&self, deadline: Option<Instant>) -> LifecycleResult {
        self.lifecycle.when_running(deadline).await
    }

    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            id: self.id,
            name: self.name.clone(),
            state: self.state(),
            components: self
                .components
                .iter()
                .map(|registration| ComponentStatus {
                    name: registration.component.name().to_string(),
                    kind: registration.kind,
                    state: registration.component.state(),
                })
                .collect(),
        }
    }

    fn span(&self) -> tracing::Span {
        tracing::info_span!("dispatcher", id = %self.id, name = %self.name)
    }

    async fn start_components(&self) -> Result<(), DispatcherError> {
        for kind in ComponentKind::START_ORDER {
            let errors = self.run_phase(kind, Action::Start).await;
            if let Some(err) = DispatcherError::combine(errors) {
                tracing::warn!(phase = %kind, error = %err, "Start phase failed, rolling back");
                if let Err(rollback) = self.stop_components().await {
                    tracing::warn!(error = %rollback, "Rollback reported errors");
                }
                return Err(err);
            }
            tracing::info!(phase = %kind, "Phase started");
        }
        Ok(())
    }

    async fn stop_components(&self) -> Result<(), DispatcherError> {
        let mut errors = Vec::new();
        for kind in ComponentKind::START_ORDER.into_iter().rev() {
            let failed = self.run_phase(kind, Action::Stop).await;
            if failed.is_empty() {
                tracing::info!(phase = %kind, "Phase stopped");
            }
            errors.extend(failed);
        }
        match DispatcherError::combine(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn run_phase(&self, kind: ComponentKind, action: Action) -> Vec<DispatcherError> {
        let calls = self
            .components
            .iter()
            .filter(|registration| registration.kind == kind)
            .map(|registration| async move {
                let component = &registration.component;
                let result = match action {
                    Action::Start => component.start().await,
                    Action::Stop => component.stop().await,
                };
                result.map_err(|source| DispatcherError::Component {
                    kind,
                    name: component.name().to_string(),
                    action,
                    source,
                })
            });

        join_all(calls)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }
}

impl Lifecycle for Dispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> BoxFuture<'_, LifecycleResult> {
        Dispatcher::start(self).boxed()
    }

    fn stop(&self) -> BoxFuture<'_, LifecycleResult> {
        Dispatcher::stop(self).boxed()
    }

    fn state(&self) -> LifecycleState {
        Dispatcher::state(self)
    }
}
