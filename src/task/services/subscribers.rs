//! Event bus reactions wiring the services together.
//!
//! Each subscriber re-reads state through its service rather than trusting
//! event payloads, and reports failures to the bus, which logs them.

use super::{
    AutoGenerationEvaluator, ConflictDetector, FusionEngine, ReservationCascadeHandler,
};
use crate::task::{
    domain::DomainEvent,
    ports::{EventBus, EventHandler, EventHandlerError, TaskStore},
};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;

/// Runs conflict detection for created and assigned tasks.
pub struct ConflictSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    detector: Arc<ConflictDetector<S, B, C>>,
}

impl<S, B, C> ConflictSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wraps a detector.
    #[must_use]
    pub const fn new(detector: Arc<ConflictDetector<S, B, C>>) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl<S, B, C> EventHandler for ConflictSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "conflict-detector"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), EventHandlerError> {
        let outcome = match event {
            DomainEvent::TaskCreated(created) => {
                self.detector
                    .check_created_task(created.tenant_id, created.task_id)
                    .await
            }
            DomainEvent::TaskAssigned(assigned) => {
                self.detector
                    .check_assigned_task(assigned.tenant_id, assigned.task_id)
                    .await
            }
            _ => Ok(()),
        };
        outcome.map_err(|err| EventHandlerError::new(self.name(), err))
    }
}

/// Proposes fusions for created tasks.
pub struct FusionSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    engine: Arc<FusionEngine<S, B, C>>,
}

impl<S, B, C> FusionSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wraps a fusion engine.
    #[must_use]
    pub const fn new(engine: Arc<FusionEngine<S, B, C>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<S, B, C> EventHandler for FusionSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "fusion-engine"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), EventHandlerError> {
        let DomainEvent::TaskCreated(created) = event else {
            return Ok(());
        };
        self.engine
            .propose(created.tenant_id, created.task_id)
            .await
            .map(|_| ())
            .map_err(|err| EventHandlerError::new(self.name(), err))
    }
}

/// Applies reservation updates and cancellations to dependent tasks.
pub struct CascadeSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    handler: Arc<ReservationCascadeHandler<S, B, C>>,
}

impl<S, B, C> CascadeSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wraps a cascade handler.
    #[must_use]
    pub const fn new(handler: Arc<ReservationCascadeHandler<S, B, C>>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<S, B, C> EventHandler for CascadeSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "reservation-cascade"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), EventHandlerError> {
        match event {
            DomainEvent::ReservationUpdated(change) => self
                .handler
                .on_updated(change.clone())
                .await
                .map(|_| ())
                .map_err(|err| EventHandlerError::new(self.name(), err)),
            DomainEvent::ReservationCancelled(cancellation) => self
                .handler
                .on_cancelled(cancellation.clone())
                .await
                .map(|_| ())
                .map_err(|err| EventHandlerError::new(self.name(), err)),
            _ => Ok(()),
        }
    }
}

/// Generates tasks for created reservations.
pub struct AutoGenerationSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    evaluator: Arc<AutoGenerationEvaluator<S, B, C>>,
}

impl<S, B, C> AutoGenerationSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wraps an evaluator.
    #[must_use]
    pub const fn new(evaluator: Arc<AutoGenerationEvaluator<S, B, C>>) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl<S, B, C> EventHandler for AutoGenerationSubscriber<S, B, C>
where
    S: TaskStore + 'static,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "auto-generation"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), EventHandlerError> {
        let DomainEvent::ReservationCreated(reservation) = event else {
            return Ok(());
        };
        self.evaluator
            .generate_tasks_for_reservation(reservation.clone())
            .await
            .map(|_| ())
            .map_err(|err| EventHandlerError::new(self.name(), err))
    }
}
