//! Engine assembly: builds every service over shared ports and wires their
//! event reactions.

use super::{
    AutoGenerationEvaluator, AutoGenerationSubscriber, CascadeSubscriber, ConflictDetector,
    ConflictSubscriber, FusionEngine, FusionSubscriber, ReservationCascadeHandler,
    TaskLifecycleService,
};
use crate::config::EngineConfig;
use crate::task::{
    domain::EventKind,
    ports::{EventBus, StaffDirectory, TaskStore},
};
use mockable::Clock;
use std::sync::Arc;

/// The assembled task engine.
///
/// Services share one store, one bus, and one clock. Call
/// [`TaskEngine::register_subscribers`] once so that task creation,
/// assignment, and reservation events reach conflict detection, fusion,
/// the cascade, and auto-generation.
pub struct TaskEngine<S, D, B, C>
where
    S: TaskStore + 'static,
    D: StaffDirectory,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    bus: Arc<B>,
    lifecycle: Arc<TaskLifecycleService<S, D, B, C>>,
    conflicts: Arc<ConflictDetector<S, B, C>>,
    fusion: Arc<FusionEngine<S, B, C>>,
    cascade: Arc<ReservationCascadeHandler<S, B, C>>,
    autogen: Arc<AutoGenerationEvaluator<S, B, C>>,
}

impl<S, D, B, C> TaskEngine<S, D, B, C>
where
    S: TaskStore + 'static,
    D: StaffDirectory,
    B: EventBus + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Builds every service from the shared ports and configuration.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        bus: Arc<B>,
        clock: Arc<C>,
        config: &EngineConfig,
    ) -> Self {
        let scheduling = config.scheduling_policy();
        Self {
            lifecycle: Arc::new(TaskLifecycleService::new(
                Arc::clone(&store),
                directory,
                Arc::clone(&bus),
                Arc::clone(&clock),
            )),
            conflicts: Arc::new(ConflictDetector::new(
                Arc::clone(&store),
                Arc::clone(&bus),
                Arc::clone(&clock),
                scheduling,
            )),
            fusion: Arc::new(FusionEngine::new(
                Arc::clone(&store),
                Arc::clone(&bus),
                Arc::clone(&clock),
                config.fusion_policy(),
                scheduling,
            )),
            cascade: Arc::new(ReservationCascadeHandler::new(
                Arc::clone(&store),
                Arc::clone(&bus),
                Arc::clone(&clock),
                scheduling,
            )),
            autogen: Arc::new(AutoGenerationEvaluator::new(store, Arc::clone(&bus), clock)),
            bus,
        }
    }

    /// Subscribes every service reaction to the bus.
    ///
    /// Conflict detection sees a new task before fusion does, so overlaps
    /// are recorded against the task's original schedule.
    pub fn register_subscribers(&self) {
        let conflicts = Arc::new(ConflictSubscriber::new(Arc::clone(&self.conflicts)));
        self.bus.subscribe(EventKind::TaskCreated, conflicts.clone());
        self.bus.subscribe(EventKind::TaskAssigned, conflicts);

        self.bus.subscribe(
            EventKind::TaskCreated,
            Arc::new(FusionSubscriber::new(Arc::clone(&self.fusion))),
        );

        let cascade = Arc::new(CascadeSubscriber::new(Arc::clone(&self.cascade)));
        self.bus.subscribe(EventKind::ReservationUpdated, cascade.clone());
        self.bus.subscribe(EventKind::ReservationCancelled, cascade);

        self.bus.subscribe(
            EventKind::ReservationCreated,
            Arc::new(AutoGenerationSubscriber::new(Arc::clone(&self.autogen))),
        );
        tracing::debug!("engine subscribers registered");
    }

    /// Event bus shared by the services.
    #[must_use]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Task lifecycle service.
    #[must_use]
    pub fn lifecycle(&self) -> &TaskLifecycleService<S, D, B, C> {
        &self.lifecycle
    }

    /// Conflict detector.
    #[must_use]
    pub fn conflicts(&self) -> &ConflictDetector<S, B, C> {
        &self.conflicts
    }

    /// Fusion engine.
    #[must_use]
    pub fn fusion(&self) -> &FusionEngine<S, B, C> {
        &self.fusion
    }

    /// Reservation cascade handler.
    #[must_use]
    pub fn cascade(&self) -> &ReservationCascadeHandler<S, B, C> {
        &self.cascade
    }

    /// Auto-generation evaluator.
    #[must_use]
    pub fn autogen(&self) -> &AutoGenerationEvaluator<S, B, C> {
        &self.autogen
    }
}
