//! Reservation cascade: keeps generated work in step with reservation date
//! changes and cancellations.

use super::{
    ErrorKind,
    conflict::{ConflictCandidate, OverlapScope, record_overlaps},
    fusion::withdraw_holding_pair,
    lifecycle::store_error_kind,
};
use crate::task::{
    domain::{
        DomainEvent, FusionPairId, ReservationAuditAction, ReservationCancellation,
        ReservationChange, ReservationTaskAudit, SchedulingPolicy, Task, TaskConflictDetected,
        TaskId,
    },
    ports::{EventBus, TaskStore, TaskStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Note attached to tasks moved with their reservation.
pub const RESCHEDULED_NOTE: &str = "Auto-rescheduled after the reservation dates changed";

/// Note attached to tasks cancelled with their reservation.
pub const CANCELLED_NOTE: &str = "Auto-cancelled because the reservation was cancelled";

/// Outcome of cascading a reservation date change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescheduleOutcome {
    /// Tasks moved with the reservation.
    pub rescheduled_task_ids: Vec<TaskId>,
    /// Conflicts found for the moved tasks, as published.
    pub conflicts: Vec<TaskConflictDetected>,
}

/// Outcome of cascading a reservation cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// Tasks cancelled with the reservation.
    pub cancelled_task_ids: Vec<TaskId>,
    /// Tasks with work underway or an open incident, flagged for a human.
    pub alerted_task_ids: Vec<TaskId>,
    /// Pending fusions withdrawn because a member was cancelled.
    pub withdrawn_pair_ids: Vec<FusionPairId>,
}

/// Service-level errors for cascade operations.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Storage failed; no task or audit row was written.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl CascadeError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(err) => store_error_kind(err),
        }
    }
}

/// Result type for cascade operations.
pub type CascadeResult<T> = Result<T, CascadeError>;

/// Applies reservation changes to dependent tasks.
#[derive(Clone)]
pub struct ReservationCascadeHandler<S, B, C>
where
    S: TaskStore,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    bus: Arc<B>,
    clock: Arc<C>,
    policy: SchedulingPolicy,
}

impl<S, B, C> ReservationCascadeHandler<S, B, C>
where
    S: TaskStore,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a cascade handler.
    #[must_use]
    pub const fn new(store: Arc<S>, bus: Arc<B>, clock: Arc<C>, policy: SchedulingPolicy) -> Self {
        Self {
            store,
            bus,
            clock,
            policy,
        }
    }

    /// Moves every cascadable task of the reservation so its offset from
    /// check-in is preserved, then re-checks each moved task for property
    /// conflicts.
    ///
    /// Rescheduling, audit rows, and conflict records commit together.
    /// Unscheduled tasks keep no offset and are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::Store`] when storage fails; every write of
    /// the cascade is rolled back.
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = %change.tenant_id, reservation_id = %change.reservation_id)
    )]
    pub async fn on_updated(&self, change: ReservationChange) -> CascadeResult<RescheduleOutcome> {
        if !change.dates_changed() {
            tracing::debug!("reservation dates unchanged");
            return Ok(RescheduleOutcome::default());
        }

        let clock = Arc::clone(&self.clock);
        let policy = self.policy;
        let outcome = self
            .store
            .transaction(move |uow| -> CascadeResult<RescheduleOutcome> {
                let mut moved: Vec<Task> = Vec::new();
                for mut task in uow.tasks_for_reservation(change.tenant_id, change.reservation_id)? {
                    if !task.status().is_cascadable() {
                        continue;
                    }
                    let Some(scheduled_at) = task.scheduled_at() else {
                        continue;
                    };
                    task.reschedule(change.shift(scheduled_at), RESCHEDULED_NOTE, clock.as_ref());
                    uow.update_task(&task)?;
                    uow.insert_reservation_audit(&ReservationTaskAudit::rescheduled(
                        &change,
                        task.id(),
                        clock.as_ref(),
                    ))?;
                    moved.push(task);
                }

                let mut outcome = RescheduleOutcome::default();
                for task in &moved {
                    outcome.rescheduled_task_ids.push(task.id());
                    let Some(candidate) = ConflictCandidate::for_task(task) else {
                        continue;
                    };
                    let overlaps = record_overlaps(
                        uow,
                        OverlapScope::Property(task.property_id()),
                        &candidate,
                        policy,
                        clock.as_ref(),
                    )?;
                    if !overlaps.conflicting.is_empty() {
                        outcome.conflicts.push(TaskConflictDetected {
                            task_id: task.id(),
                            tenant_id: task.tenant_id(),
                            conflicting_task_ids: overlaps.conflicting,
                        });
                    }
                }
                Ok(outcome)
            })
            .await?;

        tracing::info!(
            rescheduled = outcome.rescheduled_task_ids.len(),
            conflicts = outcome.conflicts.len(),
            "reservation change cascaded"
        );
        for conflict in &outcome.conflicts {
            self.bus
                .publish(DomainEvent::TaskConflictDetected(conflict.clone()))
                .await;
        }
        Ok(outcome)
    }

    /// Cancels the reservation's pre-work tasks and flags the ones already
    /// underway.
    ///
    /// A task held for fusion has its pending pair withdrawn first, which
    /// returns both members to pending validation, and is then cancelled.
    /// In-progress and incident tasks keep their status and get an alert
    /// audit row. Terminal tasks are left untouched and get no audit row.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::Store`] when storage fails; every write of
    /// the cascade is rolled back.
    #[tracing::instrument(
        skip_all,
        fields(
            tenant_id = %cancellation.tenant_id,
            reservation_id = %cancellation.reservation_id
        )
    )]
    pub async fn on_cancelled(
        &self,
        cancellation: ReservationCancellation,
    ) -> CascadeResult<CancellationOutcome> {
        let clock = Arc::clone(&self.clock);
        let outcome = self
            .store
            .transaction(move |uow| -> CascadeResult<CancellationOutcome> {
                let mut outcome = CancellationOutcome::default();
                let linked =
                    uow.tasks_for_reservation(cancellation.tenant_id, cancellation.reservation_id)?;
                for mut task in linked {
                    if let Some(pair_id) = withdraw_holding_pair(uow, &task, clock.as_ref())? {
                        outcome.withdrawn_pair_ids.push(pair_id);
                        if let Some(released) = uow.find_task(task.tenant_id(), task.id())? {
                            task = released;
                        }
                    }
                    let action = if task.status().is_cascadable() {
                        task.cancel_with_note(CANCELLED_NOTE, clock.as_ref());
                        uow.update_task(&task)?;
                        outcome.cancelled_task_ids.push(task.id());
                        ReservationAuditAction::Cancelled
                    } else if !task.status().is_terminal() {
                        outcome.alerted_task_ids.push(task.id());
                        ReservationAuditAction::AlertInProgress
                    } else {
                        continue;
                    };
                    uow.insert_reservation_audit(&ReservationTaskAudit::cancellation(
                        &cancellation,
                        task.id(),
                        action,
                        clock.as_ref(),
                    ))?;
                }
                Ok(outcome)
            })
            .await?;

        if !outcome.withdrawn_pair_ids.is_empty() {
            tracing::info!(
                withdrawn = outcome.withdrawn_pair_ids.len(),
                "fusions withdrawn for cancelled reservation"
            );
        }
        if !outcome.alerted_task_ids.is_empty() {
            tracing::warn!(
                alerted = outcome.alerted_task_ids.len(),
                "work already underway on a cancelled reservation"
            );
        }
        tracing::info!(
            cancelled = outcome.cancelled_task_ids.len(),
            "reservation cancellation cascaded"
        );
        Ok(outcome)
    }
}
