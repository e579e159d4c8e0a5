//! Conflict detector: records overlapping scheduled work at the same
//! property or for the same staff member.

use super::{ErrorKind, lifecycle::store_error_kind};
use crate::task::{
    domain::{
        ConflictId, ConflictKind, ConflictPair, ConflictStatus, DomainEvent, PropertyId,
        SchedulingPolicy, Task, TaskConflictDetected, TaskId, TaskPair, TenantId, UserId,
    },
    ports::{EventBus, TaskStore, TaskStoreError, TaskStoreResult, TaskUnitOfWork},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Candidate interval submitted for conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictCandidate {
    tenant_id: TenantId,
    task_id: TaskId,
    scheduled_at: DateTime<Utc>,
    duration_minutes: Option<u32>,
}

impl ConflictCandidate {
    /// Creates a candidate for a task starting at `scheduled_at`.
    #[must_use]
    pub const fn new(tenant_id: TenantId, task_id: TaskId, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            task_id,
            scheduled_at,
            duration_minutes: None,
        }
    }

    /// Sets the candidate's duration; the scheduling default applies
    /// otherwise.
    #[must_use]
    pub const fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Builds a candidate from a stored task, or `None` when it is unscheduled.
    #[must_use]
    pub fn for_task(task: &Task) -> Option<Self> {
        task.scheduled_at().map(|scheduled_at| Self {
            tenant_id: task.tenant_id(),
            task_id: task.id(),
            scheduled_at,
            duration_minutes: task.duration_minutes(),
        })
    }

    /// Candidate task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }
}

/// Population a candidate is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OverlapScope {
    Property(PropertyId),
    Staff(UserId),
}

impl OverlapScope {
    const fn kind(self) -> ConflictKind {
        match self {
            Self::Property(_) => ConflictKind::Property,
            Self::Staff(_) => ConflictKind::Staff,
        }
    }

    fn load(self, uow: &mut dyn TaskUnitOfWork, tenant_id: TenantId) -> TaskStoreResult<Vec<Task>> {
        match self {
            Self::Property(property_id) => uow.tasks_for_property(tenant_id, property_id),
            Self::Staff(staff_id) => uow.tasks_for_staff(tenant_id, staff_id),
        }
    }
}

/// Outcome of one detection pass.
#[derive(Debug, Default)]
pub(crate) struct Overlaps {
    /// Every active task overlapping the candidate.
    pub conflicting: Vec<TaskId>,
    /// Pairs recorded by this pass.
    pub recorded: Vec<TaskPair>,
}

/// Finds active tasks overlapping the candidate and records each pair not seen
/// before.
///
/// Existing pairs match regardless of kind or status, so acknowledged and
/// resolved conflicts are never re-raised.
pub(crate) fn record_overlaps(
    uow: &mut dyn TaskUnitOfWork,
    scope: OverlapScope,
    candidate: &ConflictCandidate,
    policy: SchedulingPolicy,
    clock: &impl Clock,
) -> TaskStoreResult<Overlaps> {
    let window = policy.window(candidate.scheduled_at, candidate.duration_minutes);
    let mut overlaps = Overlaps::default();

    for other in scope.load(uow, candidate.tenant_id)? {
        if other.status().is_terminal() {
            continue;
        }
        let Some(other_start) = other.scheduled_at() else {
            continue;
        };
        // Skips the candidate itself.
        let Ok(pair) = TaskPair::new(candidate.task_id, other.id()) else {
            continue;
        };
        if !window.overlaps(&policy.blocking_window(other_start, other.duration_minutes())) {
            continue;
        }

        overlaps.conflicting.push(other.id());
        if uow.find_conflict_for_pair(candidate.tenant_id, &pair)?.is_some() {
            continue;
        }
        uow.insert_conflict(&ConflictPair::detected(
            candidate.tenant_id,
            pair,
            scope.kind(),
            clock,
        ))?;
        overlaps.recorded.push(pair);
    }

    Ok(overlaps)
}

/// Service-level errors for conflict operations.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The conflict does not exist in tenant scope.
    #[error("conflict {0} not found")]
    NotFound(ConflictId),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl ConflictError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store(err) => store_error_kind(err),
        }
    }
}

/// Result type for conflict operations.
pub type ConflictResult<T> = Result<T, ConflictError>;

/// Detects, lists, and settles scheduling conflicts.
#[derive(Clone)]
pub struct ConflictDetector<S, B, C>
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

impl<S, B, C> ConflictDetector<S, B, C>
where
    S: TaskStore,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a detector.
    #[must_use]
    pub const fn new(store: Arc<S>, bus: Arc<B>, clock: Arc<C>, policy: SchedulingPolicy) -> Self {
        Self {
            store,
            bus,
            clock,
            policy,
        }
    }

    /// Records overlaps between the candidate and other active tasks at the
    /// property, announcing each newly recorded pair.
    ///
    /// Returns every overlapping task, including ones whose pair was
    /// already recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::Store`] when storage fails.
    #[tracing::instrument(
        skip_all,
        fields(task_id = %candidate.task_id, property_id = %property_id)
    )]
    pub async fn detect_property_conflicts(
        &self,
        candidate: ConflictCandidate,
        property_id: PropertyId,
    ) -> ConflictResult<Vec<TaskId>> {
        let overlaps = self
            .record(OverlapScope::Property(property_id), candidate)
            .await?;
        for pair in &overlaps.recorded {
            let Some(other) = pair.partner_of(candidate.task_id) else {
                continue;
            };
            self.bus
                .publish(DomainEvent::TaskConflictDetected(TaskConflictDetected {
                    task_id: candidate.task_id,
                    tenant_id: candidate.tenant_id,
                    conflicting_task_ids: vec![other],
                }))
                .await;
        }
        Ok(overlaps.conflicting)
    }

    /// Records overlaps between the candidate and other active tasks
    /// assigned to the same staff member.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::Store`] when storage fails.
    #[tracing::instrument(skip_all, fields(task_id = %candidate.task_id, staff_id = %staff_id))]
    pub async fn detect_staff_conflicts(
        &self,
        candidate: ConflictCandidate,
        staff_id: UserId,
    ) -> ConflictResult<Vec<TaskId>> {
        let overlaps = self.record(OverlapScope::Staff(staff_id), candidate).await?;
        Ok(overlaps.conflicting)
    }

    /// Re-reads a freshly created task and checks it against its property
    /// and, when assigned, its staff member.
    ///
    /// Unscheduled or missing tasks are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::Store`] when storage fails.
    pub async fn check_created_task(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> ConflictResult<()> {
        let Some(task) = self.load_task(tenant_id, task_id).await? else {
            return Ok(());
        };
        let Some(candidate) = ConflictCandidate::for_task(&task) else {
            return Ok(());
        };
        self.detect_property_conflicts(candidate, task.property_id())
            .await?;
        if let Some(staff_id) = task.assigned_to() {
            self.detect_staff_conflicts(candidate, staff_id).await?;
        }
        Ok(())
    }

    /// Re-reads a newly assigned task and checks it against the assignee's
    /// other work.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::Store`] when storage fails.
    pub async fn check_assigned_task(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> ConflictResult<()> {
        let Some(task) = self.load_task(tenant_id, task_id).await? else {
            return Ok(());
        };
        if let (Some(candidate), Some(staff_id)) =
            (ConflictCandidate::for_task(&task), task.assigned_to())
        {
            self.detect_staff_conflicts(candidate, staff_id).await?;
        }
        Ok(())
    }

    /// Marks a detected conflict as acknowledged.
    ///
    /// Returns `false` when the conflict is missing or no longer in the
    /// detected status.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::Store`] when storage fails.
    pub async fn acknowledge(
        &self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
    ) -> ConflictResult<bool> {
        let clock = Arc::clone(&self.clock);
        self.store
            .transaction(move |uow| -> ConflictResult<bool> {
                let Some(mut conflict) = uow.find_conflict(tenant_id, conflict_id)? else {
                    return Ok(false);
                };
                if !conflict.acknowledge(clock.as_ref()) {
                    return Ok(false);
                }
                uow.update_conflict(&conflict)?;
                Ok(true)
            })
            .await
    }

    /// Resolves an open conflict with a free-text resolution.
    ///
    /// Returns the conflict as stored; resolving twice keeps the first
    /// resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::NotFound`] for an unknown conflict.
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
        resolution: impl Into<String>,
    ) -> ConflictResult<ConflictPair> {
        let resolution = resolution.into();
        let clock = Arc::clone(&self.clock);
        self.store
            .transaction(move |uow| -> ConflictResult<ConflictPair> {
                let mut conflict = uow
                    .find_conflict(tenant_id, conflict_id)?
                    .ok_or(ConflictError::NotFound(conflict_id))?;
                if conflict.resolve(resolution, clock.as_ref()) {
                    uow.update_conflict(&conflict)?;
                }
                Ok(conflict)
            })
            .await
    }

    /// Lists a tenant's conflicts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::Store`] when storage fails.
    pub async fn list_conflicts(
        &self,
        tenant_id: TenantId,
        status: Option<ConflictStatus>,
    ) -> ConflictResult<Vec<ConflictPair>> {
        self.store
            .transaction(move |uow| -> ConflictResult<_> {
                Ok(uow.list_conflicts(tenant_id, status)?)
            })
            .await
    }

    async fn record(
        &self,
        scope: OverlapScope,
        candidate: ConflictCandidate,
    ) -> ConflictResult<Overlaps> {
        let clock = Arc::clone(&self.clock);
        let policy = self.policy;
        let overlaps = self
            .store
            .transaction(move |uow| -> ConflictResult<Overlaps> {
                Ok(record_overlaps(uow, scope, &candidate, policy, clock.as_ref())?)
            })
            .await?;
        if !overlaps.recorded.is_empty() {
            tracing::info!(
                recorded = overlaps.recorded.len(),
                overlapping = overlaps.conflicting.len(),
                "conflicts recorded"
            );
        }
        Ok(overlaps)
    }

    async fn load_task(&self, tenant_id: TenantId, task_id: TaskId) -> ConflictResult<Option<Task>> {
        self.store
            .transaction(move |uow| -> ConflictResult<_> { Ok(uow.find_task(tenant_id, task_id)?) })
            .await
    }
}
