//! Fusion engine: proposes merging nearby pre-work tasks at one property,
//! and applies or discards the proposal.

use super::{ErrorKind, lifecycle::store_error_kind};
use crate::task::{
    domain::{
        DomainEvent, FusionPair, FusionPairId, FusionPolicy, FusionRejection, FusionStatus,
        NewTask, SchedulingPolicy, StatusTransition, Task, TaskAction, TaskCategory, TaskCreated,
        TaskDomainError, TaskHistoryEntry, TaskId, TaskPair, TaskStatus, TenantId,
        TransitionActor, UserId, fit_title,
    },
    ports::{EventBus, TaskStore, TaskStoreError, TaskStoreResult, TaskUnitOfWork},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of accepting a fusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionAcceptance {
    /// Turnover task replacing the originals.
    pub merged_task: Task,
    /// Originals retired by the merge, in canonical order.
    pub cancelled_task_ids: Vec<TaskId>,
}

/// Outcome of rejecting a fusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionRejectionOutcome {
    /// Tasks returned to pending validation.
    pub restored_task_ids: Vec<TaskId>,
}

/// Service-level errors for fusion operations.
#[derive(Debug, Error)]
pub enum FusionError {
    /// The fusion pair does not exist in tenant scope.
    #[error("fusion pair {0} not found")]
    NotFound(FusionPairId),

    /// The pair or its tasks moved on since the proposal.
    #[error("fusion pair {0} is no longer eligible")]
    NotEligible(FusionPairId),

    /// The merged task failed validation.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl FusionError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotEligible(_) => ErrorKind::NotEligible,
            Self::Domain(_) => ErrorKind::InvalidInput,
            Self::Store(err) => store_error_kind(err),
        }
    }
}

/// Result type for fusion operations.
pub type FusionResult<T> = Result<T, FusionError>;

/// Proposes, accepts, rejects, and withdraws task merges.
#[derive(Clone)]
pub struct FusionEngine<S, B, C>
where
    S: TaskStore,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    bus: Arc<B>,
    clock: Arc<C>,
    fusion: FusionPolicy,
    scheduling: SchedulingPolicy,
}

impl<S, B, C> FusionEngine<S, B, C>
where
    S: TaskStore,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a fusion engine.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        bus: Arc<B>,
        clock: Arc<C>,
        fusion: FusionPolicy,
        scheduling: SchedulingPolicy,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            fusion,
            scheduling,
        }
    }

    /// Pairs a scheduled pre-work task with the nearest eligible partner at
    /// its property and holds both for a decision.
    ///
    /// Partners are tried in order of start time, then identifier; pairs
    /// already declined or already proposed are skipped. Returns `None`
    /// when the task is unscheduled, not in a pre-work status, or has no
    /// partner within the window.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Store`] when storage fails.
    #[tracing::instrument(skip_all, fields(tenant_id = %tenant_id, task_id = %task_id))]
    pub async fn propose(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> FusionResult<Option<FusionPairId>> {
        let clock = Arc::clone(&self.clock);
        let policy = self.fusion;
        let proposed = self
            .store
            .transaction(move |uow| -> FusionResult<Option<FusionPairId>> {
                let Some(candidate) = uow.find_task(tenant_id, task_id)? else {
                    return Ok(None);
                };
                let Some(pair) = find_partner(uow, &candidate, policy)? else {
                    return Ok(None);
                };

                let fusion =
                    FusionPair::propose(tenant_id, candidate.property_id(), pair, clock.as_ref());
                uow.insert_fusion_pair(&fusion)?;
                for member in pair.ids() {
                    let mut task = require_task(uow, tenant_id, member)?;
                    task.hold_for_fusion(fusion.id, clock.as_ref());
                    uow.update_task(&task)?;
                }
                Ok(Some(fusion.id))
            })
            .await?;

        if let Some(pair_id) = proposed {
            tracing::info!(pair_id = %pair_id, "fusion proposed");
        }
        Ok(proposed)
    }

    /// Merges both tasks of a pending pair into one turnover task.
    ///
    /// The merged task starts at the earlier original start and lasts the
    /// configured share of the summed durations. Both originals are
    /// cancelled and keep their pair reference.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::NotFound`] for an unknown pair and
    /// [`FusionError::NotEligible`] when the pair is no longer pending or
    /// either task left the fusion-suggested status.
    #[tracing::instrument(skip_all, fields(tenant_id = %tenant_id, pair_id = %pair_id))]
    pub async fn accept(
        &self,
        tenant_id: TenantId,
        pair_id: FusionPairId,
        actor_id: UserId,
    ) -> FusionResult<FusionAcceptance> {
        let clock = Arc::clone(&self.clock);
        let fusion_policy = self.fusion;
        let scheduling = self.scheduling;
        let acceptance = self
            .store
            .transaction(move |uow| -> FusionResult<FusionAcceptance> {
                let mut fusion = pending_pair(uow, tenant_id, pair_id)?;
                let [mut first, mut second] = held_tasks(uow, &fusion)?;

                let merged = Task::new(
                    merged_task_params(&first, &second, fusion_policy, scheduling),
                    clock.as_ref(),
                )?;
                uow.insert_task(&merged)?;

                let actor = TransitionActor::direct(actor_id);
                let note = format!("merged into task {}", merged.id());
                for task in [&mut first, &mut second] {
                    task.retire_after_fusion(clock.as_ref());
                    uow.update_task(task)?;
                    uow.insert_history(&TaskHistoryEntry::record(
                        task.id(),
                        StatusTransition {
                            from: TaskStatus::FusionSuggested,
                            to: TaskStatus::Cancelled,
                            action: TaskAction::Cancel,
                        },
                        actor,
                        Some(note.clone()),
                        clock.as_ref(),
                    ))?;
                }

                fusion.accept(merged.id(), clock.as_ref());
                uow.update_fusion_pair(&fusion)?;
                Ok(FusionAcceptance {
                    merged_task: merged,
                    cancelled_task_ids: fusion.pair.ids().to_vec(),
                })
            })
            .await?;

        let merged = &acceptance.merged_task;
        tracing::info!(merged_task_id = %merged.id(), "fusion accepted");
        self.bus
            .publish(DomainEvent::TaskCreated(TaskCreated {
                task_id: merged.id(),
                tenant_id: merged.tenant_id(),
                property_id: merged.property_id(),
            }))
            .await;
        Ok(acceptance)
    }

    /// Declines a pending pair for good and releases both tasks.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::NotFound`] for an unknown pair and
    /// [`FusionError::NotEligible`] when the pair is no longer pending.
    #[tracing::instrument(skip_all, fields(tenant_id = %tenant_id, pair_id = %pair_id))]
    pub async fn reject(
        &self,
        tenant_id: TenantId,
        pair_id: FusionPairId,
    ) -> FusionResult<FusionRejectionOutcome> {
        let clock = Arc::clone(&self.clock);
        let outcome = self
            .store
            .transaction(move |uow| -> FusionResult<FusionRejectionOutcome> {
                let mut fusion = pending_pair(uow, tenant_id, pair_id)?;
                uow.insert_fusion_rejection(&FusionRejection::record(
                    tenant_id,
                    fusion.pair,
                    clock.as_ref(),
                ))?;
                let restored_task_ids = release_tasks(uow, &fusion, clock.as_ref())?;
                fusion.reject(clock.as_ref());
                uow.update_fusion_pair(&fusion)?;
                Ok(FusionRejectionOutcome { restored_task_ids })
            })
            .await?;

        tracing::info!(restored = outcome.restored_task_ids.len(), "fusion rejected");
        Ok(outcome)
    }

    /// Withdraws every pending pair whose tasks drifted apart to the window
    /// width or beyond, or lost their schedule.
    ///
    /// Returns the number of pairs withdrawn.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Store`] when storage fails; nothing is
    /// withdrawn in that case.
    #[tracing::instrument(skip_all)]
    pub async fn withdraw_stale(&self) -> FusionResult<usize> {
        let clock = Arc::clone(&self.clock);
        let policy = self.fusion;
        let withdrawn = self
            .store
            .transaction(move |uow| -> FusionResult<usize> {
                let mut withdrawn = 0_usize;
                for mut fusion in uow.pending_fusion_pairs()? {
                    if !is_stale(uow, &fusion, policy)? {
                        continue;
                    }
                    release_tasks(uow, &fusion, clock.as_ref())?;
                    fusion.withdraw(clock.as_ref());
                    uow.update_fusion_pair(&fusion)?;
                    withdrawn += 1;
                }
                Ok(withdrawn)
            })
            .await?;

        if withdrawn > 0 {
            tracing::info!(withdrawn, "stale fusions withdrawn");
        }
        Ok(withdrawn)
    }

    /// Lists a tenant's fusion pairs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Store`] when storage fails.
    pub async fn list_fusion_pairs(
        &self,
        tenant_id: TenantId,
        status: Option<FusionStatus>,
    ) -> FusionResult<Vec<FusionPair>> {
        self.store
            .transaction(move |uow| -> FusionResult<_> {
                Ok(uow.list_fusion_pairs(tenant_id, status)?)
            })
            .await
    }
}

fn find_partner(
    uow: &mut dyn TaskUnitOfWork,
    candidate: &Task,
    policy: FusionPolicy,
) -> TaskStoreResult<Option<TaskPair>> {
    let Some(anchor) = candidate.scheduled_at() else {
        return Ok(None);
    };
    if !candidate.status().is_fusion_eligible() {
        return Ok(None);
    }

    let mut partners: Vec<Task> = uow
        .tasks_for_property(candidate.tenant_id(), candidate.property_id())?
        .into_iter()
        .filter(|other| other.id() != candidate.id() && other.status().is_fusion_eligible())
        .filter(|other| {
            other
                .scheduled_at()
                .is_some_and(|start| policy.is_within_window(anchor, start))
        })
        .collect();
    partners.sort_by_key(|other| (other.scheduled_at(), other.id()));

    for partner in partners {
        let Ok(pair) = TaskPair::new(candidate.id(), partner.id()) else {
            continue;
        };
        if uow.is_fusion_rejected(candidate.tenant_id(), &pair)? {
            continue;
        }
        if uow
            .find_fusion_pair_for_tasks(candidate.tenant_id(), &pair)?
            .is_some()
        {
            continue;
        }
        return Ok(Some(pair));
    }
    Ok(None)
}

fn require_task(
    uow: &mut dyn TaskUnitOfWork,
    tenant_id: TenantId,
    task_id: TaskId,
) -> TaskStoreResult<Task> {
    uow.find_task(tenant_id, task_id)?
        .ok_or(TaskStoreError::TaskNotFound(task_id))
}

fn pending_pair(
    uow: &mut dyn TaskUnitOfWork,
    tenant_id: TenantId,
    pair_id: FusionPairId,
) -> FusionResult<FusionPair> {
    let fusion = uow
        .find_fusion_pair(tenant_id, pair_id)?
        .ok_or(FusionError::NotFound(pair_id))?;
    if !fusion.is_pending() {
        return Err(FusionError::NotEligible(pair_id));
    }
    Ok(fusion)
}

/// Loads both members, requiring each to still be held by the pair.
fn held_tasks(uow: &mut dyn TaskUnitOfWork, fusion: &FusionPair) -> FusionResult<[Task; 2]> {
    let [first_id, second_id] = fusion.pair.ids();
    let first = held_task(uow, fusion, first_id)?;
    let second = held_task(uow, fusion, second_id)?;
    Ok([first, second])
}

fn held_task(
    uow: &mut dyn TaskUnitOfWork,
    fusion: &FusionPair,
    task_id: TaskId,
) -> FusionResult<Task> {
    uow.find_task(fusion.tenant_id, task_id)?
        .filter(|task| is_held_by(task, fusion.id))
        .ok_or(FusionError::NotEligible(fusion.id))
}

fn is_held_by(task: &Task, pair_id: FusionPairId) -> bool {
    task.status() == TaskStatus::FusionSuggested && task.fusion_pair_id() == Some(pair_id)
}

/// Returns members still held by the pair to pending validation.
fn release_tasks(
    uow: &mut dyn TaskUnitOfWork,
    fusion: &FusionPair,
    clock: &impl Clock,
) -> TaskStoreResult<Vec<TaskId>> {
    let mut restored = Vec::with_capacity(2);
    for task_id in fusion.pair.ids() {
        let Some(mut task) = uow.find_task(fusion.tenant_id, task_id)? else {
            continue;
        };
        if !is_held_by(&task, fusion.id) {
            continue;
        }
        task.release_from_fusion(clock);
        uow.update_task(&task)?;
        restored.push(task_id);
    }
    Ok(restored)
}

/// Withdraws the pending pair holding `task` and releases both members.
///
/// Returns the withdrawn pair, or `None` when the task is not held by a
/// pending pair.
pub(crate) fn withdraw_holding_pair(
    uow: &mut dyn TaskUnitOfWork,
    task: &Task,
    clock: &impl Clock,
) -> TaskStoreResult<Option<FusionPairId>> {
    let Some(pair_id) = task.fusion_pair_id() else {
        return Ok(None);
    };
    let Some(mut fusion) = uow
        .find_fusion_pair(task.tenant_id(), pair_id)?
        .filter(FusionPair::is_pending)
    else {
        return Ok(None);
    };
    release_tasks(uow, &fusion, clock)?;
    fusion.withdraw(clock);
    uow.update_fusion_pair(&fusion)?;
    Ok(Some(fusion.id))
}

fn is_stale(
    uow: &mut dyn TaskUnitOfWork,
    fusion: &FusionPair,
    policy: FusionPolicy,
) -> TaskStoreResult<bool> {
    let [first_id, second_id] = fusion.pair.ids();
    let first = uow.find_task(fusion.tenant_id, first_id)?;
    let second = uow.find_task(fusion.tenant_id, second_id)?;
    let starts = first
        .and_then(|task| task.scheduled_at())
        .zip(second.and_then(|task| task.scheduled_at()));
    Ok(!starts.is_some_and(|(a, b)| policy.is_within_window(a, b)))
}

fn merged_task_params(
    first: &Task,
    second: &Task,
    fusion: FusionPolicy,
    scheduling: SchedulingPolicy,
) -> NewTask {
    let duration = fusion
        .merged_duration(
            scheduling.effective_duration(first.duration_minutes()),
            scheduling.effective_duration(second.duration_minutes()),
        )
        .max(1);
    let mut params = NewTask::new(
        first.tenant_id(),
        first.property_id(),
        fit_title(&format!("Turnover: {} + {}", first.title(), second.title())),
        TaskCategory::Turnover,
    )
    .with_description(format!(
        "Merged from tasks {} ({}) and {} ({}).",
        first.id(),
        first.title(),
        second.id(),
        second.title()
    ))
    .with_duration_minutes(duration);

    let start = match (first.scheduled_at(), second.scheduled_at()) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    if let Some(at) = start {
        params = params.scheduled_at(at);
    }
    let shared_reservation = first
        .reservation_id()
        .filter(|id| Some(*id) == second.reservation_id());
    if let Some(reservation_id) = shared_reservation {
        params = params.for_reservation(reservation_id);
    }
    params
}
