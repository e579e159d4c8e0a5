//! Service layer for task creation, state transitions, and assignment.

use super::ErrorKind;
use crate::task::{
    domain::{
        DomainEvent, NewTask, StatusTransition, Task, TaskAction, TaskAssigned, TaskCreated,
        TaskDomainError, TaskHistoryEntry, TaskId, TaskIncidentReported, TaskStateChanged,
        TaskStatus, TenantId, TransitionActor, UserId,
    },
    ports::{DirectoryError, EventBus, StaffDirectory, TaskStore, TaskStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Request payload for applying a state machine action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    tenant_id: TenantId,
    task_id: TaskId,
    action: TaskAction,
    actor_id: UserId,
    note: Option<String>,
}

impl TransitionRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub const fn new(
        tenant_id: TenantId,
        task_id: TaskId,
        action: TaskAction,
        actor_id: UserId,
    ) -> Self {
        Self {
            tenant_id,
            task_id,
            action,
            actor_id,
            note: None,
        }
    }

    /// Attaches a note recorded in the history entry.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Request payload for assigning a task to a staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentRequest {
    tenant_id: TenantId,
    task_id: TaskId,
    user_id: UserId,
    actor_id: UserId,
}

impl AssignmentRequest {
    /// Creates an assignment of `task_id` to `user_id` made by `actor_id`.
    #[must_use]
    pub const fn new(tenant_id: TenantId, task_id: TaskId, user_id: UserId, actor_id: UserId) -> Self {
        Self {
            tenant_id,
            task_id,
            user_id,
            actor_id,
        }
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// The task does not exist in tenant scope.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The state machine rejected the action.
    #[error("cannot {action} task {task_id} while it is {current}")]
    InvalidTransition {
        /// Task the action was applied to.
        task_id: TaskId,
        /// Status the task remains in.
        current: TaskStatus,
        /// Rejected action.
        action: TaskAction,
        /// Actions accepted from `current`; empty for terminal statuses.
        allowed: Vec<TaskAction>,
    },

    /// The proxy actor does not administer the task's property.
    #[error("user {actor_id} may not act on task {task_id} outside their scope")]
    ScopeViolation {
        /// Target task.
        task_id: TaskId,
        /// Rejected actor.
        actor_id: UserId,
    },

    /// The user cannot receive assignments.
    #[error("user {user_id} cannot be assigned task {task_id}")]
    InvalidAssignee {
        /// Target task.
        task_id: TaskId,
        /// Rejected assignee.
        user_id: UserId,
    },

    /// Domain validation failed.
    #[error(transparent)]
    Domain(TaskDomainError),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),

    /// The staff directory failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<TaskDomainError> for TaskLifecycleError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::InvalidTransition {
                task_id,
                current,
                action,
                allowed,
            } => Self::InvalidTransition {
                task_id,
                current,
                action,
                allowed,
            },
            other => Self::Domain(other),
        }
    }
}

impl TaskLifecycleError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::ScopeViolation { .. } => ErrorKind::ScopeViolation,
            Self::InvalidAssignee { .. } | Self::Domain(_) => ErrorKind::InvalidInput,
            Self::Store(err) => store_error_kind(err),
            Self::Directory(_) => ErrorKind::Internal,
        }
    }
}

/// Classifies a storage error.
pub(super) const fn store_error_kind(err: &TaskStoreError) -> ErrorKind {
    match err {
        TaskStoreError::TaskNotFound(_) | TaskStoreError::RecordNotFound(_) => ErrorKind::NotFound,
        TaskStoreError::DuplicateTask(_)
        | TaskStoreError::DuplicatePair(_)
        | TaskStoreError::Persistence(_) => ErrorKind::Internal,
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<S, D, B, C>
where
    S: TaskStore,
    D: StaffDirectory,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    directory: Arc<D>,
    bus: Arc<B>,
    clock: Arc<C>,
}

impl<S, D, B, C> TaskLifecycleService<S, D, B, C>
where
    S: TaskStore,
    D: StaffDirectory,
    B: EventBus,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(store: Arc<S>, directory: Arc<D>, bus: Arc<B>, clock: Arc<C>) -> Self {
        Self {
            store,
            directory,
            bus,
            clock,
        }
    }

    /// Creates a task by manual entry and announces it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] when the title is blank or the
    /// duration is zero, and [`TaskLifecycleError::Store`] when persistence
    /// fails.
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = %request.tenant_id, property_id = %request.property_id)
    )]
    pub async fn create_task(&self, request: NewTask) -> TaskLifecycleResult<Task> {
        let task = Task::new(request, self.clock.as_ref())?;
        let stored = task.clone();
        self.store
            .transaction(move |uow| -> TaskLifecycleResult<()> {
                uow.insert_task(&stored)?;
                Ok(())
            })
            .await?;

        tracing::info!(task_id = %task.id(), "task created");
        self.bus
            .publish(DomainEvent::TaskCreated(TaskCreated {
                task_id: task.id(),
                tenant_id: task.tenant_id(),
                property_id: task.property_id(),
            }))
            .await;
        Ok(task)
    }

    /// Retrieves a task within a tenant.
    ///
    /// Returns `Ok(None)` when the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] when the lookup fails.
    pub async fn find_task(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> TaskLifecycleResult<Option<Task>> {
        self.store
            .transaction(move |uow| -> TaskLifecycleResult<_> {
                Ok(uow.find_task(tenant_id, task_id)?)
            })
            .await
    }

    /// Applies a state machine action performed by the actor for
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task and
    /// [`TaskLifecycleError::InvalidTransition`] carrying the current status
    /// and allowed actions when the state machine rejects the action.
    pub async fn transition(&self, request: TransitionRequest) -> TaskLifecycleResult<Task> {
        let actor = TransitionActor::direct(request.actor_id);
        self.apply_transition(request, actor).await
    }

    /// Applies a state machine action recorded on behalf of another user.
    ///
    /// The actor's administrative scope must cover the task's property.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::ScopeViolation`] when the scope check
    /// fails, plus every error of [`Self::transition`].
    pub async fn proxy_transition(
        &self,
        request: TransitionRequest,
        on_behalf_of: UserId,
    ) -> TaskLifecycleResult<Task> {
        let task = self.require_task(request.tenant_id, request.task_id).await?;
        let in_scope = self
            .directory
            .manages_property(request.tenant_id, request.actor_id, task.property_id())
            .await?;
        if !in_scope {
            tracing::warn!(
                task_id = %request.task_id,
                actor_id = %request.actor_id,
                property_id = %task.property_id(),
                "proxy transition outside actor scope"
            );
            return Err(TaskLifecycleError::ScopeViolation {
                task_id: request.task_id,
                actor_id: request.actor_id,
            });
        }

        let actor = TransitionActor::proxy(request.actor_id, on_behalf_of);
        self.apply_transition(request, actor).await
    }

    /// Assigns a task to a staff member.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::InvalidAssignee`] when the directory
    /// refuses the user and [`TaskLifecycleError::NotFound`] for an unknown
    /// task.
    #[tracing::instrument(
        skip_all,
        fields(task_id = %request.task_id, user_id = %request.user_id, actor_id = %request.actor_id)
    )]
    pub async fn assign(&self, request: AssignmentRequest) -> TaskLifecycleResult<Task> {
        let AssignmentRequest {
            tenant_id,
            task_id,
            user_id,
            ..
        } = request;
        if !self.directory.is_assignable(tenant_id, user_id).await? {
            return Err(TaskLifecycleError::InvalidAssignee { task_id, user_id });
        }

        let clock = Arc::clone(&self.clock);
        let task = self
            .store
            .transaction(move |uow| -> TaskLifecycleResult<Task> {
                let mut task = uow
                    .find_task(tenant_id, task_id)?
                    .ok_or(TaskLifecycleError::NotFound(task_id))?;
                task.assign(user_id, clock.as_ref());
                uow.update_task(&task)?;
                Ok(task)
            })
            .await?;

        tracing::info!("task assigned");
        self.bus
            .publish(DomainEvent::TaskAssigned(TaskAssigned {
                task_id,
                tenant_id,
                assigned_user_id: user_id,
            }))
            .await;
        Ok(task)
    }

    /// Returns the recorded transitions of a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task.
    pub async fn history(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> TaskLifecycleResult<Vec<TaskHistoryEntry>> {
        self.store
            .transaction(move |uow| -> TaskLifecycleResult<_> {
                if uow.find_task(tenant_id, task_id)?.is_none() {
                    return Err(TaskLifecycleError::NotFound(task_id));
                }
                Ok(uow.history_for_task(task_id)?)
            })
            .await
    }

    async fn require_task(&self, tenant_id: TenantId, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.find_task(tenant_id, task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    #[tracing::instrument(
        skip_all,
        fields(task_id = %request.task_id, action = %request.action, proxy = actor.is_proxy())
    )]
    async fn apply_transition(
        &self,
        request: TransitionRequest,
        actor: TransitionActor,
    ) -> TaskLifecycleResult<Task> {
        let TransitionRequest {
            tenant_id,
            task_id,
            action,
            note,
            ..
        } = request;
        let clock = Arc::clone(&self.clock);
        let (task, transition) = self
            .store
            .transaction(move |uow| -> TaskLifecycleResult<(Task, StatusTransition)> {
                let mut task = uow
                    .find_task(tenant_id, task_id)?
                    .ok_or(TaskLifecycleError::NotFound(task_id))?;
                let transition = task.apply(action, clock.as_ref())?;
                uow.update_task(&task)?;
                uow.insert_history(&TaskHistoryEntry::record(
                    task_id,
                    transition,
                    actor,
                    note,
                    clock.as_ref(),
                ))?;
                Ok((task, transition))
            })
            .await?;

        tracing::info!(from = %transition.from, to = %transition.to, "task transitioned");
        self.publish_transition(&task, transition, actor).await;
        Ok(task)
    }

    async fn publish_transition(
        &self,
        task: &Task,
        transition: StatusTransition,
        actor: TransitionActor,
    ) {
        self.bus
            .publish(DomainEvent::TaskStateChanged(TaskStateChanged {
                task_id: task.id(),
                tenant_id: task.tenant_id(),
                previous_status: transition.from,
                new_status: transition.to,
                action: transition.action,
                actor_id: actor.actor_id(),
            }))
            .await;
        if transition.to == TaskStatus::Incident {
            self.bus
                .publish(DomainEvent::TaskIncidentReported(TaskIncidentReported {
                    task_id: task.id(),
                    tenant_id: task.tenant_id(),
                    property_id: task.property_id(),
                    actor_id: actor.actor_id(),
                }))
                .await;
        }
    }
}
