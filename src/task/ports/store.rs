//! Storage port: task records, their audit trails, and the scheduling records
//! derived from them, accessed through a transactional unit of work.

use crate::task::domain::{
    AutoRule, ConflictId, ConflictPair, ConflictStatus, FusionPair, FusionPairId, FusionRejection,
    FusionStatus, PropertyId, ReservationId, ReservationTaskAudit, Task, TaskHistoryEntry, TaskId,
    TaskPair, TenantId, UserId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for storage operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Reads and writes available inside one transaction.
///
/// Reads observe the writes already made through the same unit of work.
/// Every method fails with [`TaskStoreError::Persistence`] when storage
/// does; only the other errors are listed per method.
pub trait TaskUnitOfWork {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the identifier exists.
    fn insert_task(&mut self, task: &Task) -> TaskStoreResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] when the task does not exist.
    fn update_task(&mut self, task: &Task) -> TaskStoreResult<()>;

    /// Finds a task within a tenant.
    fn find_task(&mut self, tenant_id: TenantId, task_id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Returns every task of a property.
    fn tasks_for_property(
        &mut self,
        tenant_id: TenantId,
        property_id: PropertyId,
    ) -> TaskStoreResult<Vec<Task>>;

    /// Returns every task assigned to a staff member.
    fn tasks_for_staff(&mut self, tenant_id: TenantId, staff_id: UserId)
    -> TaskStoreResult<Vec<Task>>;

    /// Returns every task linked to a reservation, whatever its status.
    fn tasks_for_reservation(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<Vec<Task>>;

    /// Appends a history entry.
    fn insert_history(&mut self, entry: &TaskHistoryEntry) -> TaskStoreResult<()>;

    /// Returns a task's history, oldest first.
    fn history_for_task(&mut self, task_id: TaskId) -> TaskStoreResult<Vec<TaskHistoryEntry>>;

    /// Finds a conflict by identifier.
    fn find_conflict(
        &mut self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
    ) -> TaskStoreResult<Option<ConflictPair>>;

    /// Finds the conflict recorded for a pair, whatever its kind or status.
    fn find_conflict_for_pair(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<Option<ConflictPair>>;

    /// Stores a new conflict.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicatePair`] when the pair is already
    /// recorded.
    fn insert_conflict(&mut self, conflict: &ConflictPair) -> TaskStoreResult<()>;

    /// Persists changes to a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::RecordNotFound`] when it does not exist.
    fn update_conflict(&mut self, conflict: &ConflictPair) -> TaskStoreResult<()>;

    /// Lists a tenant's conflicts, newest first.
    fn list_conflicts(
        &mut self,
        tenant_id: TenantId,
        status: Option<ConflictStatus>,
    ) -> TaskStoreResult<Vec<ConflictPair>>;

    /// Finds a fusion pair by identifier.
    fn find_fusion_pair(
        &mut self,
        tenant_id: TenantId,
        pair_id: FusionPairId,
    ) -> TaskStoreResult<Option<FusionPair>>;

    /// Finds the fusion pair recorded for two tasks, whatever its status.
    fn find_fusion_pair_for_tasks(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<Option<FusionPair>>;

    /// Stores a new fusion pair.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicatePair`] when the pair is already
    /// recorded.
    fn insert_fusion_pair(&mut self, fusion: &FusionPair) -> TaskStoreResult<()>;

    /// Persists changes to a fusion pair.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::RecordNotFound`] when it does not exist.
    fn update_fusion_pair(&mut self, fusion: &FusionPair) -> TaskStoreResult<()>;

    /// Lists a tenant's fusion pairs, newest first.
    fn list_fusion_pairs(
        &mut self,
        tenant_id: TenantId,
        status: Option<FusionStatus>,
    ) -> TaskStoreResult<Vec<FusionPair>>;

    /// Returns pending fusion pairs across all tenants, oldest first.
    fn pending_fusion_pairs(&mut self) -> TaskStoreResult<Vec<FusionPair>>;

    /// Records a declined pair.
    fn insert_fusion_rejection(&mut self, rejection: &FusionRejection) -> TaskStoreResult<()>;

    /// Returns `true` when the pair was declined before.
    fn is_fusion_rejected(&mut self, tenant_id: TenantId, pair: &TaskPair)
    -> TaskStoreResult<bool>;

    /// Appends a reservation cascade audit row.
    fn insert_reservation_audit(&mut self, audit: &ReservationTaskAudit) -> TaskStoreResult<()>;

    /// Returns the audit rows written for a reservation, oldest first.
    fn audits_for_reservation(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<Vec<ReservationTaskAudit>>;

    /// Returns `true` when the reservation subsystem has persisted the
    /// reservation.
    fn reservation_exists(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<bool>;

    /// Returns the automation rules of a property.
    fn auto_rules_for_property(
        &mut self,
        tenant_id: TenantId,
        property_id: PropertyId,
    ) -> TaskStoreResult<Vec<AutoRule>>;

    /// Stores a rule, replacing the property's rule for the same trigger.
    fn upsert_auto_rule(&mut self, rule: &AutoRule) -> TaskStoreResult<()>;
}

/// Transactional task storage.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Runs `work` in one atomic transaction.
    ///
    /// Writes commit only when `work` returns `Ok`; any error rolls every
    /// write back and is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a [`TaskStoreError`]
    /// converted into `E` when the transaction itself fails.
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn TaskUnitOfWork) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static;
}

/// Errors returned by storage implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// A record already exists for the canonical pair.
    #[error("duplicate record for task pair {0}")]
    DuplicatePair(TaskPair),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A conflict or fusion record was not found.
    #[error("{0} not found")]
    RecordNotFound(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    #[must_use]
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
