//! In-memory task store for tests and single-process embedding.
//!
//! Each transaction runs against a private copy of the state which replaces
//! the shared state only when the unit of work succeeds, so a failed
//! transaction leaves no trace. The write lock is held for the whole unit of
//! work, which serializes transactions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{
        AutoRule, ConflictId, ConflictPair, ConflictStatus, FusionPair, FusionPairId,
        FusionRejection, FusionStatus, PropertyId, ReservationId, ReservationTaskAudit, Task,
        TaskHistoryEntry, TaskId, TaskPair, TenantId, UserId,
    },
    ports::{TaskStore, TaskStoreError, TaskStoreResult, TaskUnitOfWork},
};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    tasks: HashMap<TaskId, Task>,
    history: Vec<TaskHistoryEntry>,
    conflicts: Vec<ConflictPair>,
    fusion_pairs: Vec<FusionPair>,
    rejections: Vec<FusionRejection>,
    audits: Vec<ReservationTaskAudit>,
    reservations: HashSet<(TenantId, ReservationId)>,
    auto_rules: Vec<AutoRule>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the reservation subsystem persisted a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] when the lock is poisoned.
    pub fn register_reservation(
        &self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.reservations.insert((tenant_id, reservation_id));
        Ok(())
    }

    /// Returns the number of stored tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] when the lock is poisoned.
    pub fn task_count(&self) -> TaskStoreResult<usize> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.tasks.len())
    }

    fn run_atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn TaskUnitOfWork) -> Result<T, E>,
        E: From<TaskStoreError>,
    {
        let mut shared = self
            .state
            .write()
            .map_err(|err| E::from(poisoned(err)))?;
        let mut working = shared.clone();
        let output = work(&mut InMemoryUnitOfWork {
            state: &mut working,
        })?;
        *shared = working;
        Ok(output)
    }
}

fn poisoned(err: impl std::fmt::Display) -> TaskStoreError {
    TaskStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn TaskUnitOfWork) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static,
    {
        self.run_atomically(work)
    }
}

struct InMemoryUnitOfWork<'a> {
    state: &'a mut StoreState,
}

/// Collects matching tasks in creation order.
fn collect_tasks(state: &StoreState, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
    let mut tasks: Vec<Task> = state
        .tasks
        .values()
        .filter(|task| predicate(task))
        .cloned()
        .collect();
    tasks.sort_by_key(|task| (task.created_at(), task.id()));
    tasks
}

/// Returns records newest first, later insertions winning timestamp ties.
fn newest_first<T: Clone, K: Ord>(records: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut ordered: Vec<T> = records.iter().rev().cloned().collect();
    ordered.sort_by(|a, b| key(b).cmp(&key(a)));
    ordered
}

impl TaskUnitOfWork for InMemoryUnitOfWork<'_> {
    fn insert_task(&mut self, task: &Task) -> TaskStoreResult<()> {
        if self.state.tasks.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }
        self.state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    fn update_task(&mut self, task: &Task) -> TaskStoreResult<()> {
        let stored = self
            .state
            .tasks
            .get_mut(&task.id())
            .ok_or(TaskStoreError::TaskNotFound(task.id()))?;
        *stored = task.clone();
        Ok(())
    }

    fn find_task(&mut self, tenant_id: TenantId, task_id: TaskId) -> TaskStoreResult<Option<Task>> {
        Ok(self
            .state
            .tasks
            .get(&task_id)
            .filter(|task| task.tenant_id() == tenant_id)
            .cloned())
    }

    fn tasks_for_property(
        &mut self,
        tenant_id: TenantId,
        property_id: PropertyId,
    ) -> TaskStoreResult<Vec<Task>> {
        Ok(collect_tasks(self.state, |task| {
            task.tenant_id() == tenant_id && task.property_id() == property_id
        }))
    }

    fn tasks_for_staff(
        &mut self,
        tenant_id: TenantId,
        staff_id: UserId,
    ) -> TaskStoreResult<Vec<Task>> {
        Ok(collect_tasks(self.state, |task| {
            task.tenant_id() == tenant_id && task.assigned_to() == Some(staff_id)
        }))
    }

    fn tasks_for_reservation(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<Vec<Task>> {
        Ok(collect_tasks(self.state, |task| {
            task.tenant_id() == tenant_id && task.reservation_id() == Some(reservation_id)
        }))
    }

    fn insert_history(&mut self, entry: &TaskHistoryEntry) -> TaskStoreResult<()> {
        self.state.history.push(entry.clone());
        Ok(())
    }

    fn history_for_task(&mut self, task_id: TaskId) -> TaskStoreResult<Vec<TaskHistoryEntry>> {
        Ok(self
            .state
            .history
            .iter()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect())
    }

    fn find_conflict(
        &mut self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
    ) -> TaskStoreResult<Option<ConflictPair>> {
        Ok(self
            .state
            .conflicts
            .iter()
            .find(|conflict| conflict.tenant_id == tenant_id && conflict.id == conflict_id)
            .cloned())
    }

    fn find_conflict_for_pair(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<Option<ConflictPair>> {
        Ok(self
            .state
            .conflicts
            .iter()
            .find(|conflict| conflict.tenant_id == tenant_id && conflict.pair == *pair)
            .cloned())
    }

    fn insert_conflict(&mut self, conflict: &ConflictPair) -> TaskStoreResult<()> {
        if self.find_conflict_for_pair(conflict.tenant_id, &conflict.pair)?.is_some() {
            return Err(TaskStoreError::DuplicatePair(conflict.pair));
        }
        self.state.conflicts.push(conflict.clone());
        Ok(())
    }

    fn update_conflict(&mut self, conflict: &ConflictPair) -> TaskStoreResult<()> {
        let stored = self
            .state
            .conflicts
            .iter_mut()
            .find(|stored| stored.id == conflict.id)
            .ok_or_else(|| TaskStoreError::RecordNotFound(format!("conflict {}", conflict.id)))?;
        *stored = conflict.clone();
        Ok(())
    }

    fn list_conflicts(
        &mut self,
        tenant_id: TenantId,
        status: Option<ConflictStatus>,
    ) -> TaskStoreResult<Vec<ConflictPair>> {
        let matching: Vec<ConflictPair> = self
            .state
            .conflicts
            .iter()
            .filter(|conflict| conflict.tenant_id == tenant_id)
            .filter(|conflict| status.is_none_or(|wanted| conflict.status == wanted))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |conflict| conflict.detected_at))
    }

    fn find_fusion_pair(
        &mut self,
        tenant_id: TenantId,
        pair_id: FusionPairId,
    ) -> TaskStoreResult<Option<FusionPair>> {
        Ok(self
            .state
            .fusion_pairs
            .iter()
            .find(|fusion| fusion.tenant_id == tenant_id && fusion.id == pair_id)
            .cloned())
    }

    fn find_fusion_pair_for_tasks(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<Option<FusionPair>> {
        Ok(self
            .state
            .fusion_pairs
            .iter()
            .find(|fusion| fusion.tenant_id == tenant_id && fusion.pair == *pair)
            .cloned())
    }

    fn insert_fusion_pair(&mut self, fusion: &FusionPair) -> TaskStoreResult<()> {
        if self
            .find_fusion_pair_for_tasks(fusion.tenant_id, &fusion.pair)?
            .is_some()
        {
            return Err(TaskStoreError::DuplicatePair(fusion.pair));
        }
        self.state.fusion_pairs.push(fusion.clone());
        Ok(())
    }

    fn update_fusion_pair(&mut self, fusion: &FusionPair) -> TaskStoreResult<()> {
        let stored = self
            .state
            .fusion_pairs
            .iter_mut()
            .find(|stored| stored.id == fusion.id)
            .ok_or_else(|| TaskStoreError::RecordNotFound(format!("fusion pair {}", fusion.id)))?;
        *stored = fusion.clone();
        Ok(())
    }

    fn list_fusion_pairs(
        &mut self,
        tenant_id: TenantId,
        status: Option<FusionStatus>,
    ) -> TaskStoreResult<Vec<FusionPair>> {
        let matching: Vec<FusionPair> = self
            .state
            .fusion_pairs
            .iter()
            .filter(|fusion| fusion.tenant_id == tenant_id)
            .filter(|fusion| status.is_none_or(|wanted| fusion.status == wanted))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |fusion| fusion.created_at))
    }

    fn pending_fusion_pairs(&mut self) -> TaskStoreResult<Vec<FusionPair>> {
        Ok(self
            .state
            .fusion_pairs
            .iter()
            .filter(|fusion| fusion.is_pending())
            .cloned()
            .collect())
    }

    fn insert_fusion_rejection(&mut self, rejection: &FusionRejection) -> TaskStoreResult<()> {
        if !self.is_fusion_rejected(rejection.tenant_id, &rejection.pair)? {
            self.state.rejections.push(rejection.clone());
        }
        Ok(())
    }

    fn is_fusion_rejected(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<bool> {
        Ok(self
            .state
            .rejections
            .iter()
            .any(|rejection| rejection.tenant_id == tenant_id && rejection.pair == *pair))
    }

    fn insert_reservation_audit(&mut self, audit: &ReservationTaskAudit) -> TaskStoreResult<()> {
        self.state.audits.push(audit.clone());
        Ok(())
    }

    fn audits_for_reservation(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<Vec<ReservationTaskAudit>> {
        Ok(self
            .state
            .audits
            .iter()
            .filter(|audit| audit.tenant_id == tenant_id && audit.reservation_id == reservation_id)
            .cloned()
            .collect())
    }

    fn reservation_exists(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<bool> {
        Ok(self
            .state
            .reservations
            .contains(&(tenant_id, reservation_id)))
    }

    fn auto_rules_for_property(
        &mut self,
        tenant_id: TenantId,
        property_id: PropertyId,
    ) -> TaskStoreResult<Vec<AutoRule>> {
        let mut rules: Vec<AutoRule> = self
            .state
            .auto_rules
            .iter()
            .filter(|rule| rule.tenant_id == tenant_id && rule.property_id == property_id)
            .cloned()
            .collect();
        rules.sort_by_key(|rule| rule.trigger);
        Ok(rules)
    }

    fn upsert_auto_rule(&mut self, rule: &AutoRule) -> TaskStoreResult<()> {
        self.state.auto_rules.retain(|stored| {
            !(stored.tenant_id == rule.tenant_id
                && stored.property_id == rule.property_id
                && stored.trigger == rule.trigger)
        });
        self.state.auto_rules.push(rule.clone());
        Ok(())
    }
}
