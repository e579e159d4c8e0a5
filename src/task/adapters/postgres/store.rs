//! `PostgreSQL` task store.
//!
//! Every unit of work runs inside one database transaction on a pooled
//! connection, executed on Tokio's blocking thread pool. Canonical pair
//! columns carry unique indexes, so concurrent detectors racing on the same
//! pair cannot both insert it.

use super::{
    models::{
        AuditRow, AutoRuleRow, ConflictRow, FusionPairRow, FusionRejectionRow, HistoryRow,
        TaskRow,
    },
    schema::{
        auto_rules, fusion_pairs, fusion_rejections, reservation_task_audits, reservations,
        task_conflicts, task_history, tasks,
    },
};
use crate::task::{
    domain::{
        AutoRule, ConflictId, ConflictPair, ConflictStatus, FusionPair, FusionPairId,
        FusionRejection, FusionStatus, PropertyId, ReservationId, ReservationTaskAudit, Task,
        TaskHistoryEntry, TaskId, TaskPair, TenantId, UserId,
    },
    ports::{TaskStore, TaskStoreError, TaskStoreResult, TaskUnitOfWork},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by the task store.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task store.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

impl PostgresTaskStore {
    /// Creates a store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }
}

/// Outcome of an aborted database transaction.
enum Abort<E> {
    Work(E),
    Database(DieselError),
}

impl<E> From<DieselError> for Abort<E> {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn TaskUnitOfWork) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| E::from(TaskStoreError::persistence(err)))?;
            connection
                .transaction::<T, Abort<E>, _>(|conn| {
                    work(&mut PgUnitOfWork { conn }).map_err(Abort::Work)
                })
                .map_err(|abort| match abort {
                    Abort::Work(err) => err,
                    Abort::Database(err) => E::from(TaskStoreError::persistence(err)),
                })
        })
        .await
        .map_err(|err| E::from(TaskStoreError::persistence(err)))?
    }
}

struct PgUnitOfWork<'a> {
    conn: &'a mut PgConnection,
}

fn map_pair_violation(err: DieselError, pair: TaskPair) -> TaskStoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            TaskStoreError::DuplicatePair(pair)
        }
        other => TaskStoreError::persistence(other),
    }
}

fn load_tasks(rows: Vec<TaskRow>) -> TaskStoreResult<Vec<Task>> {
    rows.into_iter().map(TaskRow::into_task).collect()
}

impl TaskUnitOfWork for PgUnitOfWork<'_> {
    fn insert_task(&mut self, task: &Task) -> TaskStoreResult<()> {
        let task_id = task.id();
        diesel::insert_into(tasks::table)
            .values(&TaskRow::from_task(task)?)
            .execute(self.conn)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    TaskStoreError::DuplicateTask(task_id)
                }
                other => TaskStoreError::persistence(other),
            })?;
        Ok(())
    }

    fn update_task(&mut self, task: &Task) -> TaskStoreResult<()> {
        let updated = diesel::update(tasks::table.find(task.id().into_inner()))
            .set(&TaskRow::from_task(task)?)
            .execute(self.conn)
            .map_err(TaskStoreError::persistence)?;
        if updated == 0 {
            return Err(TaskStoreError::TaskNotFound(task.id()));
        }
        Ok(())
    }

    fn find_task(&mut self, tenant_id: TenantId, task_id: TaskId) -> TaskStoreResult<Option<Task>> {
        tasks::table
            .filter(tasks::id.eq(task_id.into_inner()))
            .filter(tasks::tenant_id.eq(tenant_id.into_inner()))
            .select(TaskRow::as_select())
            .first::<TaskRow>(self.conn)
            .optional()
            .map_err(TaskStoreError::persistence)?
            .map(TaskRow::into_task)
            .transpose()
    }

    fn tasks_for_property(
        &mut self,
        tenant_id: TenantId,
        property_id: PropertyId,
    ) -> TaskStoreResult<Vec<Task>> {
        let rows = tasks::table
            .filter(tasks::tenant_id.eq(tenant_id.into_inner()))
            .filter(tasks::property_id.eq(property_id.into_inner()))
            .order((tasks::created_at.asc(), tasks::id.asc()))
            .select(TaskRow::as_select())
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?;
        load_tasks(rows)
    }

    fn tasks_for_staff(
        &mut self,
        tenant_id: TenantId,
        staff_id: UserId,
    ) -> TaskStoreResult<Vec<Task>> {
        let rows = tasks::table
            .filter(tasks::tenant_id.eq(tenant_id.into_inner()))
            .filter(tasks::assigned_to.eq(staff_id.into_inner()))
            .order((tasks::created_at.asc(), tasks::id.asc()))
            .select(TaskRow::as_select())
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?;
        load_tasks(rows)
    }

    fn tasks_for_reservation(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<Vec<Task>> {
        let rows = tasks::table
            .filter(tasks::tenant_id.eq(tenant_id.into_inner()))
            .filter(tasks::reservation_id.eq(reservation_id.into_inner()))
            .order((tasks::created_at.asc(), tasks::id.asc()))
            .select(TaskRow::as_select())
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?;
        load_tasks(rows)
    }

    fn insert_history(&mut self, entry: &TaskHistoryEntry) -> TaskStoreResult<()> {
        diesel::insert_into(task_history::table)
            .values(&HistoryRow::from_entry(entry))
            .execute(self.conn)
            .map_err(TaskStoreError::persistence)?;
        Ok(())
    }

    fn history_for_task(&mut self, task_id: TaskId) -> TaskStoreResult<Vec<TaskHistoryEntry>> {
        task_history::table
            .filter(task_history::task_id.eq(task_id.into_inner()))
            .order((task_history::recorded_at.asc(), task_history::id.asc()))
            .select(HistoryRow::as_select())
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?
            .into_iter()
            .map(HistoryRow::into_entry)
            .collect()
    }

    fn find_conflict(
        &mut self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
    ) -> TaskStoreResult<Option<ConflictPair>> {
        task_conflicts::table
            .filter(task_conflicts::id.eq(conflict_id.into_inner()))
            .filter(task_conflicts::tenant_id.eq(tenant_id.into_inner()))
            .select(ConflictRow::as_select())
            .first::<ConflictRow>(self.conn)
            .optional()
            .map_err(TaskStoreError::persistence)?
            .map(ConflictRow::into_conflict)
            .transpose()
    }

    fn find_conflict_for_pair(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<Option<ConflictPair>> {
        task_conflicts::table
            .filter(task_conflicts::tenant_id.eq(tenant_id.into_inner()))
            .filter(task_conflicts::task_a_id.eq(pair.first().into_inner()))
            .filter(task_conflicts::task_b_id.eq(pair.second().into_inner()))
            .select(ConflictRow::as_select())
            .first::<ConflictRow>(self.conn)
            .optional()
            .map_err(TaskStoreError::persistence)?
            .map(ConflictRow::into_conflict)
            .transpose()
    }

    fn insert_conflict(&mut self, conflict: &ConflictPair) -> TaskStoreResult<()> {
        diesel::insert_into(task_conflicts::table)
            .values(&ConflictRow::from_conflict(conflict))
            .execute(self.conn)
            .map_err(|err| map_pair_violation(err, conflict.pair))?;
        Ok(())
    }

    fn update_conflict(&mut self, conflict: &ConflictPair) -> TaskStoreResult<()> {
        let updated = diesel::update(task_conflicts::table.find(conflict.id.into_inner()))
            .set(&ConflictRow::from_conflict(conflict))
            .execute(self.conn)
            .map_err(TaskStoreError::persistence)?;
        if updated == 0 {
            return Err(TaskStoreError::RecordNotFound(format!(
                "conflict {}",
                conflict.id
            )));
        }
        Ok(())
    }

    fn list_conflicts(
        &mut self,
        tenant_id: TenantId,
        status: Option<ConflictStatus>,
    ) -> TaskStoreResult<Vec<ConflictPair>> {
        let mut query = task_conflicts::table
            .filter(task_conflicts::tenant_id.eq(tenant_id.into_inner()))
            .order(task_conflicts::detected_at.desc())
            .select(ConflictRow::as_select())
            .into_boxed();
        if let Some(wanted) = status {
            query = query.filter(task_conflicts::status.eq(wanted.as_str()));
        }
        query
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?
            .into_iter()
            .map(ConflictRow::into_conflict)
            .collect()
    }

    fn find_fusion_pair(
        &mut self,
        tenant_id: TenantId,
        pair_id: FusionPairId,
    ) -> TaskStoreResult<Option<FusionPair>> {
        fusion_pairs::table
            .filter(fusion_pairs::id.eq(pair_id.into_inner()))
            .filter(fusion_pairs::tenant_id.eq(tenant_id.into_inner()))
            .select(FusionPairRow::as_select())
            .first::<FusionPairRow>(self.conn)
            .optional()
            .map_err(TaskStoreError::persistence)?
            .map(FusionPairRow::into_fusion)
            .transpose()
    }

    fn find_fusion_pair_for_tasks(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<Option<FusionPair>> {
        fusion_pairs::table
            .filter(fusion_pairs::tenant_id.eq(tenant_id.into_inner()))
            .filter(fusion_pairs::task_a_id.eq(pair.first().into_inner()))
            .filter(fusion_pairs::task_b_id.eq(pair.second().into_inner()))
            .select(FusionPairRow::as_select())
            .first::<FusionPairRow>(self.conn)
            .optional()
            .map_err(TaskStoreError::persistence)?
            .map(FusionPairRow::into_fusion)
            .transpose()
    }

    fn insert_fusion_pair(&mut self, fusion: &FusionPair) -> TaskStoreResult<()> {
        diesel::insert_into(fusion_pairs::table)
            .values(&FusionPairRow::from_fusion(fusion))
            .execute(self.conn)
            .map_err(|err| map_pair_violation(err, fusion.pair))?;
        Ok(())
    }

    fn update_fusion_pair(&mut self, fusion: &FusionPair) -> TaskStoreResult<()> {
        let updated = diesel::update(fusion_pairs::table.find(fusion.id.into_inner()))
            .set(&FusionPairRow::from_fusion(fusion))
            .execute(self.conn)
            .map_err(TaskStoreError::persistence)?;
        if updated == 0 {
            return Err(TaskStoreError::RecordNotFound(format!(
                "fusion pair {}",
                fusion.id
            )));
        }
        Ok(())
    }

    fn list_fusion_pairs(
        &mut self,
        tenant_id: TenantId,
        status: Option<FusionStatus>,
    ) -> TaskStoreResult<Vec<FusionPair>> {
        let mut query = fusion_pairs::table
            .filter(fusion_pairs::tenant_id.eq(tenant_id.into_inner()))
            .order(fusion_pairs::created_at.desc())
            .select(FusionPairRow::as_select())
            .into_boxed();
        if let Some(wanted) = status {
            query = query.filter(fusion_pairs::status.eq(wanted.as_str()));
        }
        query
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?
            .into_iter()
            .map(FusionPairRow::into_fusion)
            .collect()
    }

    fn pending_fusion_pairs(&mut self) -> TaskStoreResult<Vec<FusionPair>> {
        fusion_pairs::table
            .filter(fusion_pairs::status.eq(FusionStatus::Pending.as_str()))
            .order(fusion_pairs::created_at.asc())
            .select(FusionPairRow::as_select())
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?
            .into_iter()
            .map(FusionPairRow::into_fusion)
            .collect()
    }

    fn insert_fusion_rejection(&mut self, rejection: &FusionRejection) -> TaskStoreResult<()> {
        diesel::insert_into(fusion_rejections::table)
            .values(&FusionRejectionRow::from_rejection(rejection))
            .on_conflict_do_nothing()
            .execute(self.conn)
            .map_err(TaskStoreError::persistence)?;
        Ok(())
    }

    fn is_fusion_rejected(
        &mut self,
        tenant_id: TenantId,
        pair: &TaskPair,
    ) -> TaskStoreResult<bool> {
        diesel::select(diesel::dsl::exists(
            fusion_rejections::table
                .filter(fusion_rejections::tenant_id.eq(tenant_id.into_inner()))
                .filter(fusion_rejections::task_a_id.eq(pair.first().into_inner()))
                .filter(fusion_rejections::task_b_id.eq(pair.second().into_inner())),
        ))
        .get_result(self.conn)
        .map_err(TaskStoreError::persistence)
    }

    fn insert_reservation_audit(&mut self, audit: &ReservationTaskAudit) -> TaskStoreResult<()> {
        diesel::insert_into(reservation_task_audits::table)
            .values(&AuditRow::from_audit(audit))
            .execute(self.conn)
            .map_err(TaskStoreError::persistence)?;
        Ok(())
    }

    fn audits_for_reservation(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<Vec<ReservationTaskAudit>> {
        reservation_task_audits::table
            .filter(reservation_task_audits::tenant_id.eq(tenant_id.into_inner()))
            .filter(reservation_task_audits::reservation_id.eq(reservation_id.into_inner()))
            .order(reservation_task_audits::recorded_at.asc())
            .select(AuditRow::as_select())
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?
            .into_iter()
            .map(AuditRow::into_audit)
            .collect()
    }

    fn reservation_exists(
        &mut self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> TaskStoreResult<bool> {
        diesel::select(diesel::dsl::exists(
            reservations::table
                .filter(reservations::id.eq(reservation_id.into_inner()))
                .filter(reservations::tenant_id.eq(tenant_id.into_inner())),
        ))
        .get_result(self.conn)
        .map_err(TaskStoreError::persistence)
    }

    fn auto_rules_for_property(
        &mut self,
        tenant_id: TenantId,
        property_id: PropertyId,
    ) -> TaskStoreResult<Vec<AutoRule>> {
        let mut rules = auto_rules::table
            .filter(auto_rules::tenant_id.eq(tenant_id.into_inner()))
            .filter(auto_rules::property_id.eq(property_id.into_inner()))
            .select(AutoRuleRow::as_select())
            .load(self.conn)
            .map_err(TaskStoreError::persistence)?
            .into_iter()
            .map(AutoRuleRow::into_rule)
            .collect::<TaskStoreResult<Vec<_>>>()?;
        rules.sort_by_key(|rule| rule.trigger);
        Ok(rules)
    }

    fn upsert_auto_rule(&mut self, rule: &AutoRule) -> TaskStoreResult<()> {
        diesel::delete(
            auto_rules::table
                .filter(auto_rules::tenant_id.eq(rule.tenant_id.into_inner()))
                .filter(auto_rules::property_id.eq(rule.property_id.into_inner()))
                .filter(auto_rules::trigger_type.eq(rule.trigger.as_str())),
        )
        .execute(self.conn)
        .map_err(TaskStoreError::persistence)?;
        diesel::insert_into(auto_rules::table)
            .values(&AutoRuleRow::from_rule(rule))
            .execute(self.conn)
            .map_err(TaskStoreError::persistence)?;
        Ok(())
    }
}
