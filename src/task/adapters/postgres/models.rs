//! Diesel row models and their mapping to domain records.

use super::schema::{
    auto_rules, fusion_pairs, fusion_rejections, reservation_task_audits, task_conflicts,
    task_history, tasks,
};
use crate::task::{
    domain::{
        AuditEntryId, AutoRule, AutoRuleId, ConflictId, ConflictPair, FusionPair, FusionPairId,
        FusionRejection, HistoryEntryId, ParseDomainValueError, PersistedTaskData, PropertyId,
        ReservationId, ReservationStay, ReservationTaskAudit, Task, TaskHistoryEntry, TaskId,
        TaskPair, TenantId, UserId,
    },
    ports::{TaskStoreError, TaskStoreResult},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Row shared by task reads, inserts, and updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TaskRow {
    /// Task identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Property the work happens at.
    pub property_id: Uuid,
    /// Linked reservation, if any.
    pub reservation_id: Option<Uuid>,
    /// Rule that generated the task, if any.
    pub auto_rule_id: Option<Uuid>,
    /// Fusion pair holding or having merged the task.
    pub fusion_pair_id: Option<Uuid>,
    /// Trimmed title, at most `MAX_TITLE_CHARS` characters.
    pub title: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Category name as stored by `TaskCategory::as_str`.
    pub category: String,
    /// Status name as stored by `TaskStatus::as_str`.
    pub status: String,
    /// Planned start, `NULL` while unscheduled.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Planned length; positive when set.
    pub duration_minutes: Option<i32>,
    /// Assigned staff member.
    pub assigned_to: Option<Uuid>,
    /// Last system or user note.
    pub note: Option<String>,
    /// Set when work first started.
    pub started_at: Option<DateTime<Utc>>,
    /// Set on completion.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TaskRow {
    /// Encodes a task for insert or update.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] when the duration exceeds
    /// the column range.
    pub fn from_task(task: &Task) -> TaskStoreResult<Self> {
        let duration_minutes = task
            .duration_minutes()
            .map(i32::try_from)
            .transpose()
            .map_err(TaskStoreError::persistence)?;
        Ok(Self {
            id: task.id().into_inner(),
            tenant_id: task.tenant_id().into_inner(),
            property_id: task.property_id().into_inner(),
            reservation_id: task.reservation_id().map(ReservationId::into_inner),
            auto_rule_id: task.auto_rule_id().map(AutoRuleId::into_inner),
            fusion_pair_id: task.fusion_pair_id().map(FusionPairId::into_inner),
            title: task.title().to_owned(),
            description: task.description().map(str::to_owned),
            category: task.category().as_str().to_owned(),
            status: task.status().as_str().to_owned(),
            scheduled_at: task.scheduled_at(),
            duration_minutes,
            assigned_to: task.assigned_to().map(UserId::into_inner),
            note: task.note().map(str::to_owned),
            started_at: task.started_at(),
            completed_at: task.completed_at(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        })
    }

    /// Decodes a stored task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] for an unknown category or
    /// status name, or a negative duration.
    pub fn into_task(self) -> TaskStoreResult<Task> {
        let duration_minutes = self
            .duration_minutes
            .map(u32::try_from)
            .transpose()
            .map_err(TaskStoreError::persistence)?;
        Ok(Task::from_persisted(PersistedTaskData {
            id: TaskId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            property_id: PropertyId::from_uuid(self.property_id),
            reservation_id: self.reservation_id.map(ReservationId::from_uuid),
            auto_rule_id: self.auto_rule_id.map(AutoRuleId::from_uuid),
            fusion_pair_id: self.fusion_pair_id.map(FusionPairId::from_uuid),
            title: self.title,
            description: self.description,
            category: parse(&self.category)?,
            status: parse(&self.status)?,
            scheduled_at: self.scheduled_at,
            duration_minutes,
            assigned_to: self.assigned_to.map(UserId::from_uuid),
            note: self.note,
            started_at: self.started_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

/// Row for history entries.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    /// Entry identifier.
    pub id: Uuid,
    /// Task the transition applied to.
    pub task_id: Uuid,
    /// Status name before the transition.
    pub from_status: String,
    /// Status name after the transition.
    pub to_status: String,
    /// Action name as stored by `TaskAction::as_str`.
    pub action: String,
    /// User who performed the action.
    pub actor_id: Uuid,
    /// User the action was recorded for, on proxy entries.
    pub on_behalf_of: Option<Uuid>,
    /// Set when a manager recorded the action for someone else.
    pub is_proxy: bool,
    /// Note supplied with the action.
    pub note: Option<String>,
    /// When the transition was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl HistoryRow {
    /// Encodes a history entry.
    pub fn from_entry(entry: &TaskHistoryEntry) -> Self {
        Self {
            id: entry.id.into_inner(),
            task_id: entry.task_id.into_inner(),
            from_status: entry.from_status.as_str().to_owned(),
            to_status: entry.to_status.as_str().to_owned(),
            action: entry.action.as_str().to_owned(),
            actor_id: entry.actor_id.into_inner(),
            on_behalf_of: entry.on_behalf_of.map(UserId::into_inner),
            is_proxy: entry.is_proxy,
            note: entry.note.clone(),
            recorded_at: entry.recorded_at,
        }
    }

    /// Decodes a history entry.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] for an unknown status or
    /// action name.
    pub fn into_entry(self) -> TaskStoreResult<TaskHistoryEntry> {
        Ok(TaskHistoryEntry {
            id: HistoryEntryId::from_uuid(self.id),
            task_id: TaskId::from_uuid(self.task_id),
            from_status: parse(&self.from_status)?,
            to_status: parse(&self.to_status)?,
            action: parse(&self.action)?,
            actor_id: UserId::from_uuid(self.actor_id),
            on_behalf_of: self.on_behalf_of.map(UserId::from_uuid),
            is_proxy: self.is_proxy,
            note: self.note,
            recorded_at: self.recorded_at,
        })
    }
}

/// Row for conflicts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = task_conflicts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ConflictRow {
    /// Conflict identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Lower task identifier of the pair.
    pub task_a_id: Uuid,
    /// Higher task identifier of the pair.
    pub task_b_id: Uuid,
    /// `property` or `staff`.
    pub kind: String,
    /// Review status name.
    pub status: String,
    /// Resolution text once resolved.
    pub resolution: Option<String>,
    /// Detection timestamp.
    pub detected_at: DateTime<Utc>,
    /// Acknowledgement timestamp.
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ConflictRow {
    /// Encodes a conflict with its pair split across two columns.
    pub fn from_conflict(conflict: &ConflictPair) -> Self {
        Self {
            id: conflict.id.into_inner(),
            tenant_id: conflict.tenant_id.into_inner(),
            task_a_id: conflict.pair.first().into_inner(),
            task_b_id: conflict.pair.second().into_inner(),
            kind: conflict.kind.as_str().to_owned(),
            status: conflict.status.as_str().to_owned(),
            resolution: conflict.resolution.clone(),
            detected_at: conflict.detected_at,
            acknowledged_at: conflict.acknowledged_at,
            resolved_at: conflict.resolved_at,
        }
    }

    /// Decodes a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] for an unknown kind or
    /// status, or a pair naming one task twice.
    pub fn into_conflict(self) -> TaskStoreResult<ConflictPair> {
        Ok(ConflictPair {
            id: ConflictId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            pair: pair_from_columns(self.task_a_id, self.task_b_id)?,
            kind: parse(&self.kind)?,
            status: parse(&self.status)?,
            resolution: self.resolution,
            detected_at: self.detected_at,
            acknowledged_at: self.acknowledged_at,
            resolved_at: self.resolved_at,
        })
    }
}

/// Row for fusion pairs.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = fusion_pairs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct FusionPairRow {
    /// Pair identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Property both tasks belong to.
    pub property_id: Uuid,
    /// Lower task identifier of the pair.
    pub task_a_id: Uuid,
    /// Higher task identifier of the pair.
    pub task_b_id: Uuid,
    /// Decision status name.
    pub status: String,
    /// Merged task, set on acceptance.
    pub merged_task_id: Option<Uuid>,
    /// Proposal timestamp.
    pub created_at: DateTime<Utc>,
    /// Decision timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FusionPairRow {
    /// Encodes a fusion pair.
    pub fn from_fusion(fusion: &FusionPair) -> Self {
        Self {
            id: fusion.id.into_inner(),
            tenant_id: fusion.tenant_id.into_inner(),
            property_id: fusion.property_id.into_inner(),
            task_a_id: fusion.pair.first().into_inner(),
            task_b_id: fusion.pair.second().into_inner(),
            status: fusion.status.as_str().to_owned(),
            merged_task_id: fusion.merged_task_id.map(TaskId::into_inner),
            created_at: fusion.created_at,
            resolved_at: fusion.resolved_at,
        }
    }

    /// Decodes a fusion pair.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] for an unknown status or a
    /// pair naming one task twice.
    pub fn into_fusion(self) -> TaskStoreResult<FusionPair> {
        Ok(FusionPair {
            id: FusionPairId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            property_id: PropertyId::from_uuid(self.property_id),
            pair: pair_from_columns(self.task_a_id, self.task_b_id)?,
            status: parse(&self.status)?,
            merged_task_id: self.merged_task_id.map(TaskId::from_uuid),
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

/// Insert model for fusion rejections.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = fusion_rejections)]
pub struct FusionRejectionRow {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Lower task identifier of the declined pair.
    pub task_a_id: Uuid,
    /// Higher task identifier of the declined pair.
    pub task_b_id: Uuid,
    /// When the pair was declined.
    pub rejected_at: DateTime<Utc>,
}

impl FusionRejectionRow {
    /// Encodes a rejection keyed by tenant and pair.
    pub const fn from_rejection(rejection: &FusionRejection) -> Self {
        Self {
            tenant_id: rejection.tenant_id.into_inner(),
            task_a_id: rejection.pair.first().into_inner(),
            task_b_id: rejection.pair.second().into_inner(),
            rejected_at: rejection.rejected_at,
        }
    }
}

/// Row for reservation cascade audits.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reservation_task_audits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuditRow {
    /// Audit entry identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Reservation that changed.
    pub reservation_id: Uuid,
    /// Task the cascade touched.
    pub task_id: Uuid,
    /// Cascade action name.
    pub action: String,
    /// Check-in before the change.
    pub previous_check_in: DateTime<Utc>,
    /// Check-out before the change.
    pub previous_check_out: DateTime<Utc>,
    /// Check-in after the change; `NULL` for cancellations.
    pub current_check_in: Option<DateTime<Utc>>,
    /// Check-out after the change; `NULL` for cancellations.
    pub current_check_out: Option<DateTime<Utc>>,
    /// Origin of the reservation change.
    pub source: String,
    /// When the cascade ran.
    pub recorded_at: DateTime<Utc>,
}

impl AuditRow {
    /// Encodes an audit row; cancellations leave the current stay empty.
    pub fn from_audit(audit: &ReservationTaskAudit) -> Self {
        Self {
            id: audit.id.into_inner(),
            tenant_id: audit.tenant_id.into_inner(),
            reservation_id: audit.reservation_id.into_inner(),
            task_id: audit.task_id.into_inner(),
            action: audit.action.as_str().to_owned(),
            previous_check_in: audit.previous.check_in,
            previous_check_out: audit.previous.check_out,
            current_check_in: audit.current.map(|stay| stay.check_in),
            current_check_out: audit.current.map(|stay| stay.check_out),
            source: audit.source.as_str().to_owned(),
            recorded_at: audit.recorded_at,
        }
    }

    /// Decodes an audit row. A half-filled current stay reads as none.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] for an unknown action or
    /// source name.
    pub fn into_audit(self) -> TaskStoreResult<ReservationTaskAudit> {
        let current = match (self.current_check_in, self.current_check_out) {
            (Some(check_in), Some(check_out)) => Some(ReservationStay::new(check_in, check_out)),
            _ => None,
        };
        Ok(ReservationTaskAudit {
            id: AuditEntryId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            reservation_id: ReservationId::from_uuid(self.reservation_id),
            task_id: TaskId::from_uuid(self.task_id),
            action: parse(&self.action)?,
            previous: ReservationStay::new(self.previous_check_in, self.previous_check_out),
            current,
            source: parse(&self.source)?,
            recorded_at: self.recorded_at,
        })
    }
}

/// Row for automation rules.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = auto_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AutoRuleRow {
    /// Rule identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Property the rule applies to.
    pub property_id: Uuid,
    /// Trigger name; one rule per trigger and property.
    pub trigger_type: String,
    /// Disabled rules generate nothing.
    pub enabled: bool,
    /// Hours from the trigger instant to the task start; may be negative.
    pub offset_hours: i32,
    /// Minijinja template for generated titles.
    pub title_template: String,
}

impl AutoRuleRow {
    /// Encodes an automation rule.
    pub fn from_rule(rule: &AutoRule) -> Self {
        Self {
            id: rule.id.into_inner(),
            tenant_id: rule.tenant_id.into_inner(),
            property_id: rule.property_id.into_inner(),
            trigger_type: rule.trigger.as_str().to_owned(),
            enabled: rule.enabled,
            offset_hours: rule.offset_hours,
            title_template: rule.title_template.clone(),
        }
    }

    /// Decodes an automation rule.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] for an unknown trigger name.
    pub fn into_rule(self) -> TaskStoreResult<AutoRule> {
        Ok(AutoRule {
            id: AutoRuleId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            property_id: PropertyId::from_uuid(self.property_id),
            trigger: parse(&self.trigger_type)?,
            enabled: self.enabled,
            offset_hours: self.offset_hours,
            title_template: self.title_template,
        })
    }
}

fn parse<T>(value: &str) -> TaskStoreResult<T>
where
    T: for<'a> TryFrom<&'a str, Error = ParseDomainValueError>,
{
    T::try_from(value).map_err(TaskStoreError::persistence)
}

fn pair_from_columns(task_a_id: Uuid, task_b_id: Uuid) -> TaskStoreResult<TaskPair> {
    TaskPair::new(TaskId::from_uuid(task_a_id), TaskId::from_uuid(task_b_id))
        .map_err(TaskStoreError::persistence)
}
