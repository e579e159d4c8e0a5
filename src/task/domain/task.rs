//! Task aggregate root.

use super::{
    AutoRuleId, FusionPairId, PropertyId, ReservationId, StatusTransition, TaskAction,
    TaskCategory, TaskDomainError, TaskId, TaskStatus, TenantId, UserId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Longest accepted task title, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

/// Shortens a generated title to [`MAX_TITLE_CHARS`], marking the cut with
/// an ellipsis.
#[must_use]
pub fn fit_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_owned();
    }
    let mut fitted: String = trimmed
        .chars()
        .take(MAX_TITLE_CHARS.saturating_sub(1))
        .collect();
    fitted.truncate(fitted.trim_end().len());
    fitted.push('…');
    fitted
}

/// Unit of schedulable operational work at a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    tenant_id: TenantId,
    property_id: PropertyId,
    reservation_id: Option<ReservationId>,
    auto_rule_id: Option<AutoRuleId>,
    fusion_pair_id: Option<FusionPairId>,
    title: String,
    description: Option<String>,
    category: TaskCategory,
    status: TaskStatus,
    scheduled_at: Option<DateTime<Utc>>,
    duration_minutes: Option<u32>,
    assigned_to: Option<UserId>,
    note: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Property the work happens at.
    pub property_id: PropertyId,
    /// Human-readable title.
    pub title: String,
    /// Kind of work.
    pub category: TaskCategory,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Optional scheduled start.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Optional expected duration in minutes.
    pub duration_minutes: Option<u32>,
    /// Originating reservation, if any.
    pub reservation_id: Option<ReservationId>,
    /// Originating automation rule, if any.
    pub auto_rule_id: Option<AutoRuleId>,
}

impl NewTask {
    /// Creates a parameter object with the required fields.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        property_id: PropertyId,
        title: impl Into<String>,
        category: TaskCategory,
    ) -> Self {
        Self {
            tenant_id,
            property_id,
            title: title.into(),
            category,
            description: None,
            scheduled_at: None,
            duration_minutes: None,
            reservation_id: None,
            auto_rule_id: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the scheduled start.
    #[must_use]
    pub const fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Sets the expected duration.
    #[must_use]
    pub const fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Links the originating reservation.
    #[must_use]
    pub const fn for_reservation(mut self, reservation_id: ReservationId) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }

    /// Links the originating automation rule.
    #[must_use]
    pub const fn from_auto_rule(mut self, auto_rule_id: AutoRuleId) -> Self {
        self.auto_rule_id = Some(auto_rule_id);
        self
    }
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Property the work happens at.
    pub property_id: PropertyId,
    /// Originating reservation.
    pub reservation_id: Option<ReservationId>,
    /// Originating automation rule.
    pub auto_rule_id: Option<AutoRuleId>,
    /// Fusion pair the task belongs to.
    pub fusion_pair_id: Option<FusionPairId>,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Category.
    pub category: TaskCategory,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Scheduled start.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Duration in minutes.
    pub duration_minutes: Option<u32>,
    /// Assigned staff member.
    pub assigned_to: Option<UserId>,
    /// Free-text note.
    pub note: Option<String>,
    /// Work start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Work completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task in [`TaskStatus::PendingValidation`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] for a blank title,
    /// [`TaskDomainError::TitleTooLong`] for a title over
    /// [`MAX_TITLE_CHARS`], and [`TaskDomainError::InvalidDuration`] for a
    /// zero duration.
    pub fn new(params: NewTask, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let title = params.title.trim();
        if title.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        let length = title.chars().count();
        if length > MAX_TITLE_CHARS {
            return Err(TaskDomainError::TitleTooLong {
                length,
                max: MAX_TITLE_CHARS,
            });
        }
        if params.duration_minutes == Some(0) {
            return Err(TaskDomainError::InvalidDuration);
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            tenant_id: params.tenant_id,
            property_id: params.property_id,
            reservation_id: params.reservation_id,
            auto_rule_id: params.auto_rule_id,
            fusion_pair_id: None,
            title: title.to_owned(),
            description: params.description,
            category: params.category,
            status: TaskStatus::PendingValidation,
            scheduled_at: params.scheduled_at,
            duration_minutes: params.duration_minutes,
            assigned_to: None,
            note: None,
            started_at: None,
            completed_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            tenant_id: data.tenant_id,
            property_id: data.property_id,
            reservation_id: data.reservation_id,
            auto_rule_id: data.auto_rule_id,
            fusion_pair_id: data.fusion_pair_id,
            title: data.title,
            description: data.description,
            category: data.category,
            status: data.status,
            scheduled_at: data.scheduled_at,
            duration_minutes: data.duration_minutes,
            assigned_to: data.assigned_to,
            note: data.note,
            started_at: data.started_at,
            completed_at: data.completed_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the property the work happens at.
    #[must_use]
    pub const fn property_id(&self) -> PropertyId {
        self.property_id
    }

    /// Returns the originating reservation, if any.
    #[must_use]
    pub const fn reservation_id(&self) -> Option<ReservationId> {
        self.reservation_id
    }

    /// Returns the originating automation rule, if any.
    #[must_use]
    pub const fn auto_rule_id(&self) -> Option<AutoRuleId> {
        self.auto_rule_id
    }

    /// Returns the fusion pair the task is or was part of.
    #[must_use]
    pub const fn fusion_pair_id(&self) -> Option<FusionPairId> {
        self.fusion_pair_id
    }

    /// Returns the trimmed title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the category.
    #[must_use]
    pub const fn category(&self) -> TaskCategory {
        self.category
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the planned start, or `None` while unscheduled.
    #[must_use]
    pub const fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled_at
    }

    /// Returns the recorded duration. Scheduling checks fall back to the
    /// policy default when it is unset.
    #[must_use]
    pub const fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }

    /// Returns the assigned staff member.
    #[must_use]
    pub const fn assigned_to(&self) -> Option<UserId> {
        self.assigned_to
    }

    /// Returns the most recent note, such as the one a reservation cascade
    /// leaves.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Returns when work first started; a resumed task keeps the first
    /// start.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when work completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a state machine action.
    ///
    /// `start` stamps `started_at` if unset. Reaching
    /// [`TaskStatus::Completed`] stamps `completed_at` and, when the task was
    /// started, replaces the duration with the elapsed wall time rounded to
    /// the nearest minute.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] carrying the unchanged
    /// status and the allowed actions when the table has no matching row.
    pub fn apply(
        &mut self,
        action: TaskAction,
        clock: &impl Clock,
    ) -> Result<StatusTransition, TaskDomainError> {
        let from = self.status;
        let to = from
            .next(action)
            .ok_or_else(|| TaskDomainError::InvalidTransition {
                task_id: self.id,
                current: from,
                action,
                allowed: from.allowed_actions(),
            })?;

        let now = clock.utc();
        if action == TaskAction::Start && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if to == TaskStatus::Completed {
            self.completed_at = Some(now);
            if let Some(started_at) = self.started_at {
                self.duration_minutes = Some(elapsed_minutes(started_at, now));
            }
        }
        self.status = to;
        self.updated_at = now;

        Ok(StatusTransition { from, to, action })
    }

    /// Assigns the task to a staff member.
    pub fn assign(&mut self, user_id: UserId, clock: &impl Clock) {
        self.assigned_to = Some(user_id);
        self.touch(clock);
    }

    /// Moves the task to a new start time and records why.
    pub fn reschedule(&mut self, at: DateTime<Utc>, note: impl Into<String>, clock: &impl Clock) {
        self.scheduled_at = Some(at);
        self.note = Some(note.into());
        self.touch(clock);
    }

    /// Holds the task while a merge with another task is proposed.
    pub fn hold_for_fusion(&mut self, pair_id: FusionPairId, clock: &impl Clock) {
        self.status = TaskStatus::FusionSuggested;
        self.fusion_pair_id = Some(pair_id);
        self.touch(clock);
    }

    /// Returns a task held for fusion to the start of the lifecycle.
    pub fn release_from_fusion(&mut self, clock: &impl Clock) {
        self.status = TaskStatus::PendingValidation;
        self.fusion_pair_id = None;
        self.touch(clock);
    }

    /// Retires a task absorbed into a merged task.
    ///
    /// The fusion pair reference is kept for traceability.
    pub fn retire_after_fusion(&mut self, clock: &impl Clock) {
        self.status = TaskStatus::Cancelled;
        self.touch(clock);
    }

    /// Cancels the task on behalf of the system with an explanatory note.
    pub fn cancel_with_note(&mut self, note: impl Into<String>, clock: &impl Clock) {
        self.status = TaskStatus::Cancelled;
        self.note = Some(note.into());
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

fn elapsed_minutes(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> u32 {
    let seconds = (completed_at - started_at).num_seconds().max(0);
    let minutes = (seconds + 30).div_euclid(60);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
