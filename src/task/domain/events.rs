//! Domain events exchanged over the event bus.

use super::{
    PropertyId, ReservationCancellation, ReservationChange, ReservationCreated, TaskAction, TaskId,
    TaskStatus, TenantId, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Subscription key for a [`DomainEvent`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// `task.created`
    TaskCreated,
    /// `task.assigned`
    TaskAssigned,
    /// `task.stateChanged`
    TaskStateChanged,
    /// `task.incidentReported`
    TaskIncidentReported,
    /// `task.conflictDetected`
    TaskConflictDetected,
    /// `reservation.created`
    ReservationCreated,
    /// `reservation.updated`
    ReservationUpdated,
    /// `reservation.cancelled`
    ReservationCancelled,
}

impl EventKind {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TaskCreated => "task.created",
            Self::TaskAssigned => "task.assigned",
            Self::TaskStateChanged => "task.stateChanged",
            Self::TaskIncidentReported => "task.incidentReported",
            Self::TaskConflictDetected => "task.conflictDetected",
            Self::ReservationCreated => "reservation.created",
            Self::ReservationUpdated => "reservation.updated",
            Self::ReservationCancelled => "reservation.cancelled",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of `task.created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    /// New task.
    pub task_id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Task property.
    pub property_id: PropertyId,
}

/// Payload of `task.assigned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssigned {
    /// Assigned task.
    pub task_id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// New assignee.
    pub assigned_user_id: UserId,
}

/// Payload of `task.stateChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStateChanged {
    /// Transitioned task.
    pub task_id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Status before the action.
    pub previous_status: TaskStatus,
    /// Status after the action.
    pub new_status: TaskStatus,
    /// Applied action.
    pub action: TaskAction,
    /// Acting user.
    pub actor_id: UserId,
}

/// Payload of `task.incidentReported`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIncidentReported {
    /// Task in incident.
    pub task_id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Task property.
    pub property_id: PropertyId,
    /// Reporting user.
    pub actor_id: UserId,
}

/// Payload of `task.conflictDetected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConflictDetected {
    /// Task the detection ran for.
    pub task_id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Tasks overlapping it.
    pub conflicting_task_ids: Vec<TaskId>,
}

/// Event published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// A task was created.
    TaskCreated(TaskCreated),
    /// A task was assigned.
    TaskAssigned(TaskAssigned),
    /// A task changed status through the state machine.
    TaskStateChanged(TaskStateChanged),
    /// A task entered incident.
    TaskIncidentReported(TaskIncidentReported),
    /// Overlapping tasks were found.
    TaskConflictDetected(TaskConflictDetected),
    /// A reservation was created.
    ReservationCreated(ReservationCreated),
    /// A reservation was edited.
    ReservationUpdated(ReservationChange),
    /// A reservation was cancelled.
    ReservationCancelled(ReservationCancellation),
}

impl DomainEvent {
    /// Subscription key of the event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::TaskCreated(_) => EventKind::TaskCreated,
            Self::TaskAssigned(_) => EventKind::TaskAssigned,
            Self::TaskStateChanged(_) => EventKind::TaskStateChanged,
            Self::TaskIncidentReported(_) => EventKind::TaskIncidentReported,
            Self::TaskConflictDetected(_) => EventKind::TaskConflictDetected,
            Self::ReservationCreated(_) => EventKind::ReservationCreated,
            Self::ReservationUpdated(_) => EventKind::ReservationUpdated,
            Self::ReservationCancelled(_) => EventKind::ReservationCancelled,
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Serializes the payload for transports that carry JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when a payload cannot be encoded.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::TaskCreated(payload) => serde_json::to_value(payload),
            Self::TaskAssigned(payload) => serde_json::to_value(payload),
            Self::TaskStateChanged(payload) => serde_json::to_value(payload),
            Self::TaskIncidentReported(payload) => serde_json::to_value(payload),
            Self::TaskConflictDetected(payload) => serde_json::to_value(payload),
            Self::ReservationCreated(payload) => serde_json::to_value(payload),
            Self::ReservationUpdated(payload) => serde_json::to_value(payload),
            Self::ReservationCancelled(payload) => serde_json::to_value(payload),
        }
    }
}
