//! Reservation facts consumed by the engine and the audit rows it writes.
//!
//! Reservations themselves belong to the reservation subsystem; the engine
//! only sees the transient change notifications defined here.

use super::{AuditEntryId, ParseDomainValueError, PropertyId, ReservationId, TaskId, TenantId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Where a reservation change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationSource {
    /// Edited by a user.
    ManualEdit,
    /// Pulled from an external calendar feed.
    CalendarSync,
}

impl ReservationSource {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManualEdit => "manual_edit",
            Self::CalendarSync => "calendar_sync",
        }
    }
}

impl TryFrom<&str> for ReservationSource {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual_edit" => Ok(Self::ManualEdit),
            "calendar_sync" => Ok(Self::CalendarSync),
            _ => Err(ParseDomainValueError::new("reservation source", value)),
        }
    }
}

/// Check-in and check-out instants of a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationStay {
    /// Guest arrival.
    pub check_in: DateTime<Utc>,
    /// Guest departure.
    pub check_out: DateTime<Utc>,
}

impl ReservationStay {
    /// Creates a stay.
    #[must_use]
    pub const fn new(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Self {
        Self {
            check_in,
            check_out,
        }
    }
}

/// A reservation was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCreated {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Booked property.
    pub property_id: PropertyId,
    /// New reservation.
    pub reservation_id: ReservationId,
    /// Booked stay.
    pub stay: ReservationStay,
    /// Display name of the property.
    pub property_name: String,
    /// Display name of the guest.
    pub guest_name: String,
}

/// A reservation's dates were edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationChange {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Booked property.
    pub property_id: PropertyId,
    /// Edited reservation.
    pub reservation_id: ReservationId,
    /// Stay before the edit.
    pub previous: ReservationStay,
    /// Stay after the edit.
    pub current: ReservationStay,
    /// Origin of the edit.
    pub source: ReservationSource,
}

impl ReservationChange {
    /// Returns `true` when check-in or check-out moved.
    #[must_use]
    pub fn dates_changed(&self) -> bool {
        self.previous != self.current
    }

    /// Moves `scheduled_at` so its offset from check-in is preserved.
    #[must_use]
    pub fn shift(&self, scheduled_at: DateTime<Utc>) -> DateTime<Utc> {
        self.current.check_in + (scheduled_at - self.previous.check_in)
    }
}

/// A reservation was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCancellation {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Booked property.
    pub property_id: PropertyId,
    /// Cancelled reservation.
    pub reservation_id: ReservationId,
    /// Stay that will no longer happen.
    pub stay: ReservationStay,
    /// Origin of the cancellation.
    pub source: ReservationSource,
}

/// What the cascade did to a dependent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationAuditAction {
    /// The task was moved with the reservation.
    Rescheduled,
    /// The task was cancelled with the reservation.
    Cancelled,
    /// Work was already underway on a cancelled booking.
    AlertInProgress,
}

impl ReservationAuditAction {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rescheduled => "RESCHEDULED",
            Self::Cancelled => "CANCELLED",
            Self::AlertInProgress => "ALERT_IN_PROGRESS",
        }
    }
}

impl TryFrom<&str> for ReservationAuditAction {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "RESCHEDULED" => Ok(Self::Rescheduled),
            "CANCELLED" => Ok(Self::Cancelled),
            "ALERT_IN_PROGRESS" => Ok(Self::AlertInProgress),
            _ => Err(ParseDomainValueError::new("reservation audit action", value)),
        }
    }
}

/// Append-only record of one cascade effect on one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationTaskAudit {
    /// Audit row identifier.
    pub id: AuditEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Reservation that changed.
    pub reservation_id: ReservationId,
    /// Affected task.
    pub task_id: TaskId,
    /// What was done.
    pub action: ReservationAuditAction,
    /// Stay before the change.
    pub previous: ReservationStay,
    /// Stay after the change; absent for cancellations.
    pub current: Option<ReservationStay>,
    /// Origin of the triggering change.
    pub source: ReservationSource,
    /// When the row was written.
    pub recorded_at: DateTime<Utc>,
}

impl ReservationTaskAudit {
    /// Audit row for a task moved with its reservation.
    #[must_use]
    pub fn rescheduled(change: &ReservationChange, task_id: TaskId, clock: &impl Clock) -> Self {
        Self {
            id: AuditEntryId::new(),
            tenant_id: change.tenant_id,
            reservation_id: change.reservation_id,
            task_id,
            action: ReservationAuditAction::Rescheduled,
            previous: change.previous,
            current: Some(change.current),
            source: change.source,
            recorded_at: clock.utc(),
        }
    }

    /// Audit row for a task affected by a cancellation.
    #[must_use]
    pub fn cancellation(
        cancellation: &ReservationCancellation,
        task_id: TaskId,
        action: ReservationAuditAction,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            tenant_id: cancellation.tenant_id,
            reservation_id: cancellation.reservation_id,
            task_id,
            action,
            previous: cancellation.stay,
            current: None,
            source: cancellation.source,
            recorded_at: clock.utc(),
        }
    }
}
