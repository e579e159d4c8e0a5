//! Recorded overlaps between scheduled tasks.

use super::{ConflictId, ParseDomainValueError, TaskPair, TenantId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// What the overlapping tasks share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Same property, overlapping intervals.
    Property,
    /// Same assigned staff member, overlapping intervals.
    Staff,
}

impl ConflictKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Staff => "staff",
        }
    }
}

impl TryFrom<&str> for ConflictKind {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "property" => Ok(Self::Property),
            "staff" => Ok(Self::Staff),
            _ => Err(ParseDomainValueError::new("conflict kind", value)),
        }
    }
}

/// Review status of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    /// Found by the detector.
    Detected,
    /// Seen by a human.
    Acknowledged,
    /// Closed with a resolution.
    Resolved,
}

impl ConflictStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detected => "detected",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }
}

impl TryFrom<&str> for ConflictStatus {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detected" => Ok(Self::Detected),
            "acknowledged" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseDomainValueError::new("conflict status", value)),
        }
    }
}

/// Detected overlap between two tasks of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPair {
    /// Conflict identifier.
    pub id: ConflictId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Overlapping tasks in canonical order.
    pub pair: TaskPair,
    /// What the tasks share.
    pub kind: ConflictKind,
    /// Review status.
    pub status: ConflictStatus,
    /// Free-text resolution, once resolved.
    pub resolution: Option<String>,
    /// When the overlap was detected.
    pub detected_at: DateTime<Utc>,
    /// When a human acknowledged it.
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// When it was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ConflictPair {
    /// Records a newly detected overlap.
    #[must_use]
    pub fn detected(
        tenant_id: TenantId,
        pair: TaskPair,
        kind: ConflictKind,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            tenant_id,
            pair,
            kind,
            status: ConflictStatus::Detected,
            resolution: None,
            detected_at: clock.utc(),
            acknowledged_at: None,
            resolved_at: None,
        }
    }

    /// Marks a detected conflict as acknowledged.
    ///
    /// Returns `false` and leaves the record unchanged in any other status.
    pub fn acknowledge(&mut self, clock: &impl Clock) -> bool {
        if self.status != ConflictStatus::Detected {
            return false;
        }
        self.status = ConflictStatus::Acknowledged;
        self.acknowledged_at = Some(clock.utc());
        true
    }

    /// Closes an open conflict with a resolution.
    ///
    /// Returns `false` and leaves the record unchanged when already resolved.
    pub fn resolve(&mut self, resolution: impl Into<String>, clock: &impl Clock) -> bool {
        if self.status == ConflictStatus::Resolved {
            return false;
        }
        self.status = ConflictStatus::Resolved;
        self.resolution = Some(resolution.into());
        self.resolved_at = Some(clock.utc());
        true
    }
}
