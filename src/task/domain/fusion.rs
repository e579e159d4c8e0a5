//! Proposed and completed merges of nearby tasks.

use super::{
    FusionPairId, ParseDomainValueError, PropertyId, TaskId, TaskPair, TenantId, gap_between,
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Default half-width of the fusion search window.
pub const DEFAULT_FUSION_WINDOW_MINUTES: u32 = 240;

/// Default share of the summed durations kept by a merged task.
pub const DEFAULT_MERGE_RATIO_PERCENT: u32 = 70;

/// Policy constants governing fusion proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionPolicy {
    window: Duration,
    merge_ratio_percent: u32,
}

impl FusionPolicy {
    /// Creates a policy from a window half-width and a merge ratio.
    #[must_use]
    pub fn new(window_minutes: u32, merge_ratio_percent: u32) -> Self {
        Self {
            window: Duration::minutes(i64::from(window_minutes)),
            merge_ratio_percent,
        }
    }

    /// Half-width of the search window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Share of the summed durations kept by a merged task.
    #[must_use]
    pub const fn merge_ratio_percent(&self) -> u32 {
        self.merge_ratio_percent
    }

    /// Returns `true` when two start times are close enough to merge.
    #[must_use]
    pub fn is_within_window(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        gap_between(a, b) < self.window
    }

    /// Duration of the merged task, rounded to the nearest minute.
    #[must_use]
    pub fn merged_duration(&self, first_minutes: u32, second_minutes: u32) -> u32 {
        let total = u64::from(first_minutes) + u64::from(second_minutes);
        let scaled = (total * u64::from(self.merge_ratio_percent) + 50).div_euclid(100);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FUSION_WINDOW_MINUTES, DEFAULT_MERGE_RATIO_PERCENT)
    }
}

/// Decision status of a fusion proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStatus {
    /// Awaiting a decision.
    Pending,
    /// Merged into a new task.
    Accepted,
    /// Declined by a user.
    Rejected,
    /// Dropped because the tasks drifted apart.
    Withdrawn,
}

impl FusionStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl TryFrom<&str> for FusionStatus {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            _ => Err(ParseDomainValueError::new("fusion status", value)),
        }
    }
}

/// Proposed merge of two tasks at one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionPair {
    /// Pair identifier.
    pub id: FusionPairId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Property both tasks belong to.
    pub property_id: PropertyId,
    /// Constituent tasks in canonical order.
    pub pair: TaskPair,
    /// Decision status.
    pub status: FusionStatus,
    /// Merged task, set on acceptance.
    pub merged_task_id: Option<TaskId>,
    /// When the proposal was made.
    pub created_at: DateTime<Utc>,
    /// When a decision was reached.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FusionPair {
    /// Creates a pending proposal.
    #[must_use]
    pub fn propose(
        tenant_id: TenantId,
        property_id: PropertyId,
        pair: TaskPair,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: FusionPairId::new(),
            tenant_id,
            property_id,
            pair,
            status: FusionStatus::Pending,
            merged_task_id: None,
            created_at: clock.utc(),
            resolved_at: None,
        }
    }

    /// Returns `true` while awaiting a decision.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == FusionStatus::Pending
    }

    /// Records acceptance and the merged task.
    pub fn accept(&mut self, merged_task_id: TaskId, clock: &impl Clock) {
        self.merged_task_id = Some(merged_task_id);
        self.close(FusionStatus::Accepted, clock);
    }

    /// Records a rejection.
    pub fn reject(&mut self, clock: &impl Clock) {
        self.close(FusionStatus::Rejected, clock);
    }

    /// Records a withdrawal.
    pub fn withdraw(&mut self, clock: &impl Clock) {
        self.close(FusionStatus::Withdrawn, clock);
    }

    fn close(&mut self, status: FusionStatus, clock: &impl Clock) {
        self.status = status;
        self.resolved_at = Some(clock.utc());
    }
}

/// Permanent record that a user declined to merge a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionRejection {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Declined pair.
    pub pair: TaskPair,
    /// When the pair was declined.
    pub rejected_at: DateTime<Utc>,
}

impl FusionRejection {
    /// Records a rejection now.
    #[must_use]
    pub fn record(tenant_id: TenantId, pair: TaskPair, clock: &impl Clock) -> Self {
        Self {
            tenant_id,
            pair,
            rejected_at: clock.utc(),
        }
    }
}
