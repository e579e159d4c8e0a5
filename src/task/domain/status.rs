//! Task status state machine.
//!
//! The transition table is the single source of truth: [`TaskStatus::next`]
//! and [`TaskStatus::allowed_actions`] are both derived from it, so the
//! rejection feedback returned to callers always agrees with what would have
//! been accepted.

use super::ParseDomainValueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Initial status; the task awaits validation by a manager.
    PendingValidation,
    /// Validated and ready to be worked on.
    Todo,
    /// Work is underway.
    InProgress,
    /// Work finished. Terminal.
    Completed,
    /// Task was retired without being done. Terminal.
    Cancelled,
    /// Work hit a problem that needs resolving.
    Incident,
    /// Held while a merge with another task is proposed.
    FusionSuggested,
}

/// Action requested against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    /// Accept a pending task into the work queue.
    Validate,
    /// Retire a task that has not started.
    Cancel,
    /// Begin work.
    Start,
    /// Finish work.
    Complete,
    /// Flag a problem during work.
    ReportIncident,
    /// Resolve an incident and carry on working.
    ResolveResume,
    /// Resolve an incident and close the task.
    ResolveComplete,
}

const TRANSITIONS: [(TaskStatus, TaskAction, TaskStatus); 8] = [
    (
        TaskStatus::PendingValidation,
        TaskAction::Validate,
        TaskStatus::Todo,
    ),
    (
        TaskStatus::PendingValidation,
        TaskAction::Cancel,
        TaskStatus::Cancelled,
    ),
    (TaskStatus::Todo, TaskAction::Start, TaskStatus::InProgress),
    (TaskStatus::Todo, TaskAction::Cancel, TaskStatus::Cancelled),
    (
        TaskStatus::InProgress,
        TaskAction::Complete,
        TaskStatus::Completed,
    ),
    (
        TaskStatus::InProgress,
        TaskAction::ReportIncident,
        TaskStatus::Incident,
    ),
    (
        TaskStatus::Incident,
        TaskAction::ResolveResume,
        TaskStatus::InProgress,
    ),
    (
        TaskStatus::Incident,
        TaskAction::ResolveComplete,
        TaskStatus::Completed,
    ),
];

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::PendingValidation,
        Self::Todo,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::Incident,
        Self::FusionSuggested,
    ];

    /// Returns the status reached by applying `action`, or `None` when the
    /// state machine rejects it.
    #[must_use]
    pub fn next(self, action: TaskAction) -> Option<Self> {
        TRANSITIONS
            .iter()
            .find(|(from, candidate, _)| *from == self && *candidate == action)
            .map(|(_, _, to)| *to)
    }

    /// Returns every action accepted from this status, in table order.
    ///
    /// Terminal statuses and [`TaskStatus::FusionSuggested`] accept nothing.
    #[must_use]
    pub fn allowed_actions(self) -> Vec<TaskAction> {
        TRANSITIONS
            .iter()
            .filter(|(from, _, _)| *from == self)
            .map(|(_, action, _)| *action)
            .collect()
    }

    /// Returns `true` for completed and cancelled tasks.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns `true` when reservation changes may reschedule or cancel the
    /// task automatically.
    #[must_use]
    pub const fn is_cascadable(self) -> bool {
        matches!(self, Self::PendingValidation | Self::Todo)
    }

    /// Returns `true` when the task may be proposed for a merge.
    #[must_use]
    pub const fn is_fusion_eligible(self) -> bool {
        self.is_cascadable()
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingValidation => "pending_validation",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Incident => "incident",
            Self::FusionSuggested => "fusion_suggested",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("task status", value))
    }
}

impl TaskAction {
    /// All actions understood by the state machine.
    pub const ALL: [Self; 7] = [
        Self::Validate,
        Self::Cancel,
        Self::Start,
        Self::Complete,
        Self::ReportIncident,
        Self::ResolveResume,
        Self::ResolveComplete,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Cancel => "cancel",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::ReportIncident => "report_incident",
            Self::ResolveResume => "resolve_resume",
            Self::ResolveComplete => "resolve_complete",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskAction {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("task action", value))
    }
}

/// Outcome of one accepted state machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    /// Status before the action.
    pub from: TaskStatus,
    /// Status after the action.
    pub to: TaskStatus,
    /// Applied action.
    pub action: TaskAction,
}
