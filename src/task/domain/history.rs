//! Append-only audit trail of task transitions.

use super::{HistoryEntryId, StatusTransition, TaskAction, TaskId, TaskStatus, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Who performed a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionActor {
    actor_id: UserId,
    on_behalf_of: Option<UserId>,
}

impl TransitionActor {
    /// Actor acting for themselves.
    #[must_use]
    pub const fn direct(actor_id: UserId) -> Self {
        Self {
            actor_id,
            on_behalf_of: None,
        }
    }

    /// Actor recording an action for another user.
    #[must_use]
    pub const fn proxy(actor_id: UserId, on_behalf_of: UserId) -> Self {
        Self {
            actor_id,
            on_behalf_of: Some(on_behalf_of),
        }
    }

    /// User who performed the operation.
    #[must_use]
    pub const fn actor_id(&self) -> UserId {
        self.actor_id
    }

    /// User the action was recorded for, when proxied.
    #[must_use]
    pub const fn on_behalf_of(&self) -> Option<UserId> {
        self.on_behalf_of
    }

    /// Returns `true` for proxy actions.
    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        self.on_behalf_of.is_some()
    }
}

/// One recorded transition of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    /// Entry identifier.
    pub id: HistoryEntryId,
    /// Task the transition applied to.
    pub task_id: TaskId,
    /// Status before the transition.
    pub from_status: TaskStatus,
    /// Status after the transition.
    pub to_status: TaskStatus,
    /// Applied action.
    pub action: TaskAction,
    /// Acting user.
    pub actor_id: UserId,
    /// User the action was recorded for.
    pub on_behalf_of: Option<UserId>,
    /// Set when the action was recorded by a proxy.
    pub is_proxy: bool,
    /// Optional note supplied with the action.
    pub note: Option<String>,
    /// When the transition was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl TaskHistoryEntry {
    /// Records an accepted transition.
    #[must_use]
    pub fn record(
        task_id: TaskId,
        transition: StatusTransition,
        actor: TransitionActor,
        note: Option<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: HistoryEntryId::new(),
            task_id,
            from_status: transition.from,
            to_status: transition.to,
            action: transition.action,
            actor_id: actor.actor_id(),
            on_behalf_of: actor.on_behalf_of(),
            is_proxy: actor.is_proxy(),
            note,
            recorded_at: clock.utc(),
        }
    }
}
