//! Canonically ordered task pairs.

use super::{TaskDomainError, TaskId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Unordered pair of distinct tasks stored smaller-identifier first.
///
/// Conflict pairs, fusion pairs, and fusion rejections are all keyed by this
/// type, so `(a, b)` and `(b, a)` always address the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskPair {
    first: TaskId,
    second: TaskId,
}

impl TaskPair {
    /// Builds the canonical pair for two tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::SelfPair`] when both identifiers are equal.
    pub fn new(a: TaskId, b: TaskId) -> Result<Self, TaskDomainError> {
        match a.cmp(&b) {
            Ordering::Less => Ok(Self {
                first: a,
                second: b,
            }),
            Ordering::Greater => Ok(Self {
                first: b,
                second: a,
            }),
            Ordering::Equal => Err(TaskDomainError::SelfPair(a)),
        }
    }

    /// Smaller task identifier.
    #[must_use]
    pub const fn first(&self) -> TaskId {
        self.first
    }

    /// Larger task identifier.
    #[must_use]
    pub const fn second(&self) -> TaskId {
        self.second
    }

    /// Returns both identifiers in canonical order.
    #[must_use]
    pub const fn ids(&self) -> [TaskId; 2] {
        [self.first, self.second]
    }

    /// Returns `true` when `task_id` is one of the pair.
    #[must_use]
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.first == task_id || self.second == task_id
    }

    /// Returns the partner of `task_id`, or `None` when it is not a member.
    #[must_use]
    pub fn partner_of(&self, task_id: TaskId) -> Option<TaskId> {
        if self.first == task_id {
            Some(self.second)
        } else if self.second == task_id {
            Some(self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for TaskPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.first, self.second)
    }
}
