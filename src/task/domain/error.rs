//! Error types for task domain validation and parsing.

use super::{TaskAction, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task title exceeds the storable length.
    #[error("task title has {length} characters, at most {max} are allowed")]
    TitleTooLong {
        /// Characters in the trimmed title.
        length: usize,
        /// Largest accepted length.
        max: usize,
    },

    /// The task duration is zero.
    #[error("task duration must be a positive number of minutes")]
    InvalidDuration,

    /// The state machine rejected the requested action.
    #[error("cannot {action} task {task_id} while it is {current}")]
    InvalidTransition {
        /// Task the action was applied to.
        task_id: TaskId,
        /// Status the task remains in.
        current: TaskStatus,
        /// Rejected action.
        action: TaskAction,
        /// Actions the state machine accepts from `current`.
        allowed: Vec<TaskAction>,
    },

    /// A pair was built from the same task twice.
    #[error("task {0} cannot be paired with itself")]
    SelfPair(TaskId),
}

/// Error returned while parsing persisted enumeration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseDomainValueError {
    /// Name of the enumeration being parsed.
    pub kind: &'static str,
    /// Raw value that failed to parse.
    pub value: String,
}

impl ParseDomainValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
