//! Coarse error classification shared by every service.

use std::fmt;

/// Category of a service failure, for callers that map errors onto
/// transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced record does not exist in tenant scope.
    NotFound,
    /// The state machine rejected the action.
    InvalidTransition,
    /// The actor's administrative scope does not cover the task.
    ScopeViolation,
    /// A fusion decision arrived after its tasks moved on.
    NotEligible,
    /// The request carried invalid values.
    InvalidInput,
    /// Storage or collaborator failure.
    Internal,
}

impl ErrorKind {
    /// Returns the snake-case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidTransition => "invalid_transition",
            Self::ScopeViolation => "scope_violation",
            Self::NotEligible => "not_eligible",
            Self::InvalidInput => "invalid_input",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
