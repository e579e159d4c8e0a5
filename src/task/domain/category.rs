//! Kind of operational work a task represents.

use super::ParseDomainValueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Cleaning job.
    Cleaning,
    /// Maintenance or repair job.
    Maintenance,
    /// Property inspection.
    Inspection,
    /// Guest check-in.
    CheckIn,
    /// Guest check-out.
    CheckOut,
    /// Combined turnover between two stays.
    Turnover,
    /// Anything else.
    Other,
}

impl TaskCategory {
    const ALL: [Self; 7] = [
        Self::Cleaning,
        Self::Maintenance,
        Self::Inspection,
        Self::CheckIn,
        Self::CheckOut,
        Self::Turnover,
        Self::Other,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cleaning => "cleaning",
            Self::Maintenance => "maintenance",
            Self::Inspection => "inspection",
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
            Self::Turnover => "turnover",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskCategory {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("task category", value))
    }
}
