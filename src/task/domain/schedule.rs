//! Interval arithmetic for scheduled work.

use chrono::{DateTime, Duration, Utc};

/// Duration assumed for tasks that do not record one.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Scheduling defaults applied when comparing task intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    default_duration_minutes: u32,
}

impl SchedulingPolicy {
    /// Creates a policy with the given fallback duration.
    #[must_use]
    pub const fn new(default_duration_minutes: u32) -> Self {
        Self {
            default_duration_minutes,
        }
    }

    /// Returns the fallback duration in minutes.
    #[must_use]
    pub const fn default_duration_minutes(self) -> u32 {
        self.default_duration_minutes
    }

    /// Resolves an optional duration against the fallback.
    #[must_use]
    pub fn effective_duration(self, duration_minutes: Option<u32>) -> u32 {
        duration_minutes.unwrap_or(self.default_duration_minutes)
    }

    /// Builds the interval a task occupies.
    #[must_use]
    pub fn window(self, start: DateTime<Utc>, duration_minutes: Option<u32>) -> ScheduleWindow {
        ScheduleWindow::new(start, self.effective_duration(duration_minutes))
    }

    /// Builds the interval an existing task blocks when a candidate is
    /// checked against it: never shorter than the fallback duration.
    #[must_use]
    pub fn blocking_window(
        self,
        start: DateTime<Utc>,
        duration_minutes: Option<u32>,
    ) -> ScheduleWindow {
        ScheduleWindow::new(
            start,
            self.effective_duration(duration_minutes)
                .max(self.default_duration_minutes),
        )
    }
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MINUTES)
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ScheduleWindow {
    /// Creates the interval starting at `start` and lasting `duration_minutes`.
    #[must_use]
    pub fn new(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    /// Interval start (inclusive).
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Interval end (exclusive).
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns `true` when both intervals share at least one instant.
    ///
    /// Touching endpoints do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Absolute distance between two instants.
#[must_use]
pub fn gap_between(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    (a - b).abs()
}
