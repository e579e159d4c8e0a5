//! Domain model for task lifecycle and scheduling.
//!
//! Everything in this module is pure: the state machine, interval
//! arithmetic, canonical pairing, and the records written by the services.
//! Infrastructure concerns stay outside of the domain boundary.

mod auto_rule;
mod category;
mod conflict;
mod error;
mod events;
mod fusion;
mod history;
mod ids;
mod pair;
mod reservation;
mod schedule;
mod status;
mod task;

pub use auto_rule::{AutoRule, TemplateToken, TriggerType};
pub use category::TaskCategory;
pub use conflict::{ConflictKind, ConflictPair, ConflictStatus};
pub use error::{ParseDomainValueError, TaskDomainError};
pub use events::{
    DomainEvent, EventKind, TaskAssigned, TaskConflictDetected, TaskCreated,
    TaskIncidentReported, TaskStateChanged,
};
pub use fusion::{
    DEFAULT_FUSION_WINDOW_MINUTES, DEFAULT_MERGE_RATIO_PERCENT, FusionPair, FusionPolicy,
    FusionRejection, FusionStatus,
};
pub use history::{TaskHistoryEntry, TransitionActor};
pub use ids::{
    AuditEntryId, AutoRuleId, ConflictId, FusionPairId, HistoryEntryId, PropertyId,
    ReservationId, TaskId, TenantId, UserId,
};
pub use pair::TaskPair;
pub use reservation::{
    ReservationAuditAction, ReservationCancellation, ReservationChange, ReservationCreated,
    ReservationSource, ReservationStay, ReservationTaskAudit,
};
pub use schedule::{DEFAULT_DURATION_MINUTES, ScheduleWindow, SchedulingPolicy, gap_between};
pub use status::{StatusTransition, TaskAction, TaskStatus};
pub use task::{MAX_TITLE_CHARS, NewTask, PersistedTaskData, Task, fit_title};
