//! Application services for the task engine.
//!
//! Each service runs its reads and writes inside one store transaction and
//! publishes domain events only after the transaction commits.

mod autogen;
mod cascade;
mod conflict;
mod engine;
mod error;
mod fusion;
mod lifecycle;
mod subscribers;

pub use autogen::{AutoGenerationError, AutoGenerationEvaluator, AutoGenerationResult};
pub use cascade::{
    CANCELLED_NOTE, CancellationOutcome, CascadeError, CascadeResult, RESCHEDULED_NOTE,
    ReservationCascadeHandler, RescheduleOutcome,
};
pub use conflict::{ConflictDetector, ConflictError, ConflictCandidate, ConflictResult};
pub use engine::TaskEngine;
pub use error::ErrorKind;
pub use fusion::{
    FusionAcceptance, FusionEngine, FusionError, FusionRejectionOutcome, FusionResult,
};
pub use lifecycle::{
    AssignmentRequest, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
    TransitionRequest,
};
pub use subscribers::{
    AutoGenerationSubscriber, CascadeSubscriber, ConflictSubscriber, FusionSubscriber,
};
