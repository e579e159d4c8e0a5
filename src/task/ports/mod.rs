//! Port contracts for the task engine.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod directory;
pub mod events;
pub mod store;

pub use directory::{DirectoryError, DirectoryResult, StaffDirectory};
pub use events::{EventBus, EventHandler, EventHandlerError};
pub use store::{TaskStore, TaskStoreError, TaskStoreResult, TaskUnitOfWork};
