//! Shared world state for task lifecycle BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use turnkeep::task::{
    adapters::{
        events::SyncEventBus,
        memory::{InMemoryStaffDirectory, InMemoryTaskStore},
    },
    domain::{PropertyId, Task, TenantId, UserId},
    services::{TaskLifecycleResult, TaskLifecycleService},
};

/// Lifecycle service type used by the BDD world.
pub type TestLifecycleService =
    TaskLifecycleService<InMemoryTaskStore, InMemoryStaffDirectory, SyncEventBus, DefaultClock>;

/// Scenario world for task lifecycle behaviour tests.
pub struct LifecycleWorld {
    /// Service under test.
    pub service: TestLifecycleService,
    /// Directory consulted for proxy scope.
    pub directory: Arc<InMemoryStaffDirectory>,
    /// Tenant owning the task.
    pub tenant_id: TenantId,
    /// Property the task belongs to.
    pub property_id: PropertyId,
    /// User applying actions.
    pub actor_id: UserId,
    /// Latest successfully stored version of the task.
    pub task: Option<Task>,
    /// Result of the most recent action.
    pub last_result: Option<TaskLifecycleResult<Task>>,
}

impl LifecycleWorld {
    /// Creates a world backed by empty in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let directory = Arc::new(InMemoryStaffDirectory::new());
        let service = TaskLifecycleService::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::clone(&directory),
            Arc::new(SyncEventBus::new()),
            Arc::new(DefaultClock),
        );
        Self {
            service,
            directory,
            tenant_id: TenantId::new(),
            property_id: PropertyId::new(),
            actor_id: UserId::new(),
            task: None,
            last_result: None,
        }
    }

    /// Returns the task created by the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was created.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing created task in scenario world"))
    }

    /// Records an action result, keeping the task current on success.
    pub fn record(&mut self, result: TaskLifecycleResult<Task>) {
        if let Ok(ref updated) = result {
            self.task = Some(updated.clone());
        }
        self.last_result = Some(result);
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
