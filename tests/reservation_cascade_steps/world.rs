//! Shared world state for reservation cascade BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use turnkeep::{
    config::EngineConfig,
    task::{
        adapters::{
            events::SyncEventBus,
            memory::{InMemoryStaffDirectory, InMemoryTaskStore},
        },
        domain::{PropertyId, ReservationId, ReservationStay, TaskId, TenantId, UserId},
        services::TaskEngine,
    },
};

/// Engine type used by the BDD world.
pub type TestEngine =
    TaskEngine<InMemoryTaskStore, InMemoryStaffDirectory, SyncEventBus, DefaultClock>;

/// Scenario world for reservation cascade behaviour tests.
pub struct CascadeWorld {
    /// Engine under test, with subscribers registered.
    pub engine: TestEngine,
    /// Backing store, shared with the engine.
    pub store: Arc<InMemoryTaskStore>,
    /// Tenant owning every record.
    pub tenant_id: TenantId,
    /// Property the reservation is for.
    pub property_id: PropertyId,
    /// Acting user for manual transitions.
    pub actor_id: UserId,
    /// Reservation under test.
    pub reservation_id: ReservationId,
    /// Stay as currently known.
    pub stay: Option<ReservationStay>,
    /// Tasks by scenario label.
    pub tasks: HashMap<String, TaskId>,
}

impl CascadeWorld {
    /// Creates a world with an empty store and registered subscribers.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let engine = TaskEngine::new(
            Arc::clone(&store),
            Arc::new(InMemoryStaffDirectory::new()),
            Arc::new(SyncEventBus::new()),
            Arc::new(DefaultClock),
            &EngineConfig::default(),
        );
        engine.register_subscribers();
        Self {
            engine,
            store,
            tenant_id: TenantId::new(),
            property_id: PropertyId::new(),
            actor_id: UserId::new(),
            reservation_id: ReservationId::new(),
            stay: None,
            tasks: HashMap::new(),
        }
    }

    /// Looks up a task identifier by scenario label.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was created under `label`.
    pub fn task_id(&self, label: &str) -> Result<TaskId, eyre::Report> {
        self.tasks
            .get(label)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task labelled {label:?} in scenario world"))
    }

    /// Returns the current stay.
    ///
    /// # Errors
    ///
    /// Returns an error when the background step did not run.
    pub fn stay(&self) -> Result<ReservationStay, eyre::Report> {
        self.stay
            .ok_or_else(|| eyre::eyre!("missing reservation stay in scenario world"))
    }
}

impl Default for CascadeWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> CascadeWorld {
    CascadeWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Instant on day `day` of March 2026 at the top of `hour`.
///
/// # Errors
///
/// Returns an error for an impossible date.
pub fn on_day(day: u32, hour: u32) -> Result<DateTime<Utc>, eyre::Report> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid scenario instant: day {day} hour {hour}"))
}
