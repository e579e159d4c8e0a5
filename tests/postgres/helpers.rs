//! Shared test helpers for `PostgreSQL` integration tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use super::cluster::{ManagedCluster, TemporaryDatabase};
use chrono::{DateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use tokio::runtime::Runtime;
use turnkeep::task::{
    adapters::{events::SyncEventBus, postgres::PostgresTaskStore},
    domain::{
        FusionPolicy, NewTask, PropertyId, SchedulingPolicy, Task, TaskCategory, TenantId, UserId,
    },
    ports::{TaskStore, TaskStoreError, TaskUnitOfWork},
    services::{FusionEngine, ReservationCascadeHandler},
};
use uuid::Uuid;

/// SQL creating the task engine schema.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_task_engine/up.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "turnkeep_test_template";

/// Builds the runtime used to drive async store calls from sync tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| Box::new(err) as BoxError)
}

/// Instant on day `day` of April 2026.
///
/// # Panics
///
/// Panics if the arguments do not form a valid time.
#[must_use]
pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut conn = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_SCHEMA_SQL)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Store on a fresh database cloned from the migrated template.
///
/// Fields drop in declaration order, so the pool closes before the
/// database is dropped.
pub struct PreparedStore {
    /// Store under test.
    pub store: Arc<PostgresTaskStore>,
    /// Database backing the store.
    pub database: TemporaryDatabase,
    /// Runtime driving the store's async API.
    pub runtime: Runtime,
    /// Tenant used by every seeded row.
    pub tenant_id: TenantId,
    /// Property used by every seeded task.
    pub property_id: PropertyId,
    /// Actor recorded in history rows.
    pub actor_id: UserId,
}

/// Creates a database from the template and a store over it.
///
/// # Errors
///
/// Returns an error if template creation, database setup, or pool
/// construction fails.
pub fn prepare_store(cluster: &'static ManagedCluster) -> Result<PreparedStore, BoxError> {
    cluster.ensure_template_exists(TEMPLATE_DB, apply_migrations)?;
    let database = cluster.temporary_database_from_template(
        &format!("test_{}", Uuid::new_v4().simple()),
        TEMPLATE_DB,
    )?;

    let manager = ConnectionManager::<PgConnection>::new(database.url());
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .map_err(|err| Box::new(err) as BoxError)?;

    Ok(PreparedStore {
        store: Arc::new(PostgresTaskStore::new(pool)),
        database,
        runtime: test_runtime()?,
        tenant_id: TenantId::new(),
        property_id: PropertyId::new(),
        actor_id: UserId::new(),
    })
}

/// Prepared store, or `None` when no cluster is available.
///
/// # Panics
///
/// Panics if the cluster started but the store could not be prepared.
#[fixture]
pub fn prepared_store(postgres_cluster: Option<PostgresCluster>) -> Option<PreparedStore> {
    postgres_cluster.map(|cluster| prepare_store(cluster).expect("store setup"))
}

impl PreparedStore {
    /// Runs one statement against the test database.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn execute_sql(&self, sql: &str) -> Result<(), BoxError> {
        let mut conn = PgConnection::establish(&self.database.url())
            .map_err(|err| Box::new(err) as BoxError)?;
        conn.batch_execute(sql)
            .map_err(|err| Box::new(err) as BoxError)?;
        Ok(())
    }

    /// Cleaning task at the prepared property.
    #[must_use]
    pub fn params(&self, title: &str, start: DateTime<Utc>) -> NewTask {
        NewTask::new(self.tenant_id, self.property_id, title, TaskCategory::Cleaning)
            .scheduled_at(start)
    }

    /// Inserts a task in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is invalid or the insert fails.
    pub fn seed(&self, params: NewTask) -> Result<Task, BoxError> {
        let task = Task::new(params, &DefaultClock).map_err(|err| Box::new(err) as BoxError)?;
        let stored = task.clone();
        self.run(move |uow| uow.insert_task(&stored))?;
        Ok(task)
    }

    /// Runs `work` in one store transaction on the prepared runtime.
    ///
    /// # Errors
    ///
    /// Returns the store error raised by `work` or the commit.
    pub fn run<T, F>(&self, work: F) -> Result<T, TaskStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn TaskUnitOfWork) -> Result<T, TaskStoreError> + Send + 'static,
    {
        self.runtime.block_on(self.store.transaction(work))
    }

    /// Cascade handler over the prepared store.
    #[must_use]
    pub fn cascade(
        &self,
    ) -> ReservationCascadeHandler<PostgresTaskStore, SyncEventBus, DefaultClock> {
        ReservationCascadeHandler::new(
            Arc::clone(&self.store),
            Arc::new(SyncEventBus::new()),
            Arc::new(DefaultClock),
            SchedulingPolicy::default(),
        )
    }

    /// Fusion engine over the prepared store.
    #[must_use]
    pub fn fusion(&self) -> FusionEngine<PostgresTaskStore, SyncEventBus, DefaultClock> {
        FusionEngine::new(
            Arc::clone(&self.store),
            Arc::new(SyncEventBus::new()),
            Arc::new(DefaultClock),
            FusionPolicy::default(),
            SchedulingPolicy::default(),
        )
    }
}
