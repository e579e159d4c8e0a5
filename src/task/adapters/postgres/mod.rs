//! `PostgreSQL` adapter for task engine persistence.

pub(crate) mod models;
mod schema;
mod store;

pub use store::{PostgresTaskStore, TaskPgPool};
