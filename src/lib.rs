//! Turnkeep: task lifecycle and scheduling engine for short-term rental
//! operations.
//!
//! # Architecture
//!
//! Turnkeep follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage, staff lookup, and events
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`,
//!   event buses)
//!
//! # Modules
//!
//! - [`config`]: Engine policy configuration
//! - [`task`]: Task state machine, conflicts, fusion, cascade, and
//!   auto-generation

pub mod config;
pub mod task;
