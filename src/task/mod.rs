//! Task lifecycle and scheduling conflict engine.
//!
//! Operational tasks (cleaning, maintenance, inspection, turnover) move
//! through a validated state machine, are checked for overlapping schedules,
//! are merged when two land close together at one property, follow their
//! reservation when its dates change, and are generated from per-property
//! automation rules. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
