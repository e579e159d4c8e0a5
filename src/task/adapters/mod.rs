//! Adapter implementations of the task engine ports.

pub mod events;
pub mod memory;
pub mod postgres;
