//! In-memory adapters for tests and single-process embedding.

mod directory;
mod store;

pub use directory::InMemoryStaffDirectory;
pub use store::InMemoryTaskStore;
