//! Adapters for the claims workflow ports
//!
//! The PostgreSQL store lives in `infra_db`; this module holds the adapters
//! that need nothing beyond the process itself.

pub mod memory;

pub use memory::InMemoryWorkflowStore;
