//! Domain Adapters
//!
//! Implementations of domain ports backed by PostgreSQL. Each adapter
//! translates between domain models and repository rows and maps
//! database errors to `PortError`.

pub mod workflow;

pub use workflow::PostgresWorkflowStore;
