//! Repository implementations
//!
//! Repositories own the SQL and speak in row types; adapters translate
//! those rows to and from domain types.

pub mod workflow;

pub use workflow::{StageTransitionRow, StepRecordRow, WorkflowRepository, WorkflowRunRow};
