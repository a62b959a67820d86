//! Core Kernel - Foundational types for the claims evaluation workflow
//!
//! This crate provides the building blocks shared by the domain and
//! infrastructure crates:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for claims, runs, and audit records
//! - Port abstractions (error type, marker and health-check traits)

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{ClaimId, ImageId, StepRecordId, WorkflowRunId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use error::CoreError;
