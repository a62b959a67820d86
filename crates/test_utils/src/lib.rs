//! Test Utilities Crate
//!
//! Shared test infrastructure for the claims workflow test suite.
//!
//! # Modules
//!
//! - `fixtures`: fixture claims, specialist results, and scripted clients
//! - `builders`: `ClaimBuilder` for one-off claims
//! - `database`: PostgreSQL testcontainer with the workflow schema
//! - `assertions`: audit-trail assertions on workflow runs
//! - `generators`: proptest strategies
//! - `tracing`: subscriber setup for tests

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;
pub mod tracing;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
pub use crate::tracing::init_tracing;
