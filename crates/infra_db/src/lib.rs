//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the claims evaluation workflow using SQLx.
//!
//! # Architecture
//!
//! Repositories own the SQL and work with row types. Adapters implement
//! domain ports on top of them, so the workflow engine only ever sees
//! `WorkflowStore`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool_from_url, run_migrations, PostgresWorkflowStore};
//!
//! let pool = create_pool_from_url("postgres://localhost/claims_workflow").await?;
//! run_migrations(&pool).await?;
//! let store = PostgresWorkflowStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresWorkflowStore;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
