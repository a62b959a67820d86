//! Claims Workflow Ports
//!
//! The engine reaches its two collaborators only through these traits:
//!
//! - [`AnalysisClient`]: the reasoning capability that turns a transcript and
//!   a system context into a reply, optionally constrained to a schema
//! - [`WorkflowStore`]: durable storage for runs, stage transitions and the
//!   step-record audit log
//!
//! Both are shared between tasks as `Arc<dyn ...>`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_claims::adapters::InMemoryWorkflowStore;
//! use domain_claims::workflow::WorkflowEngine;
//! use std::sync::Arc;
//!
//! let engine = WorkflowEngine::new(
//!     WorkflowConfig::default(),
//!     Arc::new(hosted_client),
//!     Arc::new(InMemoryWorkflowStore::new()),
//! );
//! let result = engine.execute(claim).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, PortError, WorkflowRunId};

use crate::analysis::{AnalysisRequest, AnalysisResponse};
use crate::complexity::ComplexityLevel;
use crate::error::AnalysisError;
use crate::run::{StageTransition, WorkflowRun};
use crate::step::StepRecord;

/// The reasoning capability
///
/// Implementations must honour `expected_schema` when present: either return
/// a structured result of that kind or fail with
/// [`AnalysisError::SchemaValidation`]. The engine validates again on receipt.
#[async_trait]
pub trait AnalysisClient: DomainPort {
    /// Sends one request and waits for the reply
    async fn invoke(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AnalysisError>;
}

/// Persistence for runs and their audit log
///
/// Writes happen only after each join point, so a store never sees partial
/// fan-out state.
#[async_trait]
pub trait WorkflowStore: DomainPort + HealthCheckable {
    /// Stores a freshly created run and its INTAKE transition
    async fn create_run(&self, run: &WorkflowRun) -> Result<(), PortError>;

    /// Stores the complexity classification
    async fn record_complexity(
        &self,
        run_id: WorkflowRunId,
        level: ComplexityLevel,
    ) -> Result<(), PortError>;

    /// Appends a step record
    ///
    /// Idempotent on the record id: re-delivering the same record is a no-op.
    async fn append_step_record(&self, record: &StepRecord) -> Result<(), PortError>;

    /// Appends a stage transition and moves the run's current stage
    async fn update_run_stage(
        &self,
        run_id: WorkflowRunId,
        transition: &StageTransition,
    ) -> Result<(), PortError>;

    /// Loads a run with its full history and step records
    async fn get_run(&self, run_id: WorkflowRunId) -> Result<WorkflowRun, PortError>;
}

/// Scripted implementation of AnalysisClient for testing
///
/// Replies are keyed by the requested schema. Each reply may carry a delay so
/// tests can control completion order of concurrent calls.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::RwLock;

    use crate::analysis::{ExpectedSchema, StructuredAnalysisResult};
    use crate::transcript::Message;

    /// What the mock returns for one schema
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Structured(StructuredAnalysisResult),
        Text(String),
        Fail(AnalysisError),
    }

    #[derive(Debug, Clone)]
    struct Scripted {
        reply: MockReply,
        delay: Duration,
    }

    /// In-memory scripted analysis client
    #[derive(Debug, Default, Clone)]
    pub struct MockAnalysisClient {
        scripts: HashMap<ExpectedSchema, Scripted>,
        calls: Arc<RwLock<Vec<AnalysisRequest>>>,
    }

    impl MockAnalysisClient {
        /// Creates a client with no scripted replies
        pub fn new() -> Self {
            Self::default()
        }

        /// Replies to `schema` with a structured result
        pub fn respond(self, schema: ExpectedSchema, result: StructuredAnalysisResult) -> Self {
            self.script(schema, MockReply::Structured(result))
        }

        /// Replies to `schema` with free text only
        pub fn respond_text(self, schema: ExpectedSchema, text: impl Into<String>) -> Self {
            self.script(schema, MockReply::Text(text.into()))
        }

        /// Fails every call for `schema`
        pub fn fail(self, schema: ExpectedSchema, error: AnalysisError) -> Self {
            self.script(schema, MockReply::Fail(error))
        }

        /// Delays the reply for `schema`
        pub fn delay(mut self, schema: ExpectedSchema, delay: Duration) -> Self {
            if let Some(scripted) = self.scripts.get_mut(&schema) {
                scripted.delay = delay;
            }
            self
        }

        fn script(mut self, schema: ExpectedSchema, reply: MockReply) -> Self {
            let delay = self
                .scripts
                .get(&schema)
                .map(|s| s.delay)
                .unwrap_or_default();
            self.scripts.insert(schema, Scripted { reply, delay });
            self
        }

        /// All requests received so far, in arrival order
        pub async fn calls(&self) -> Vec<AnalysisRequest> {
            self.calls.read().await.clone()
        }

        /// Number of requests received for one schema
        pub async fn call_count(&self, schema: ExpectedSchema) -> usize {
            self.calls
                .read()
                .await
                .iter()
                .filter(|r| r.expected_schema == Some(schema))
                .count()
        }
    }

    impl DomainPort for MockAnalysisClient {}

    #[async_trait]
    impl AnalysisClient for MockAnalysisClient {
        async fn invoke(
            &self,
            request: AnalysisRequest,
        ) -> Result<AnalysisResponse, AnalysisError> {
            self.calls.write().await.push(request.clone());

            let scripted = request
                .expected_schema
                .and_then(|schema| self.scripts.get(&schema).cloned())
                .ok_or_else(|| {
                    AnalysisError::Transport(format!(
                        "no scripted reply for {}",
                        request
                            .expected_schema
                            .map(|s| s.name())
                            .unwrap_or("free text")
                    ))
                })?;

            if !scripted.delay.is_zero() {
                tokio::time::sleep(scripted.delay).await;
            }

            let (structured, raw_text) = match scripted.reply {
                MockReply::Fail(error) => return Err(error),
                MockReply::Text(text) => (None, text),
                MockReply::Structured(result) => {
                    let text = serde_json::to_string(&result)
                        .map_err(|e| AnalysisError::SchemaValidation(e.to_string()))?;
                    (Some(result), text)
                }
            };

            let mut transcript = request.transcript;
            transcript.push(Message::assistant(raw_text.clone()));
            Ok(AnalysisResponse {
                transcript,
                structured,
                raw_text,
            })
        }
    }
}
