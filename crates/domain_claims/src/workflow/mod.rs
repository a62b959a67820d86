//! Claims evaluation workflow
//!
//! ```text
//! claim -> intake checks -> complexity
//!       -> specialists (concurrent) -> escalation gate -> HUMAN_REVIEW
//!                                                      -> gap analysis
//!                                                      -> remediation (optional)
//!                                                      -> synthesis -> COMPLETED
//! ```
//!
//! Stages run one after another; only the specialist stage fans out.

pub mod engine;
pub mod prompts;
pub mod remediation;
pub mod specialists;
pub mod synthesis;
pub mod triage;

pub use engine::{RunHandle, WorkflowEngine, WorkflowOutcome, WorkflowResult};
pub use remediation::{RemediationOutcome, RemediationStage};
pub use specialists::{SpecialistBundle, SpecialistCoordinator, SpecialistTask};
pub use synthesis::Synthesizer;
pub use triage::{ComplexityOutcome, ComplexityTriage};

use std::time::Duration;

use crate::analysis::{AnalysisRequest, AnalysisResponse};
use crate::error::AnalysisError;
use crate::ports::AnalysisClient;

/// Invokes the client, mapping an elapsed limit to `AnalysisError::Timeout`
pub(crate) async fn call_with_timeout(
    client: &dyn AnalysisClient,
    request: AnalysisRequest,
    limit: Duration,
) -> Result<AnalysisResponse, AnalysisError> {
    match tokio::time::timeout(limit, client.invoke(request)).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::Timeout {
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
