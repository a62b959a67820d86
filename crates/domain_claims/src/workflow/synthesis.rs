//! Final recommendation

use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{AnalysisRequest, ExpectedSchema, StructuredAnalysisResult, SynthesisResult};
use crate::error::WorkflowError;
use crate::ports::AnalysisClient;
use crate::transcript::Transcript;

use super::call_with_timeout;
use super::prompts;

/// Aggregates the accumulated transcript into one recommendation
///
/// Any failure here fails the run. There is no fallback recommendation.
#[derive(Clone)]
pub struct Synthesizer {
    client: Arc<dyn AnalysisClient>,
    call_timeout: Duration,
}

impl Synthesizer {
    pub fn new(client: Arc<dyn AnalysisClient>, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    pub async fn synthesize(&self, transcript: Transcript) -> Result<SynthesisResult, WorkflowError> {
        let mut transcript = transcript;
        transcript.push(prompts::synthesis_instruction());
        let request = AnalysisRequest {
            system_context: prompts::SYNTHESIS_CONTEXT.to_string(),
            transcript,
            expected_schema: Some(ExpectedSchema::Synthesis),
        };

        let response = call_with_timeout(self.client.as_ref(), request, self.call_timeout)
            .await
            .map_err(|e| WorkflowError::Synthesis(e.to_string()))?;

        let structured = response
            .structured
            .ok_or_else(|| WorkflowError::Synthesis("no structured synthesis returned".into()))?;
        ExpectedSchema::Synthesis
            .check(&structured)
            .map_err(|e| WorkflowError::Synthesis(e.to_string()))?;

        match structured {
            StructuredAnalysisResult::Synthesis(result) => Ok(result),
            other => Err(WorkflowError::Synthesis(format!(
                "expected synthesis, got {}",
                other.schema().name()
            ))),
        }
    }
}
