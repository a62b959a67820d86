//! Conditional request for missing evidence

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::analysis::{
    AnalysisRequest, CommunicationDraft, ExpectedSchema, StructuredAnalysisResult,
};
use crate::error::{AnalysisError, WorkflowError};
use crate::gaps::MissingItem;
use crate::ports::AnalysisClient;
use crate::transcript::Transcript;

use super::call_with_timeout;
use super::prompts;

/// Producer name of the communication record
pub const COMMUNICATION_PRODUCER: &str = "communication";

/// Result of the remediation stage
#[derive(Debug, Clone, PartialEq)]
pub enum RemediationOutcome {
    /// Nothing was missing; the transcript is passed through untouched
    Skipped { transcript: Transcript },
    /// A request was drafted
    Drafted {
        transcript: Transcript,
        draft: CommunicationDraft,
    },
}

impl RemediationOutcome {
    pub fn transcript(&self) -> &Transcript {
        match self {
            RemediationOutcome::Skipped { transcript }
            | RemediationOutcome::Drafted { transcript, .. } => transcript,
        }
    }

    pub fn draft(&self) -> Option<&CommunicationDraft> {
        match self {
            RemediationOutcome::Drafted { draft, .. } => Some(draft),
            RemediationOutcome::Skipped { .. } => None,
        }
    }

    pub fn into_parts(self) -> (Transcript, Option<CommunicationDraft>) {
        match self {
            RemediationOutcome::Skipped { transcript } => (transcript, None),
            RemediationOutcome::Drafted { transcript, draft } => (transcript, Some(draft)),
        }
    }
}

/// Drafts a claimant request when evidence is missing
#[derive(Clone)]
pub struct RemediationStage {
    client: Arc<dyn AnalysisClient>,
    call_timeout: Duration,
}

impl RemediationStage {
    pub fn new(client: Arc<dyn AnalysisClient>, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    /// No client call at all when `missing` is empty
    pub async fn maybe_draft_communication(
        &self,
        transcript: Transcript,
        missing: &[MissingItem],
    ) -> Result<RemediationOutcome, WorkflowError> {
        if missing.is_empty() {
            debug!("No missing items, skipping remediation");
            return Ok(RemediationOutcome::Skipped { transcript });
        }

        let mut request_transcript = transcript;
        request_transcript.push(prompts::remediation_instruction(missing));
        let request = AnalysisRequest {
            system_context: prompts::COMMUNICATION_CONTEXT.to_string(),
            transcript: request_transcript,
            expected_schema: Some(ExpectedSchema::Communication),
        };

        let response = call_with_timeout(self.client.as_ref(), request, self.call_timeout)
            .await
            .map_err(|e| WorkflowError::analysis(COMMUNICATION_PRODUCER, e))?;

        let structured = response.structured.ok_or_else(|| {
            WorkflowError::analysis(
                COMMUNICATION_PRODUCER,
                AnalysisError::SchemaValidation("no structured communication draft".into()),
            )
        })?;
        ExpectedSchema::Communication
            .check(&structured)
            .map_err(|e| WorkflowError::analysis(COMMUNICATION_PRODUCER, e))?;

        match structured {
            StructuredAnalysisResult::Communication(draft) => {
                debug!(items = missing.len(), "Drafted claimant request");
                Ok(RemediationOutcome::Drafted {
                    transcript: response.transcript,
                    draft,
                })
            }
            other => Err(WorkflowError::analysis(
                COMMUNICATION_PRODUCER,
                AnalysisError::SchemaValidation(format!(
                    "expected communication, got {}",
                    other.schema().name()
                )),
            )),
        }
    }
}
