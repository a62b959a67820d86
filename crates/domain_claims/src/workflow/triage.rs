//! Complexity triage
//!
//! The deterministic classifier always runs. In enhanced mode the reasoning
//! capability is consulted as well and the two opinions are reconciled; a
//! failed consultation leaves the deterministic result in place.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::analysis::{AnalysisRequest, ExpectedSchema, StructuredAnalysisResult};
use crate::claim::ClaimSubmission;
use crate::complexity::{
    reconcile, ComplexityAssessment, ComplexityClassifier, ComplexityLevel, ComplexitySource,
    ReasonedComplexity,
};
use crate::error::AnalysisError;
use crate::ports::AnalysisClient;
use crate::transcript::Transcript;

use super::call_with_timeout;
use super::prompts;

/// Final complexity of a claim and how it was reached
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexityOutcome {
    pub level: ComplexityLevel,
    pub source: ComplexitySource,
    pub assessment: ComplexityAssessment,
    pub reasoned: Option<ReasonedComplexity>,
}

impl ComplexityOutcome {
    /// One-line audit note
    pub fn note(&self) -> String {
        let mut note = format!(
            "complexity {} ({:?}, rule score {})",
            self.level.as_str(),
            self.source,
            self.assessment.score
        );
        if let Some(reasoned) = &self.reasoned {
            note.push_str(&format!(
                "; reasoned {} at {:.2}",
                reasoned.complexity.as_str(),
                reasoned.confidence
            ));
        }
        note
    }
}

#[derive(Clone)]
pub struct ComplexityTriage {
    classifier: ComplexityClassifier,
    client: Arc<dyn AnalysisClient>,
    call_timeout: Duration,
    enhanced: bool,
}

impl ComplexityTriage {
    pub fn new(
        classifier: ComplexityClassifier,
        client: Arc<dyn AnalysisClient>,
        call_timeout: Duration,
        enhanced: bool,
    ) -> Self {
        Self {
            classifier,
            client,
            call_timeout,
            enhanced,
        }
    }

    /// Classifies a claim; never fails
    pub async fn classify(&self, claim: &ClaimSubmission, brief: &Transcript) -> ComplexityOutcome {
        let assessment = self.classifier.assess(claim);
        let rule_based = ComplexityOutcome {
            level: assessment.level,
            source: ComplexitySource::RuleBased,
            assessment,
            reasoned: None,
        };
        if !self.enhanced {
            return rule_based;
        }

        match self.consult(brief).await {
            Ok(reasoned) => {
                let (level, source) = reconcile(rule_based.level, &reasoned);
                debug!(
                    rule_based = rule_based.level.as_str(),
                    reasoned = reasoned.complexity.as_str(),
                    level = level.as_str(),
                    "Reconciled complexity"
                );
                ComplexityOutcome {
                    level,
                    source,
                    reasoned: Some(reasoned),
                    ..rule_based
                }
            }
            Err(error) => {
                warn!(
                    error = %error,
                    "Complexity review failed, keeping rule-based classification"
                );
                rule_based
            }
        }
    }

    async fn consult(&self, brief: &Transcript) -> Result<ReasonedComplexity, AnalysisError> {
        let request = AnalysisRequest {
            system_context: prompts::COMPLEXITY_CONTEXT.to_string(),
            transcript: brief.clone(),
            expected_schema: Some(ExpectedSchema::ComplexityReview),
        };
        let response = call_with_timeout(self.client.as_ref(), request, self.call_timeout).await?;
        let structured = response.structured.ok_or_else(|| {
            AnalysisError::SchemaValidation("no structured complexity review".into())
        })?;
        ExpectedSchema::ComplexityReview.check(&structured)?;
        match structured {
            StructuredAnalysisResult::ComplexityReview(reasoned) => Ok(reasoned),
            other => Err(AnalysisError::SchemaValidation(format!(
                "expected complexity_review, got {}",
                other.schema().name()
            ))),
        }
    }
}
