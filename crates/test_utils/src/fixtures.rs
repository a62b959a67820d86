//! Pre-built Test Fixtures
//!
//! Ready-to-use claims, specialist results, and scripted analysis clients.
//! Everything here is deterministic apart from generated identifiers.

use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{ClaimId, Currency, ImageId, Money};
use domain_claims::adapters::InMemoryWorkflowStore;
use domain_claims::analysis::{
    AssessmentResult, CommunicationDraft, ConfidenceTier, CoverageResult, CoverageStatus,
    ImageFinding, ImageReviewResult, Recommendation, RiskLevel, RiskResult, SynthesisResult,
    Validity,
};
use domain_claims::ports::mock::MockAnalysisClient;
use domain_claims::{
    ClaimImage, ClaimSubmission, EvidenceFlags, ExpectedSchema, Incident, LossType,
    StructuredAnalysisResult, WorkflowConfig, WorkflowEngine,
};

/// Fixture claims
pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Incident date used by every fixture claim
    pub fn incident_date() -> &'static str {
        "2024-03-15"
    }

    /// Small vehicle claim with full evidence; classifies LOW
    pub fn minor_scratch() -> ClaimSubmission {
        ClaimSubmission {
            id: ClaimId::new(),
            policy_reference: "POL-100200".to_string(),
            loss_type: LossType::Vehicle,
            incident: Incident {
                date: Self::incident_date().to_string(),
                description: "minor scratch".to_string(),
                location: Some("Supermarket car park".to_string()),
            },
            claimed_amount: Money::new(dec!(500), Currency::USD),
            evidence: EvidenceFlags::complete(),
            images: vec![],
        }
    }

    /// Property claim above the high-amount escalation threshold
    pub fn high_value() -> ClaimSubmission {
        ClaimSubmission {
            loss_type: LossType::Property,
            incident: Incident {
                date: Self::incident_date().to_string(),
                description: "Burst pipe damaged kitchen cabinets and flooring".to_string(),
                location: None,
            },
            claimed_amount: Money::new(dec!(75000), Currency::USD),
            ..Self::minor_scratch()
        }
    }

    /// Vehicle claim with one attached photo
    pub fn with_images() -> ClaimSubmission {
        ClaimSubmission {
            claimed_amount: Money::new(dec!(800), Currency::USD),
            images: vec![ClaimImage {
                id: ImageId::new(),
                file_name: "rear_bumper.jpg".to_string(),
                media_type: "image/jpeg".to_string(),
                caption: Some("Rear bumper".to_string()),
            }],
            ..Self::minor_scratch()
        }
    }

    /// Claim whose incident date is not ISO 8601
    pub fn unparseable_date() -> ClaimSubmission {
        let mut claim = Self::minor_scratch();
        claim.incident.date = "last tuesday".to_string();
        claim
    }
}

/// Fixture specialist results
pub struct ResultFixtures;

impl ResultFixtures {
    pub fn valid_assessment() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Assessment(AssessmentResult {
            validity: Validity::Valid,
            cost_assessment: "Consistent with a paint touch-up".to_string(),
            red_flags: vec![],
            confidence: 0.92,
        })
    }

    pub fn questionable_assessment() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Assessment(AssessmentResult {
            validity: Validity::Questionable,
            cost_assessment: "Estimate is above typical repair costs".to_string(),
            red_flags: vec![],
            confidence: 0.8,
        })
    }

    pub fn covered() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Coverage(CoverageResult {
            status: CoverageStatus::Covered,
            cited_sections: vec!["Section 2.1 Collision".to_string()],
            details: "Collision damage is covered without exclusions".to_string(),
            confidence: 0.9,
        })
    }

    pub fn insufficient_coverage() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Coverage(CoverageResult {
            status: CoverageStatus::InsufficientEvidence,
            cited_sections: vec![],
            details: "Policy wording was not provided".to_string(),
            confidence: 0.75,
        })
    }

    pub fn low_risk() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Risk(RiskResult {
            level: RiskLevel::Low,
            score: 8,
            fraud_indicators: vec![],
            analysis: "No indicators of misrepresentation".to_string(),
            confidence: 0.88,
        })
    }

    pub fn relevant_images() -> StructuredAnalysisResult {
        StructuredAnalysisResult::ImageReview(ImageReviewResult {
            relevance: 0.9,
            findings: vec![ImageFinding {
                image_id: "rear_bumper.jpg".to_string(),
                damage_severity: "MINOR".to_string(),
                description: "Shallow scuff on the rear bumper".to_string(),
            }],
            summary: "Photo matches the described damage".to_string(),
            confidence: 0.85,
        })
    }

    pub fn approve() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Synthesis(SynthesisResult {
            recommendation: Recommendation::Approve,
            confidence: ConfidenceTier::High,
            summary: "Low-value claim with consistent evidence".to_string(),
            key_findings: vec!["Coverage confirmed".to_string()],
            next_steps: vec!["Settle at claimed amount".to_string()],
        })
    }

    pub fn document_request() -> StructuredAnalysisResult {
        StructuredAnalysisResult::Communication(CommunicationDraft {
            subject: "Additional documents needed for your claim".to_string(),
            body: "To continue reviewing your claim we need a few more documents.".to_string(),
            requested_items: vec!["Photos of the damaged property or items".to_string()],
        })
    }
}

/// Scripted analysis clients
pub struct ClientFixtures;

impl ClientFixtures {
    /// Every schema answered with a clean, confident result
    pub fn clean() -> MockAnalysisClient {
        MockAnalysisClient::new()
            .respond(ExpectedSchema::Assessment, ResultFixtures::valid_assessment())
            .respond(ExpectedSchema::Coverage, ResultFixtures::covered())
            .respond(ExpectedSchema::Risk, ResultFixtures::low_risk())
            .respond(ExpectedSchema::ImageReview, ResultFixtures::relevant_images())
            .respond(ExpectedSchema::Communication, ResultFixtures::document_request())
            .respond(ExpectedSchema::Synthesis, ResultFixtures::approve())
    }

    /// Clean apart from a questionable assessment and unverifiable coverage
    pub fn with_gaps() -> MockAnalysisClient {
        Self::clean()
            .respond(ExpectedSchema::Assessment, ResultFixtures::questionable_assessment())
            .respond(ExpectedSchema::Coverage, ResultFixtures::insufficient_coverage())
    }
}

/// Engine wired to a scripted client and an in-memory store
pub struct EngineFixture {
    pub engine: Arc<WorkflowEngine>,
    pub client: MockAnalysisClient,
    pub store: InMemoryWorkflowStore,
}

impl EngineFixture {
    pub fn new(client: MockAnalysisClient) -> Self {
        Self::with_config(client, WorkflowConfig::default())
    }

    pub fn with_config(client: MockAnalysisClient, config: WorkflowConfig) -> Self {
        let store = InMemoryWorkflowStore::new();
        let engine = WorkflowEngine::new(
            config,
            Arc::new(client.clone()),
            Arc::new(store.clone()),
        );
        Self {
            engine: Arc::new(engine),
            client,
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain_claims::{ComplexityClassifier, ComplexityLevel};

    #[test]
    fn test_minor_scratch_is_low_and_valid() {
        let claim = ClaimFixtures::minor_scratch();
        assert!(claim.validate_for_intake(Utc::now()).is_ok());
        assert_eq!(
            ComplexityClassifier::default().classify(&claim),
            ComplexityLevel::Low
        );
    }

    #[test]
    fn test_unparseable_date_fails_intake() {
        let claim = ClaimFixtures::unparseable_date();
        assert!(claim.validate_for_intake(Utc::now()).is_err());
    }

    #[test]
    fn test_fixture_results_pass_validation() {
        for result in [
            ResultFixtures::valid_assessment(),
            ResultFixtures::questionable_assessment(),
            ResultFixtures::covered(),
            ResultFixtures::insufficient_coverage(),
            ResultFixtures::low_risk(),
            ResultFixtures::relevant_images(),
            ResultFixtures::approve(),
            ResultFixtures::document_request(),
        ] {
            assert!(result.validate().is_ok(), "{:?}", result.schema());
        }
    }
}
