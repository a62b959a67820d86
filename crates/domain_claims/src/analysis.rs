//! Structured analysis results
//!
//! Every producer in a run (specialists, remediation, synthesis) returns one
//! of the variants of [`StructuredAnalysisResult`]. Adapters for the reasoning
//! capability validate raw JSON into these types with [`ExpectedSchema::parse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::complexity::ReasonedComplexity;
use crate::error::AnalysisError;
use crate::transcript::Transcript;

/// Validity verdict of the claim assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Validity {
    Valid,
    Questionable,
    Invalid,
}

/// Coverage verdict against the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageStatus {
    Covered,
    NotCovered,
    Partial,
    InsufficientEvidence,
}

/// Fraud and loss risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Final recommendation handed to the human reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Deny,
    Investigate,
}

/// Coarse confidence attached to the recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Numeric value used for the audit record
    pub fn as_score(&self) -> f64 {
        match self {
            ConfidenceTier::High => 0.9,
            ConfidenceTier::Medium => 0.7,
            ConfidenceTier::Low => 0.4,
        }
    }
}

/// Confidence recorded when a specialist reply omits it
///
/// An unstated confidence counts as none, so the record trips the
/// low-confidence escalation trigger instead of silently passing it.
fn unreported_confidence() -> f64 {
    0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub validity: Validity,
    pub cost_assessment: String,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default = "unreported_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    pub status: CoverageStatus,
    #[serde(default)]
    pub cited_sections: Vec<String>,
    pub details: String,
    #[serde(default = "unreported_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub level: RiskLevel,
    /// 0 to 100
    pub score: u8,
    #[serde(default)]
    pub fraud_indicators: Vec<String>,
    pub analysis: String,
    #[serde(default = "unreported_confidence")]
    pub confidence: f64,
}

/// Damage observed on one attached image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFinding {
    pub image_id: String,
    pub damage_severity: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReviewResult {
    /// How well the images support the described incident, 0 to 1
    pub relevance: f64,
    #[serde(default)]
    pub findings: Vec<ImageFinding>,
    pub summary: String,
    #[serde(default = "unreported_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationDraft {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub requested_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub recommendation: Recommendation,
    pub confidence: ConfidenceTier,
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// Output of one producer, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredAnalysisResult {
    Assessment(AssessmentResult),
    Coverage(CoverageResult),
    Risk(RiskResult),
    ImageReview(ImageReviewResult),
    Communication(CommunicationDraft),
    Synthesis(SynthesisResult),
    ComplexityReview(ReasonedComplexity),
}

impl StructuredAnalysisResult {
    /// Schema this result satisfies
    pub fn schema(&self) -> ExpectedSchema {
        match self {
            StructuredAnalysisResult::Assessment(_) => ExpectedSchema::Assessment,
            StructuredAnalysisResult::Coverage(_) => ExpectedSchema::Coverage,
            StructuredAnalysisResult::Risk(_) => ExpectedSchema::Risk,
            StructuredAnalysisResult::ImageReview(_) => ExpectedSchema::ImageReview,
            StructuredAnalysisResult::Communication(_) => ExpectedSchema::Communication,
            StructuredAnalysisResult::Synthesis(_) => ExpectedSchema::Synthesis,
            StructuredAnalysisResult::ComplexityReview(_) => ExpectedSchema::ComplexityReview,
        }
    }

    /// Short decision label recorded in the audit log
    pub fn decision_label(&self) -> String {
        match self {
            StructuredAnalysisResult::Assessment(a) => enum_label(&a.validity),
            StructuredAnalysisResult::Coverage(c) => enum_label(&c.status),
            StructuredAnalysisResult::Risk(r) => enum_label(&r.level),
            StructuredAnalysisResult::ImageReview(i) => i
                .findings
                .iter()
                .map(|f| f.damage_severity.to_uppercase())
                .max_by_key(|s| severity_rank(s))
                .unwrap_or_else(|| "NO_DAMAGE_OBSERVED".to_string()),
            StructuredAnalysisResult::Communication(_) => "REQUEST_DRAFTED".to_string(),
            StructuredAnalysisResult::Synthesis(s) => enum_label(&s.recommendation),
            StructuredAnalysisResult::ComplexityReview(c) => enum_label(&c.complexity),
        }
    }

    /// Confidence in [0, 1]
    pub fn confidence(&self) -> f64 {
        let raw = match self {
            StructuredAnalysisResult::Assessment(a) => a.confidence,
            StructuredAnalysisResult::Coverage(c) => c.confidence,
            StructuredAnalysisResult::Risk(r) => r.confidence,
            StructuredAnalysisResult::ImageReview(i) => i.confidence,
            StructuredAnalysisResult::Communication(_) => 1.0,
            StructuredAnalysisResult::Synthesis(s) => s.confidence.as_score(),
            StructuredAnalysisResult::ComplexityReview(c) => c.confidence,
        };
        raw.clamp(0.0, 1.0)
    }

    /// Free-text justification carried by the result
    pub fn rationale(&self) -> &str {
        match self {
            StructuredAnalysisResult::Assessment(a) => &a.cost_assessment,
            StructuredAnalysisResult::Coverage(c) => &c.details,
            StructuredAnalysisResult::Risk(r) => &r.analysis,
            StructuredAnalysisResult::ImageReview(i) => &i.summary,
            StructuredAnalysisResult::Communication(c) => &c.subject,
            StructuredAnalysisResult::Synthesis(s) => &s.summary,
            StructuredAnalysisResult::ComplexityReview(c) => &c.reasoning,
        }
    }

    /// Range and presence checks that serde alone cannot express
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let in_unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(AnalysisError::SchemaValidation(format!(
                    "{name} {value} outside [0, 1]"
                )))
            }
        };

        match self {
            StructuredAnalysisResult::Assessment(a) => in_unit("confidence", a.confidence),
            StructuredAnalysisResult::Coverage(c) => in_unit("confidence", c.confidence),
            StructuredAnalysisResult::Risk(r) => {
                if r.score > 100 {
                    return Err(AnalysisError::SchemaValidation(format!(
                        "risk score {} outside 0..=100",
                        r.score
                    )));
                }
                in_unit("confidence", r.confidence)
            }
            StructuredAnalysisResult::ImageReview(i) => {
                in_unit("relevance", i.relevance)?;
                in_unit("confidence", i.confidence)
            }
            StructuredAnalysisResult::Communication(c) => {
                if c.subject.trim().is_empty() || c.body.trim().is_empty() {
                    return Err(AnalysisError::SchemaValidation(
                        "communication requires subject and body".to_string(),
                    ));
                }
                Ok(())
            }
            StructuredAnalysisResult::Synthesis(s) => {
                if s.summary.trim().is_empty() {
                    return Err(AnalysisError::SchemaValidation(
                        "synthesis summary is empty".to_string(),
                    ));
                }
                Ok(())
            }
            StructuredAnalysisResult::ComplexityReview(c) => in_unit("confidence", c.confidence),
        }
    }

    pub fn as_assessment(&self) -> Option<&AssessmentResult> {
        match self {
            StructuredAnalysisResult::Assessment(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_coverage(&self) -> Option<&CoverageResult> {
        match self {
            StructuredAnalysisResult::Coverage(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_risk(&self) -> Option<&RiskResult> {
        match self {
            StructuredAnalysisResult::Risk(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_image_review(&self) -> Option<&ImageReviewResult> {
        match self {
            StructuredAnalysisResult::ImageReview(i) => Some(i),
            _ => None,
        }
    }
}

fn enum_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn severity_rank(label: &str) -> u8 {
    match label {
        "CATASTROPHIC" | "TOTAL_LOSS" => 4,
        "SEVERE" => 3,
        "MODERATE" => 2,
        "MINOR" => 1,
        _ => 0,
    }
}

/// Result shape a caller asks the reasoning capability for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedSchema {
    Assessment,
    Coverage,
    Risk,
    ImageReview,
    Communication,
    Synthesis,
    ComplexityReview,
}

impl ExpectedSchema {
    pub fn name(&self) -> &'static str {
        match self {
            ExpectedSchema::Assessment => "assessment",
            ExpectedSchema::Coverage => "coverage",
            ExpectedSchema::Risk => "risk",
            ExpectedSchema::ImageReview => "image_review",
            ExpectedSchema::Communication => "communication",
            ExpectedSchema::Synthesis => "synthesis",
            ExpectedSchema::ComplexityReview => "complexity_review",
        }
    }

    /// Validates a raw JSON payload into the matching result variant
    pub fn parse(&self, payload: &Value) -> Result<StructuredAnalysisResult, AnalysisError> {
        fn decode<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, AnalysisError> {
            serde_json::from_value(payload.clone())
                .map_err(|e| AnalysisError::SchemaValidation(e.to_string()))
        }

        let result = match self {
            ExpectedSchema::Assessment => StructuredAnalysisResult::Assessment(decode(payload)?),
            ExpectedSchema::Coverage => StructuredAnalysisResult::Coverage(decode(payload)?),
            ExpectedSchema::Risk => StructuredAnalysisResult::Risk(decode(payload)?),
            ExpectedSchema::ImageReview => StructuredAnalysisResult::ImageReview(decode(payload)?),
            ExpectedSchema::Communication => {
                StructuredAnalysisResult::Communication(decode(payload)?)
            }
            ExpectedSchema::Synthesis => StructuredAnalysisResult::Synthesis(decode(payload)?),
            ExpectedSchema::ComplexityReview => {
                StructuredAnalysisResult::ComplexityReview(decode(payload)?)
            }
        };
        result.validate()?;
        Ok(result)
    }

    /// Checks that a result returned by a client matches this schema
    pub fn check(&self, result: &StructuredAnalysisResult) -> Result<(), AnalysisError> {
        if result.schema() != *self {
            return Err(AnalysisError::SchemaValidation(format!(
                "expected {} result, got {}",
                self.name(),
                result.schema().name()
            )));
        }
        result.validate()
    }
}

/// One call to the reasoning capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub system_context: String,
    pub transcript: Transcript,
    pub expected_schema: Option<ExpectedSchema>,
}

/// Reply from the reasoning capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Request transcript extended with the reply
    pub transcript: Transcript,
    pub structured: Option<StructuredAnalysisResult>,
    pub raw_text: String,
}
