//! Human-review escalation gate
//!
//! The gate decides, after the specialists have run, whether a claim leaves
//! automated processing. It is a pure function of the claim, the step records
//! written so far and the optional image summary.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::ImageReviewResult;
use crate::claim::ClaimSubmission;
use crate::step::StepRecord;

/// Escalation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub high_amount_threshold: Decimal,
    pub keywords: Vec<String>,
    pub confidence_threshold: f64,
    pub image_relevance_threshold: f64,
    pub severe_damage_labels: Vec<String>,
    /// Escalate when an image-aware run produced no image review
    pub escalate_on_missing_image_review: bool,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            high_amount_threshold: dec!(50000),
            keywords: [
                "fraud",
                "lawsuit",
                "attorney",
                "litigation",
                "fatality",
                "death",
                "arson",
                "suspicious",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            confidence_threshold: 0.7,
            image_relevance_threshold: 0.6,
            severe_damage_labels: ["severe", "total_loss", "catastrophic"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            escalate_on_missing_image_review: false,
        }
    }
}

/// Condensed image evidence seen by the gate
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSummary {
    pub relevance: f64,
    pub severities: Vec<String>,
}

impl From<&ImageReviewResult> for ImageSummary {
    fn from(review: &ImageReviewResult) -> Self {
        Self {
            relevance: review.relevance,
            severities: review
                .findings
                .iter()
                .map(|f| f.damage_severity.clone())
                .collect(),
        }
    }
}

/// A condition that routes a claim to a human
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationTrigger {
    HighAmount { amount: Decimal, threshold: Decimal },
    Keyword(String),
    LowConfidence { producer: String, confidence: f64 },
    LowImageRelevance { relevance: f64 },
    SevereDamage(String),
    ImageReviewMissing,
}

impl fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationTrigger::HighAmount { amount, threshold } => {
                write!(f, "claimed amount {amount} above {threshold}")
            }
            EscalationTrigger::Keyword(k) => write!(f, "description mentions '{k}'"),
            EscalationTrigger::LowConfidence {
                producer,
                confidence,
            } => write!(f, "{producer} confidence {confidence:.2} below threshold"),
            EscalationTrigger::LowImageRelevance { relevance } => {
                write!(f, "image relevance {relevance:.2} below threshold")
            }
            EscalationTrigger::SevereDamage(label) => write!(f, "image shows {label} damage"),
            EscalationTrigger::ImageReviewMissing => f.write_str("image review unavailable"),
        }
    }
}

/// Every trigger that fired for a claim
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EscalationDecision {
    pub triggers: Vec<EscalationTrigger>,
}

impl EscalationDecision {
    pub fn escalate(&self) -> bool {
        !self.triggers.is_empty()
    }

    /// Trigger texts as stored on the run
    pub fn descriptions(&self) -> Vec<String> {
        self.triggers.iter().map(|t| t.to_string()).collect()
    }
}

/// Deterministic escalation gate
#[derive(Debug, Clone, Default)]
pub struct EscalationGate {
    config: EscalationConfig,
}

impl EscalationGate {
    pub fn new(config: EscalationConfig) -> Self {
        let lower = |v: &[String]| -> Vec<String> { v.iter().map(|s| s.to_lowercase()).collect() };
        Self {
            config: EscalationConfig {
                keywords: lower(&config.keywords),
                severe_damage_labels: lower(&config.severe_damage_labels),
                ..config
            },
        }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// Short-circuiting check; agrees with `evaluate(..).escalate()`
    pub fn should_escalate(
        &self,
        claim: &ClaimSubmission,
        steps: &[StepRecord],
        images: Option<&ImageSummary>,
    ) -> bool {
        let cfg = &self.config;
        let description = claim.normalized_description();

        claim.claimed_amount.exceeds(cfg.high_amount_threshold)
            || cfg.keywords.iter().any(|k| description.contains(k.as_str()))
            || steps.iter().any(|s| s.confidence < cfg.confidence_threshold)
            || images.map_or(false, |summary| {
                summary.relevance < cfg.image_relevance_threshold
                    || summary.severities.iter().any(|s| self.is_severe(s))
            })
    }

    /// Collects every firing trigger, without short-circuiting
    pub fn evaluate(
        &self,
        claim: &ClaimSubmission,
        steps: &[StepRecord],
        images: Option<&ImageSummary>,
    ) -> EscalationDecision {
        let cfg = &self.config;
        let mut triggers = Vec::new();

        if claim.claimed_amount.exceeds(cfg.high_amount_threshold) {
            triggers.push(EscalationTrigger::HighAmount {
                amount: claim.claimed_amount.amount(),
                threshold: cfg.high_amount_threshold,
            });
        }

        let description = claim.normalized_description();
        triggers.extend(
            cfg.keywords
                .iter()
                .filter(|k| description.contains(k.as_str()))
                .map(|k| EscalationTrigger::Keyword(k.clone())),
        );

        triggers.extend(
            steps
                .iter()
                .filter(|s| s.confidence < cfg.confidence_threshold)
                .map(|s| EscalationTrigger::LowConfidence {
                    producer: s.producer.clone(),
                    confidence: s.confidence,
                }),
        );

        if let Some(summary) = images {
            if summary.relevance < cfg.image_relevance_threshold {
                triggers.push(EscalationTrigger::LowImageRelevance {
                    relevance: summary.relevance,
                });
            }
            let mut seen: Vec<String> = Vec::new();
            for severity in summary.severities.iter().map(|s| s.to_lowercase()) {
                if self.is_severe(&severity) && !seen.contains(&severity) {
                    triggers.push(EscalationTrigger::SevereDamage(severity.clone()));
                    seen.push(severity);
                }
            }
        }

        EscalationDecision { triggers }
    }

    /// Adds the missing-review trigger when configured to
    pub fn evaluate_image_aware(
        &self,
        claim: &ClaimSubmission,
        steps: &[StepRecord],
        images: Option<&ImageSummary>,
    ) -> EscalationDecision {
        let mut decision = self.evaluate(claim, steps, images);
        if images.is_none() && self.config.escalate_on_missing_image_review {
            decision.triggers.push(EscalationTrigger::ImageReviewMissing);
        }
        decision
    }

    fn is_severe(&self, severity: &str) -> bool {
        let severity = severity.to_lowercase();
        self.config
            .severe_damage_labels
            .iter()
            .any(|label| *label == severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{EvidenceFlags, Incident, LossType};
    use chrono::Utc;
    use core_kernel::{ClaimId, Currency, Money, StepRecordId, WorkflowRunId};
    use serde_json::json;

    fn claim(amount: Decimal, description: &str) -> ClaimSubmission {
        ClaimSubmission {
            id: ClaimId::new(),
            policy_reference: "POL-HOME-77".to_string(),
            loss_type: LossType::Property,
            incident: Incident {
                date: "2024-03-02".to_string(),
                description: description.to_string(),
                location: None,
            },
            claimed_amount: Money::new(amount, Currency::USD),
            evidence: EvidenceFlags::complete(),
            images: vec![],
        }
    }

    fn step(producer: &str, confidence: f64) -> StepRecord {
        StepRecord {
            id: StepRecordId::new(),
            run_id: WorkflowRunId::new(),
            producer: producer.to_string(),
            decision: "VALID".to_string(),
            confidence,
            rationale: String::new(),
            recorded_at: Utc::now(),
            payload: json!({}),
        }
    }

    fn gate() -> EscalationGate {
        EscalationGate::new(EscalationConfig::default())
    }

    #[test]
    fn test_clean_claim_passes() {
        let c = claim(dec!(800), "Minor scratch on the door");
        let steps = vec![step("assessment", 0.9), step("risk", 0.85)];
        assert!(!gate().should_escalate(&c, &steps, None));
        assert!(!gate().evaluate(&c, &steps, None).escalate());
    }

    #[test]
    fn test_amount_threshold_is_strict() {
        assert!(!gate().should_escalate(&claim(dec!(50000), "Kitchen fire"), &[], None));
        assert!(gate().should_escalate(&claim(dec!(50000.01), "Kitchen fire"), &[], None));
    }

    #[test]
    fn test_keyword_any_case() {
        let c = claim(dec!(300), "Neighbour's ATTORNEY sent a letter");
        let decision = gate().evaluate(&c, &[], None);
        assert_eq!(
            decision.triggers,
            vec![EscalationTrigger::Keyword("attorney".into())]
        );
    }

    #[test]
    fn test_low_confidence_record() {
        let c = claim(dec!(300), "Cracked window");
        let steps = vec![step("assessment", 0.95), step("coverage", 0.69)];
        let decision = gate().evaluate(&c, &steps, None);
        assert!(decision.escalate());
        assert_eq!(
            decision.descriptions(),
            vec!["coverage confidence 0.69 below threshold".to_string()]
        );
    }

    #[test]
    fn test_reply_without_confidence_escalates() {
        let c = claim(dec!(300), "Cracked window");
        let result = crate::analysis::ExpectedSchema::Coverage
            .parse(&json!({ "status": "COVERED", "details": "Glass cover applies" }))
            .unwrap();
        let steps = vec![StepRecord::from_result(WorkflowRunId::new(), "coverage", &result)];
        assert!(gate().should_escalate(&c, &steps, None));
    }

    #[test]
    fn test_confidence_at_threshold_does_not_escalate() {
        let c = claim(dec!(300), "Cracked window");
        assert!(!gate().should_escalate(&c, &[step("risk", 0.7)], None));
    }

    #[test]
    fn test_image_summary_rules() {
        let c = claim(dec!(300), "Hail damage");
        let irrelevant = ImageSummary {
            relevance: 0.3,
            severities: vec!["MINOR".into()],
        };
        let severe = ImageSummary {
            relevance: 0.9,
            severities: vec!["MINOR".into(), "SEVERE".into()],
        };
        let fine = ImageSummary {
            relevance: 0.9,
            severities: vec!["moderate".into()],
        };

        assert!(gate().should_escalate(&c, &[], Some(&irrelevant)));
        assert!(gate().should_escalate(&c, &[], Some(&severe)));
        assert!(!gate().should_escalate(&c, &[], Some(&fine)));
        assert_eq!(
            gate().evaluate(&c, &[], Some(&severe)).triggers,
            vec![EscalationTrigger::SevereDamage("severe".into())]
        );
    }

    #[test]
    fn test_all_triggers_collected() {
        let c = claim(dec!(90000), "Suspicious fire, lawsuit pending");
        let steps = vec![step("risk", 0.2)];
        let images = ImageSummary {
            relevance: 0.1,
            severities: vec!["total_loss".into()],
        };
        let decision = gate().evaluate(&c, &steps, Some(&images));
        assert_eq!(decision.triggers.len(), 6);
    }

    #[test]
    fn test_missing_image_review_is_opt_in() {
        let c = claim(dec!(300), "Hail damage");
        assert!(!gate().evaluate_image_aware(&c, &[], None).escalate());

        let strict = EscalationGate::new(EscalationConfig {
            escalate_on_missing_image_review: true,
            ..EscalationConfig::default()
        });
        assert_eq!(
            strict.evaluate_image_aware(&c, &[], None).triggers,
            vec![EscalationTrigger::ImageReviewMissing]
        );
    }
}
