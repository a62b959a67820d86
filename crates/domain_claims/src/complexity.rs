//! Claim complexity classification
//!
//! A deterministic weighted score over claim fields, used as a coarse
//! routing and prioritization signal. The optional reasoning-backed opinion
//! is reconciled with the deterministic result by [`reconcile`].
//!
//! # Scoring
//!
//! Checks run in order and only ever add to the score:
//!
//! | check | points |
//! |-------|--------|
//! | amount > 50,000 (else > 10,000) | +2 (+1) |
//! | complex keyword in description | +2 |
//! | images attached | +1 |
//! | documentation gaps | +1 |
//!
//! Score ≥ 3 is HIGH, ≥ 1 is MEDIUM, otherwise LOW. An amount above the top
//! tier is always HIGH.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::claim::ClaimSubmission;

/// Complexity classification levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    /// LOW=1, MEDIUM=2, HIGH=3
    pub fn ordinal(&self) -> u8 {
        match self {
            ComplexityLevel::Low => 1,
            ComplexityLevel::Medium => 2,
            ComplexityLevel::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Low => "LOW",
            ComplexityLevel::Medium => "MEDIUM",
            ComplexityLevel::High => "HIGH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(ComplexityLevel::Low),
            "MEDIUM" => Some(ComplexityLevel::Medium),
            "HIGH" => Some(ComplexityLevel::High),
            _ => None,
        }
    }
}

/// Thresholds and keywords for the deterministic classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityConfig {
    pub very_high_amount: Decimal,
    pub high_amount: Decimal,
    pub documentation_amount: Decimal,
    pub minimal_documentation_amount: Decimal,
    pub complex_keywords: Vec<String>,
    pub high_score: u8,
    pub medium_score: u8,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            very_high_amount: dec!(50000),
            high_amount: dec!(10000),
            documentation_amount: dec!(5000),
            minimal_documentation_amount: dec!(1000),
            complex_keywords: [
                "fraud",
                "litigation",
                "lawsuit",
                "attorney",
                "injury",
                "fatality",
                "death",
                "total loss",
                "multiple vehicles",
                "fire",
                "flood",
                "commercial",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            high_score: 3,
            medium_score: 1,
        }
    }
}

/// One rule that contributed to the score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityFactor {
    pub rule: String,
    pub points: u8,
}

/// Full deterministic classification, kept for the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityAssessment {
    pub level: ComplexityLevel,
    pub score: u8,
    pub factors: Vec<ComplexityFactor>,
}

/// Deterministic complexity classifier
#[derive(Debug, Clone, Default)]
pub struct ComplexityClassifier {
    config: ComplexityConfig,
}

impl ComplexityClassifier {
    pub fn new(config: ComplexityConfig) -> Self {
        let complex_keywords = config
            .complex_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        Self {
            config: ComplexityConfig {
                complex_keywords,
                ..config
            },
        }
    }

    /// Classifies a claim as LOW, MEDIUM or HIGH
    pub fn classify(&self, claim: &ClaimSubmission) -> ComplexityLevel {
        self.assess(claim).level
    }

    /// Scores a claim and reports which rules fired
    pub fn assess(&self, claim: &ClaimSubmission) -> ComplexityAssessment {
        let cfg = &self.config;
        let amount = &claim.claimed_amount;
        let mut factors = Vec::new();

        if amount.exceeds(cfg.very_high_amount) {
            factors.push(factor(format!("amount above {}", cfg.very_high_amount), 2));
        } else if amount.exceeds(cfg.high_amount) {
            factors.push(factor(format!("amount above {}", cfg.high_amount), 1));
        }

        let description = claim.normalized_description();
        if let Some(keyword) = cfg
            .complex_keywords
            .iter()
            .find(|k| description.contains(k.as_str()))
        {
            factors.push(factor(format!("complex keyword '{keyword}'"), 2));
        }

        if claim.has_images() {
            factors.push(factor("image evidence attached".to_string(), 1));
        }

        let missing = claim.evidence.missing_count();
        if amount.exceeds(cfg.documentation_amount) && missing > 1 {
            factors.push(factor(format!("{missing} supporting documents missing"), 1));
        } else if amount.at_least(cfg.minimal_documentation_amount) && missing == 3 {
            factors.push(factor("no supporting documents".to_string(), 1));
        }

        let score: u8 = factors.iter().map(|f| f.points).sum();
        // Amounts above the top tier are HIGH whatever else the claim carries.
        let level = if score >= cfg.high_score || amount.exceeds(cfg.very_high_amount) {
            ComplexityLevel::High
        } else if score >= cfg.medium_score {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Low
        };

        ComplexityAssessment {
            level,
            score,
            factors,
        }
    }
}

fn factor(rule: String, points: u8) -> ComplexityFactor {
    ComplexityFactor { rule, points }
}

/// Complexity opinion produced by the reasoning capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonedComplexity {
    pub complexity: ComplexityLevel,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub escalation_recommended: bool,
    #[serde(default)]
    pub estimated_processing_time: Option<String>,
    #[serde(default)]
    pub required_expertise: Vec<String>,
}

/// Where the final classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexitySource {
    RuleBased,
    Reasoned,
    Agreement,
    Conservative,
}

/// Combines the deterministic and reasoning-backed classifications
///
/// Equal results agree. A reasoned opinion with confidence above 0.8 wins.
/// Results one level apart resolve to the higher level. Anything further
/// apart falls back to the deterministic result.
pub fn reconcile(
    rule_based: ComplexityLevel,
    reasoned: &ReasonedComplexity,
) -> (ComplexityLevel, ComplexitySource) {
    if rule_based == reasoned.complexity {
        return (rule_based, ComplexitySource::Agreement);
    }
    if reasoned.confidence > 0.8 {
        return (reasoned.complexity, ComplexitySource::Reasoned);
    }
    if rule_based.ordinal().abs_diff(reasoned.complexity.ordinal()) <= 1 {
        return (rule_based.max(reasoned.complexity), ComplexitySource::Conservative);
    }
    (rule_based, ComplexitySource::RuleBased)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{ClaimImage, EvidenceFlags, Incident, LossType};
    use core_kernel::{ClaimId, Currency, ImageId, Money};

    fn claim(amount: Decimal, description: &str, evidence: EvidenceFlags) -> ClaimSubmission {
        ClaimSubmission {
            id: ClaimId::new(),
            policy_reference: "POL-1".into(),
            loss_type: LossType::Property,
            incident: Incident {
                date: "2024-01-10".into(),
                description: description.into(),
                location: None,
            },
            claimed_amount: Money::new(amount, Currency::USD),
            evidence,
            images: vec![],
        }
    }

    fn reasoned(level: ComplexityLevel, confidence: f64) -> ReasonedComplexity {
        ReasonedComplexity {
            complexity: level,
            confidence,
            reasoning: "model opinion".into(),
            risk_factors: vec![],
            escalation_recommended: false,
            estimated_processing_time: None,
            required_expertise: vec![],
        }
    }

    #[test]
    fn test_small_clean_claim_is_low() {
        let c = claim(dec!(500), "minor scratch", EvidenceFlags::complete());
        let assessment = ComplexityClassifier::default().assess(&c);
        assert_eq!(assessment.level, ComplexityLevel::Low);
        assert_eq!(assessment.score, 0);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_amount_tiers() {
        let classifier = ComplexityClassifier::default();
        let full = EvidenceFlags::complete();
        assert_eq!(classifier.assess(&claim(dec!(10000), "dent", full)).score, 0);
        assert_eq!(classifier.assess(&claim(dec!(10000.01), "dent", full)).score, 1);
        assert_eq!(classifier.assess(&claim(dec!(50000), "dent", full)).score, 1);
        assert_eq!(classifier.assess(&claim(dec!(50001), "dent", full)).score, 2);
    }

    #[test]
    fn test_keyword_is_case_insensitive_and_counted_once() {
        let c = claim(dec!(200), "FIRE and Flood damage", EvidenceFlags::complete());
        let assessment = ComplexityClassifier::default().assess(&c);
        assert_eq!(assessment.score, 2);
        assert_eq!(assessment.factors.len(), 1);
        assert_eq!(assessment.level, ComplexityLevel::Medium);
    }

    #[test]
    fn test_images_add_one() {
        let mut c = claim(dec!(200), "cracked window", EvidenceFlags::complete());
        c.images.push(ClaimImage {
            id: ImageId::new(),
            file_name: "window.jpg".into(),
            media_type: "image/jpeg".into(),
            caption: None,
        });
        assert_eq!(ComplexityClassifier::default().classify(&c), ComplexityLevel::Medium);
    }

    #[test]
    fn test_documentation_branches_are_exclusive() {
        let classifier = ComplexityClassifier::default();
        let two_missing = EvidenceFlags {
            incident_report: true,
            photos: false,
            police_report: false,
        };
        // above 5,000 with two missing: first branch
        assert_eq!(classifier.assess(&claim(dec!(6000), "dent", two_missing)).score, 1);
        // above 5,000 with all missing: first branch only, no double count
        assert_eq!(
            classifier.assess(&claim(dec!(6000), "dent", EvidenceFlags::default())).score,
            1
        );
        // between 1,000 and 5,000 with two missing: no penalty
        assert_eq!(classifier.assess(&claim(dec!(3000), "dent", two_missing)).score, 0);
        // exactly 1,000 with all missing: second branch
        assert_eq!(
            classifier.assess(&claim(dec!(1000), "dent", EvidenceFlags::default())).score,
            1
        );
        // below 1,000 with all missing: nothing
        assert_eq!(
            classifier.assess(&claim(dec!(999), "dent", EvidenceFlags::default())).score,
            0
        );
    }

    #[test]
    fn test_top_tier_amount_is_always_high() {
        let c = claim(dec!(75000), "minor scratch", EvidenceFlags::complete());
        let assessment = ComplexityClassifier::default().assess(&c);
        assert_eq!(assessment.score, 2);
        assert_eq!(assessment.level, ComplexityLevel::High);
    }

    #[test]
    fn test_high_threshold() {
        let c = claim(dec!(60000), "hail damage", EvidenceFlags::default());
        let assessment = ComplexityClassifier::default().assess(&c);
        assert_eq!(assessment.score, 3);
        assert_eq!(assessment.level, ComplexityLevel::High);
    }

    #[test]
    fn test_custom_keywords_are_normalized() {
        let config = ComplexityConfig {
            complex_keywords: vec!["Arson".into()],
            ..Default::default()
        };
        let c = claim(dec!(100), "suspected arson", EvidenceFlags::complete());
        assert_eq!(ComplexityClassifier::new(config).assess(&c).score, 2);
    }

    #[test]
    fn test_reconcile_agreement() {
        let (level, source) = reconcile(ComplexityLevel::Medium, &reasoned(ComplexityLevel::Medium, 0.1));
        assert_eq!(level, ComplexityLevel::Medium);
        assert_eq!(source, ComplexitySource::Agreement);
    }

    #[test]
    fn test_reconcile_confident_reasoning_wins() {
        let (level, source) = reconcile(ComplexityLevel::High, &reasoned(ComplexityLevel::Low, 0.85));
        assert_eq!(level, ComplexityLevel::Low);
        assert_eq!(source, ComplexitySource::Reasoned);
    }

    #[test]
    fn test_reconcile_adjacent_prefers_higher() {
        let (level, source) = reconcile(ComplexityLevel::Low, &reasoned(ComplexityLevel::Medium, 0.8));
        assert_eq!(level, ComplexityLevel::Medium);
        assert_eq!(source, ComplexitySource::Conservative);

        let (level, _) = reconcile(ComplexityLevel::High, &reasoned(ComplexityLevel::Medium, 0.5));
        assert_eq!(level, ComplexityLevel::High);
    }

    #[test]
    fn test_reconcile_far_apart_keeps_rules() {
        let (level, source) = reconcile(ComplexityLevel::Low, &reasoned(ComplexityLevel::High, 0.6));
        assert_eq!(level, ComplexityLevel::Low);
        assert_eq!(source, ComplexitySource::RuleBased);
    }
}
